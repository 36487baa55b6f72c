//! MockAgentClient - scriptable agent for tests and offline runs

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::json;

use super::{AgentClient, AgentError, AgentOutput};
use crate::document::{Classification, ExtractedField, Extraction, TokenUsage};

/// Model name reported by the mock
pub const MOCK_MODEL: &str = "claude-sonnet-4-5-20250929";

type ClassifyFn = dyn Fn(&[u8]) -> Result<AgentOutput<Classification>, AgentError> + Send + Sync;
type ExtractFn = dyn Fn(&[u8], &str, &str) -> Result<AgentOutput<Extraction>, AgentError> + Send + Sync;

/// Agent returning canned results unless overridden with closures
#[derive(Clone, Default)]
pub struct MockAgentClient {
    classify_fn: Option<Arc<ClassifyFn>>,
    extract_fn: Option<Arc<ExtractFn>>,
    classify_calls: Arc<AtomicUsize>,
    extract_calls: Arc<AtomicUsize>,
}

impl MockAgentClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_classify<F>(mut self, f: F) -> Self
    where
        F: Fn(&[u8]) -> Result<AgentOutput<Classification>, AgentError> + Send + Sync + 'static,
    {
        self.classify_fn = Some(Arc::new(f));
        self
    }

    pub fn with_extract<F>(mut self, f: F) -> Self
    where
        F: Fn(&[u8], &str, &str) -> Result<AgentOutput<Extraction>, AgentError> + Send + Sync + 'static,
    {
        self.extract_fn = Some(Arc::new(f));
        self
    }

    pub fn classify_calls(&self) -> usize {
        self.classify_calls.load(Ordering::SeqCst)
    }

    pub fn extract_calls(&self) -> usize {
        self.extract_calls.load(Ordering::SeqCst)
    }

    /// The classification returned when no closure is set
    pub fn default_classification() -> AgentOutput<Classification> {
        AgentOutput {
            result: Classification {
                document_type: "invoice".to_string(),
                confidence: 0.95,
                reasoning: "Mock classification".to_string(),
                subtypes: Vec::new(),
                language: Some("en".to_string()),
            },
            prompt: "mock prompt".to_string(),
            usage: TokenUsage {
                model: MOCK_MODEL.to_string(),
                input_tokens: 1000,
                output_tokens: 200,
                total_cost: 0.006,
            },
        }
    }

    /// The extraction returned when no closure is set
    pub fn default_extraction(document_type: &str) -> AgentOutput<Extraction> {
        AgentOutput {
            result: Extraction {
                schema_used: document_type.to_string(),
                data: json!({"total": 100.0}).as_object().cloned().unwrap_or_default(),
                fields: vec![ExtractedField {
                    name: "total".to_string(),
                    value: json!(100.0),
                    source_text: "$100.00".to_string(),
                    page_number: 1,
                    confidence: 0.95,
                }],
            },
            prompt: "mock extraction prompt".to_string(),
            usage: TokenUsage {
                model: MOCK_MODEL.to_string(),
                input_tokens: 2000,
                output_tokens: 500,
                total_cost: 0.0135,
            },
        }
    }
}

impl std::fmt::Debug for MockAgentClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockAgentClient")
            .field("classify_calls", &self.classify_calls())
            .field("extract_calls", &self.extract_calls())
            .finish()
    }
}

#[async_trait]
impl AgentClient for MockAgentClient {
    async fn classify(&self, pdf_data: &[u8]) -> Result<AgentOutput<Classification>, AgentError> {
        self.classify_calls.fetch_add(1, Ordering::SeqCst);
        match &self.classify_fn {
            Some(f) => f(pdf_data),
            None => Ok(Self::default_classification()),
        }
    }

    async fn extract(
        &self,
        pdf_data: &[u8],
        document_type: &str,
        schema: &str,
    ) -> Result<AgentOutput<Extraction>, AgentError> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        match &self.extract_fn {
            Some(f) => f(pdf_data, document_type, schema),
            None => Ok(Self::default_extraction(document_type)),
        }
    }
}
