//! Agents - AI collaborators that classify documents and extract data
//!
//! `AgentClient` is the seam between the service and a model provider:
//! - `AnthropicClient`: Claude Messages API over HTTPS
//! - `MockAgentClient`: canned results for tests and offline runs
//!
//! Provider-independent pieces live alongside: prompt text, per-type
//! extraction schemas and recovery of JSON from free-form replies.

pub mod anthropic;
pub mod mock;
pub mod prompts;
pub mod response;
pub mod schemas;

use async_trait::async_trait;

use crate::document::{Classification, Extraction, TokenUsage};

pub use anthropic::AnthropicClient;
pub use mock::MockAgentClient;

/// Errors from agent calls
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("ANTHROPIC_API_KEY is not set")]
    MissingApiKey,

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("response contained no text")]
    EmptyResponse,

    #[error("failed to parse {what} response: {source}")]
    Parse {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// What an agent call produced, alongside the prompt sent and its usage
#[derive(Debug, Clone)]
pub struct AgentOutput<T> {
    pub result: T,
    pub prompt: String,
    pub usage: TokenUsage,
}

/// A model provider able to classify and extract from PDFs
#[async_trait]
pub trait AgentClient: Send + Sync {
    /// Classify the document in `pdf_data`
    async fn classify(&self, pdf_data: &[u8]) -> Result<AgentOutput<Classification>, AgentError>;

    /// Extract fields from `pdf_data` following `schema`
    async fn extract(
        &self,
        pdf_data: &[u8],
        document_type: &str,
        schema: &str,
    ) -> Result<AgentOutput<Extraction>, AgentError>;
}
