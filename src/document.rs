//! Document types - uploaded PDFs, their AI-derived results and the prompt audit trail
//!
//! - `Document`: one uploaded PDF plus optional classification/extraction
//! - `Classification`: document-type label with confidence and rationale
//! - `Extraction`: structured field set produced against a named schema
//! - `PromptRecord`: one AI call's prompt, response, token counts and cost

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

/// Price per million input tokens, in USD
pub const INPUT_PRICE_PER_MILLION: f64 = 3.0;

/// Price per million output tokens, in USD
pub const OUTPUT_PRICE_PER_MILLION: f64 = 15.0;

/// Content type recorded for every uploaded document
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Compute the USD cost of one call from its token counts.
pub fn calculate_cost(input_tokens: u32, output_tokens: u32) -> f64 {
    let input_cost = f64::from(input_tokens) * INPUT_PRICE_PER_MILLION / 1_000_000.0;
    let output_cost = f64::from(output_tokens) * OUTPUT_PRICE_PER_MILLION / 1_000_000.0;
    input_cost + output_cost
}

/// An uploaded PDF and whatever the agents have derived from it so far.
///
/// The payload is set once at upload time; later saves only attach a
/// classification or an extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub filename: String,
    pub content_type: String,
    pub size: i64,
    /// Raw PDF bytes, never exposed through JSON
    #[serde(skip)]
    pub pdf_data: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction: Option<Extraction>,
    pub created_at: DateTime<Utc>,
}

impl Document {
    /// Create a new PDF document stamped with the current time
    pub fn new(id: impl Into<String>, filename: impl Into<String>, pdf_data: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            filename: filename.into(),
            content_type: PDF_CONTENT_TYPE.to_string(),
            size: pdf_data.len() as i64,
            pdf_data,
            classification: None,
            extraction: None,
            created_at: Utc::now(),
        }
    }

    /// Override the creation timestamp
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn is_classified(&self) -> bool {
        self.classification.is_some()
    }

    pub fn is_extracted(&self) -> bool {
        self.extraction.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub document_type: String,
    /// In [0, 1]
    pub confidence: f64,
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subtypes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Structured data pulled out of a document.
///
/// `data` follows the shape of the schema named by `schema_used`; `fields`
/// carries per-field provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    #[serde(default)]
    pub schema_used: String,
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default)]
    pub fields: Vec<ExtractedField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedField {
    pub name: String,
    pub value: Value,
    /// Verbatim text the value was read from
    pub source_text: String,
    /// 1-indexed
    pub page_number: u32,
    pub confidence: f64,
}

/// Which agent produced a prompt record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    Classification,
    Extraction,
}

impl AgentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::Classification => "classification",
            AgentType::Extraction => "extraction",
        }
    }
}

impl FromStr for AgentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "classification" | "classify" => Ok(AgentType::Classification),
            "extraction" | "extract" => Ok(AgentType::Extraction),
            _ => Err(Error::InvalidInput(format!("Unknown agent type: {}", s))),
        }
    }
}

impl std::fmt::Display for AgentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Audit entry for a single agent call.
///
/// Written once per call and never updated by the domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptRecord {
    pub id: String,
    pub document_id: String,
    pub agent_type: AgentType,
    pub prompt: String,
    pub response: String,
    /// JSON schema sent with an extraction call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    /// USD
    pub total_cost: f64,
    pub created_at: DateTime<Utc>,
}

impl PromptRecord {
    /// Create a record for a call whose usage has been measured
    pub fn new(
        id: impl Into<String>,
        document_id: impl Into<String>,
        agent_type: AgentType,
        prompt: impl Into<String>,
        response: impl Into<String>,
        usage: &TokenUsage,
    ) -> Self {
        Self {
            id: id.into(),
            document_id: document_id.into(),
            agent_type,
            prompt: prompt.into(),
            response: response.into(),
            schema: None,
            model: usage.model.clone(),
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            total_cost: usage.total_cost,
            created_at: Utc::now(),
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// Token counts and cost reported for one agent call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_cost: f64,
}

impl TokenUsage {
    /// Build a usage record, pricing it from the token counts
    pub fn priced(model: impl Into<String>, input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            model: model.into(),
            input_tokens,
            output_tokens,
            total_cost: calculate_cost(input_tokens, output_tokens),
        }
    }
}
