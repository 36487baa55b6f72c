//! # Docsift - Document processing backend
//!
//! Upload PDFs, classify them and extract structured data with an AI agent,
//! and keep every prompt together with its token cost.
//!
//! Docsift provides:
//! - Document, classification, extraction and prompt-record types
//! - A `Store` abstraction with in-memory and SQLite backends
//! - Agent clients (Anthropic, mock) plus JSON recovery from model output
//! - A `DocumentService` driving the upload → classify → extract flow
//! - An HTTP server and CLI on top of the service

pub mod document;
pub mod storage;
pub mod agent;
pub mod service;
pub mod server;
pub mod config;
pub mod ui;


// Re-exports for convenient access
pub use document::{AgentType, Classification, Document, ExtractedField, Extraction, PromptRecord, TokenUsage};
pub use storage::{MemoryStore, SharedStore, SqliteStore, Store};
pub use service::DocumentService;

/// Result type alias for Docsift operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Docsift operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Prompt not found: {0}")]
    PromptNotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Storage backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Agent error: {0}")]
    Agent(#[from] agent::AgentError),

    #[error("No agent configured")]
    AgentUnavailable,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error reports a missing document or prompt record
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::DocumentNotFound(_) | Error::PromptNotFound(_))
    }
}
