//! Storage Layer - documents and the prompt audit trail
//!
//! Two interchangeable backends sit behind the `Store` trait:
//! - `MemoryStore`: two maps under one `RwLock`, for tests and local development
//! - `SqliteStore`: SQLite file with tables
//!   - documents(id, filename, content_type, size, pdf_data, classification_json, extraction_json, created_at)
//!   - prompts(id, document_id, agent_type, prompt, response, schema, model, input_tokens, output_tokens, total_cost, created_at)
//!
//! Both backends share the same contract: saves are upserts keyed on id,
//! lookups of unknown ids fail with a not-found error, listings are newest first.

pub mod memory;
pub mod schema;
pub mod sqlite;

use crate::Result;
use crate::document::{Document, PromptRecord};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Cap applied to `list_documents` when the caller passes a limit of 0
pub const DEFAULT_LIST_LIMIT: usize = 100;

/// Resolve the effective page size for a listing
pub(crate) fn effective_limit(limit: usize) -> usize {
    if limit == 0 { DEFAULT_LIST_LIMIT } else { limit }
}

/// Document persistence
pub trait DocumentStore: Send + Sync {
    /// Insert or replace a document by id
    fn save_document(&self, doc: &Document) -> Result<()>;

    /// Get a document by id, failing with `DocumentNotFound` if absent
    fn get_document(&self, id: &str) -> Result<Document>;

    /// Delete a document and its prompt records
    fn delete_document(&self, id: &str) -> Result<()>;

    /// List documents newest first, skipping `offset` and returning at most
    /// `limit` (0 means `DEFAULT_LIST_LIMIT`)
    fn list_documents(&self, limit: usize, offset: usize) -> Result<Vec<Document>>;
}

/// Prompt record persistence
pub trait PromptStore: Send + Sync {
    /// Insert or replace a prompt record by id, failing with
    /// `DocumentNotFound` if its document is not stored
    fn save_prompt(&self, prompt: &PromptRecord) -> Result<()>;

    /// Get a prompt record by id, failing with `PromptNotFound` if absent
    fn get_prompt(&self, id: &str) -> Result<PromptRecord>;

    /// All prompt records of a document in creation order (empty if none)
    fn get_prompts_by_document(&self, document_id: &str) -> Result<Vec<PromptRecord>>;
}

/// Full storage capability required by the service layer
pub trait Store: DocumentStore + PromptStore {}

impl<T: DocumentStore + PromptStore + ?Sized> Store for T {}

/// Handle to the single store instance shared by every consumer
pub type SharedStore = Arc<dyn Store>;

/// Which backend to construct at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Memory,
    #[default]
    Sqlite,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Memory => "memory",
            BackendKind::Sqlite => "sqlite",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Construct the configured backend. Called once at process start.
pub fn open_store(kind: BackendKind, database: &Path) -> Result<SharedStore> {
    let store: SharedStore = match kind {
        BackendKind::Memory => Arc::new(MemoryStore::new()),
        BackendKind::Sqlite => Arc::new(SqliteStore::open(database)?),
    };
    tracing::info!("Opened {} store", kind);
    Ok(store)
}


/// One test per contract check, run against a fresh store from `$make`
#[cfg(test)]
macro_rules! store_contract_tests {
    ($backend:ident, $make:expr) => {
        mod $backend {
            store_contract_tests!(@checks $make;
                save_then_get_round_trips,
                missing_document_is_not_found,
                delete_then_get_is_not_found,
                save_is_upsert,
                list_applies_limit_and_offset,
                offset_past_end_is_empty,
                prompts_grouped_by_document,
                prompt_round_trips,
                prompts_leave_payload_untouched,
                prompt_for_missing_document_is_not_found,
            );
        }
    };
    (@checks $make:expr; $($check:ident),* $(,)?) => {
        $(
            #[test]
            fn $check() {
                let store: crate::storage::SharedStore = $make;
                crate::storage::contract::$check(store.as_ref());
            }
        )*
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    store_contract_tests!(memory_contract, std::sync::Arc::new(crate::storage::MemoryStore::new()));
    store_contract_tests!(
        sqlite_contract,
        std::sync::Arc::new(crate::storage::SqliteStore::open_in_memory().unwrap())
    );

    #[test]
    fn test_effective_limit() {
        assert_eq!(effective_limit(0), DEFAULT_LIST_LIMIT);
        assert_eq!(effective_limit(7), 7);
    }

    #[test]
    fn test_open_store_by_kind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docsift.db");

        let store = open_store(BackendKind::Sqlite, &path).unwrap();
        store.save_document(&contract::sample_document("d1", 0)).unwrap();
        assert!(path.exists());

        let store = open_store(BackendKind::Memory, &path).unwrap();
        assert!(store.list_documents(0, 0).unwrap().is_empty());
    }
}
