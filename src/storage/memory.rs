//! In-memory storage implementation
//!
//! Data lives only as long as the process. Used by tests and for local
//! development without a database file.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::document::{Document, PromptRecord};
use crate::{Error, Result};
use super::{DocumentStore, PromptStore, effective_limit};

#[derive(Debug, Default)]
struct Tables {
    documents: HashMap<String, Document>,
    prompts: HashMap<String, PromptRecord>,
}

/// Map-backed store.
///
/// One `RwLock` covers both maps; every operation holds it for its whole
/// duration, so writes are serialized and each read sees a consistent snapshot.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // A panicking writer cannot leave the maps half-updated, so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of stored documents
    pub fn document_count(&self) -> usize {
        self.read().documents.len()
    }

    /// Number of stored prompt records
    pub fn prompt_count(&self) -> usize {
        self.read().prompts.len()
    }
}

impl DocumentStore for MemoryStore {
    fn save_document(&self, doc: &Document) -> Result<()> {
        self.write().documents.insert(doc.id.clone(), doc.clone());
        tracing::debug!(document_id = %doc.id, "Saved document");
        Ok(())
    }

    fn get_document(&self, id: &str) -> Result<Document> {
        self.read()
            .documents
            .get(id)
            .cloned()
            .ok_or_else(|| Error::DocumentNotFound(id.to_string()))
    }

    fn delete_document(&self, id: &str) -> Result<()> {
        let mut tables = self.write();
        if tables.documents.remove(id).is_none() {
            return Err(Error::DocumentNotFound(id.to_string()));
        }
        tables.prompts.retain(|_, p| p.document_id != id);
        tracing::debug!(document_id = %id, "Deleted document");
        Ok(())
    }

    fn list_documents(&self, limit: usize, offset: usize) -> Result<Vec<Document>> {
        let tables = self.read();
        let mut docs: Vec<&Document> = tables.documents.values().collect();
        docs.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok(docs
            .into_iter()
            .skip(offset)
            .take(effective_limit(limit))
            .cloned()
            .collect())
    }
}

impl PromptStore for MemoryStore {
    fn save_prompt(&self, prompt: &PromptRecord) -> Result<()> {
        let mut tables = self.write();
        if !tables.documents.contains_key(&prompt.document_id) {
            return Err(Error::DocumentNotFound(prompt.document_id.clone()));
        }
        tables.prompts.insert(prompt.id.clone(), prompt.clone());
        tracing::debug!(prompt_id = %prompt.id, document_id = %prompt.document_id, "Saved prompt record");
        Ok(())
    }

    fn get_prompt(&self, id: &str) -> Result<PromptRecord> {
        self.read()
            .prompts
            .get(id)
            .cloned()
            .ok_or_else(|| Error::PromptNotFound(id.to_string()))
    }

    fn get_prompts_by_document(&self, document_id: &str) -> Result<Vec<PromptRecord>> {
        let tables = self.read();
        let mut prompts: Vec<PromptRecord> = tables
            .prompts
            .values()
            .filter(|p| p.document_id == document_id)
            .cloned()
            .collect();
        prompts.sort_by_key(|p| (p.created_at, p.id.clone()));
        Ok(prompts)
    }
}
