//! Document service - the upload → classify → extract flow
//!
//! Every operation fetches from the store, optionally calls the agent, and
//! writes the result back. Prompt records are an audit trail: failing to
//! save one is logged and does not fail the operation.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::agent::{AgentClient, schemas};
use crate::document::{AgentType, Classification, Document, Extraction, PromptRecord};
use crate::storage::SharedStore;
use crate::{Error, Result};

/// Leading bytes of every PDF file
const PDF_MAGIC: &[u8] = b"%PDF";

/// Outcome of a classification request
#[derive(Debug, Clone, Serialize)]
pub struct ClassifyOutcome {
    pub document_id: String,
    pub classification: Classification,
    pub prompt_id: String,
}

/// Outcome of an extraction request
#[derive(Debug, Clone, Serialize)]
pub struct ExtractOutcome {
    pub document_id: String,
    pub extraction: Extraction,
    pub prompt_id: String,
    /// The JSON schema text sent to the agent
    pub schema_used: String,
}

/// Either one prompt record or every record of a document
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PromptHistory {
    Single(PromptRecord),
    ForDocument(Vec<PromptRecord>),
}

#[derive(Clone)]
pub struct DocumentService {
    store: SharedStore,
    agent: Option<Arc<dyn AgentClient>>,
}

impl DocumentService {
    pub fn new(store: SharedStore, agent: Arc<dyn AgentClient>) -> Self {
        Self {
            store,
            agent: Some(agent),
        }
    }

    /// A service over `store` alone; `classify` and `extract` fail with
    /// `AgentUnavailable`
    pub fn read_only(store: SharedStore) -> Self {
        Self { store, agent: None }
    }

    fn agent(&self) -> Result<&dyn AgentClient> {
        self.agent.as_deref().ok_or(Error::AgentUnavailable)
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Store an uploaded PDF under a fresh id
    pub fn upload(&self, filename: &str, pdf_data: Vec<u8>) -> Result<Document> {
        if !pdf_data.starts_with(PDF_MAGIC) {
            return Err(Error::InvalidInput("Invalid PDF file".to_string()));
        }

        let doc = Document::new(Uuid::new_v4().to_string(), filename, pdf_data);
        self.store.save_document(&doc)?;
        tracing::info!(document_id = %doc.id, filename = %doc.filename, size = doc.size, "Uploaded document");
        Ok(doc)
    }

    pub fn document(&self, id: &str) -> Result<Document> {
        self.store.get_document(id)
    }

    pub fn list_documents(&self, limit: usize, offset: usize) -> Result<Vec<Document>> {
        self.store.list_documents(limit, offset)
    }

    /// Classify a stored document and attach the result.
    ///
    /// The document is re-read after the agent returns so an extraction
    /// saved in the meantime is kept.
    pub async fn classify(&self, document_id: &str) -> Result<ClassifyOutcome> {
        let pdf_data = self.store.get_document(document_id)?.pdf_data;
        let output = self.agent()?.classify(&pdf_data).await?;

        let mut doc = self.store.get_document(document_id)?;
        doc.classification = Some(output.result.clone());
        self.store.save_document(&doc)?;

        let record = PromptRecord::new(
            Uuid::new_v4().to_string(),
            &doc.id,
            AgentType::Classification,
            output.prompt,
            pretty_json(&output.result)?,
            &output.usage,
        );
        self.record_prompt(&record);

        tracing::info!(
            document_id = %doc.id,
            document_type = %output.result.document_type,
            confidence = output.result.confidence,
            "Classified document"
        );
        Ok(ClassifyOutcome {
            document_id: doc.id,
            classification: output.result,
            prompt_id: record.id,
        })
    }

    /// Extract structured data from a stored document.
    ///
    /// `document_type` overrides the stored classification; one of the two
    /// must be present. As with `classify`, only the extraction is written
    /// back onto a freshly read document.
    pub async fn extract(&self, document_id: &str, document_type: Option<&str>) -> Result<ExtractOutcome> {
        let doc = self.store.get_document(document_id)?;

        let document_type = match document_type.map(str::trim).filter(|t| !t.is_empty()) {
            Some(t) => t.to_string(),
            None => doc
                .classification
                .as_ref()
                .map(|c| c.document_type.clone())
                .ok_or_else(|| {
                    Error::InvalidInput(
                        "Document must be classified first or document_type must be provided".to_string(),
                    )
                })?,
        };
        let schema = schemas::schema_for(&document_type);

        let agent = self.agent()?;
        let mut output = agent.extract(&doc.pdf_data, &document_type, schema).await?;
        if output.result.schema_used.trim().is_empty() {
            output.result.schema_used = document_type.clone();
        }

        let mut doc = self.store.get_document(document_id)?;
        doc.extraction = Some(output.result.clone());
        self.store.save_document(&doc)?;

        let record = PromptRecord::new(
            Uuid::new_v4().to_string(),
            &doc.id,
            AgentType::Extraction,
            output.prompt,
            pretty_json(&output.result)?,
            &output.usage,
        )
        .with_schema(schema);
        self.record_prompt(&record);

        tracing::info!(
            document_id = %doc.id,
            document_type = %document_type,
            fields = output.result.fields.len(),
            "Extracted document data"
        );
        Ok(ExtractOutcome {
            document_id: doc.id,
            extraction: output.result,
            prompt_id: record.id,
            schema_used: schema.to_string(),
        })
    }

    /// Look `id` up as a prompt id first, then as a document id
    pub fn prompt_history(&self, id: &str) -> Result<PromptHistory> {
        match self.store.get_prompt(id) {
            Ok(record) => Ok(PromptHistory::Single(record)),
            Err(e) if e.is_not_found() => {
                Ok(PromptHistory::ForDocument(self.store.get_prompts_by_document(id)?))
            }
            Err(e) => Err(e),
        }
    }

    fn record_prompt(&self, record: &PromptRecord) {
        if let Err(e) = self.store.save_prompt(record) {
            tracing::warn!(
                prompt_id = %record.id,
                document_id = %record.document_id,
                "Failed to save prompt record: {}",
                e
            );
        }
    }
}

fn pretty_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
