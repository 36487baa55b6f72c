//! SQLite storage implementation

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use crate::document::{AgentType, Classification, Document, Extraction, PromptRecord};
use crate::{Error, Result};
use super::{DocumentStore, PromptStore, effective_limit, schema};

const DOCUMENT_COLUMNS: &str =
    "id, filename, content_type, size, pdf_data, classification_json, extraction_json, created_at";

const PROMPT_COLUMNS: &str = "id, document_id, agent_type, prompt, response, schema, model, input_tokens, output_tokens, total_cost, created_at";

/// SQLite-backed storage for documents and prompt records.
///
/// The connection sits behind a `Mutex` so one store can be shared across
/// request handlers; each operation is a single statement.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| Error::BackendUnavailable(format!("{}: {}", path.display(), e)))?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::BackendUnavailable(format!(":memory:: {}", e)))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let store = Self { conn: Mutex::new(conn) };
        store
            .initialize_schema()
            .map_err(|e| Error::BackendUnavailable(format!("schema setup failed: {}", e)))?;
        Ok(store)
    }

    /// Enable foreign keys and create tables; safe to run on every startup
    fn initialize_schema(&self) -> rusqlite::Result<()> {
        let conn = self.conn();
        for pragma in schema::PRAGMAS {
            conn.execute_batch(pragma)?;
        }
        for stmt in schema::all_schema_statements() {
            conn.execute(stmt, [])?;
        }
        Ok(())
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        let conn = self.conn();
        let documents: i64 = conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        let prompts: i64 = conn.query_row("SELECT COUNT(*) FROM prompts", [], |row| row.get(0))?;
        let total_cost: f64 =
            conn.query_row("SELECT COALESCE(SUM(total_cost), 0) FROM prompts", [], |row| row.get(0))?;

        Ok(DbStats {
            documents: documents as usize,
            prompts: prompts as usize,
            total_cost,
        })
    }
}

/// Columns of a `documents` row before the JSON columns are decoded
struct DocumentRow {
    id: String,
    filename: String,
    content_type: String,
    size: i64,
    pdf_data: Option<Vec<u8>>,
    classification_json: Option<String>,
    extraction_json: Option<String>,
    created_at: DateTime<Utc>,
}

impl DocumentRow {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            filename: row.get(1)?,
            content_type: row.get(2)?,
            size: row.get(3)?,
            pdf_data: row.get(4)?,
            classification_json: row.get(5)?,
            extraction_json: row.get(6)?,
            created_at: row.get(7)?,
        })
    }

    /// Decode the nested objects; a NULL column leaves the field empty
    fn into_document(self) -> Result<Document> {
        let classification = self
            .classification_json
            .as_deref()
            .map(|json| serde_json::from_str::<Classification>(json))
            .transpose()?;
        let extraction = self
            .extraction_json
            .as_deref()
            .map(|json| serde_json::from_str::<Extraction>(json))
            .transpose()?;

        Ok(Document {
            id: self.id,
            filename: self.filename,
            content_type: self.content_type,
            size: self.size,
            pdf_data: self.pdf_data.unwrap_or_default(),
            classification,
            extraction,
            created_at: self.created_at,
        })
    }
}

/// SQLite integers are signed; larger values saturate instead of wrapping
/// negative, which SQLite would read as "no limit" or "no offset".
fn sql_int(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// A prompt whose document does not exist trips the foreign key
fn is_foreign_key_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY
    )
}

fn row_to_prompt(row: &rusqlite::Row) -> rusqlite::Result<PromptRecord> {
    let agent_type: String = row.get(2)?;
    let agent_type: AgentType = agent_type.parse().map_err(|e: Error| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let model: Option<String> = row.get(6)?;

    Ok(PromptRecord {
        id: row.get(0)?,
        document_id: row.get(1)?,
        agent_type,
        prompt: row.get(3)?,
        response: row.get(4)?,
        schema: row.get(5)?,
        model: model.unwrap_or_default(),
        input_tokens: row.get(7)?,
        output_tokens: row.get(8)?,
        total_cost: row.get(9)?,
        created_at: row.get(10)?,
    })
}

impl DocumentStore for SqliteStore {
    fn save_document(&self, doc: &Document) -> Result<()> {
        let classification_json = doc
            .classification
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let extraction_json = doc
            .extraction
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.conn().execute(
            r#"
            INSERT INTO documents (id, filename, content_type, size, pdf_data, classification_json, extraction_json, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                filename = excluded.filename,
                content_type = excluded.content_type,
                size = excluded.size,
                pdf_data = excluded.pdf_data,
                classification_json = excluded.classification_json,
                extraction_json = excluded.extraction_json
            "#,
            params![
                doc.id,
                doc.filename,
                doc.content_type,
                doc.size,
                doc.pdf_data,
                classification_json,
                extraction_json,
                doc.created_at,
            ],
        )?;
        tracing::debug!(document_id = %doc.id, "Saved document");
        Ok(())
    }

    fn get_document(&self, id: &str) -> Result<Document> {
        let row = self
            .conn()
            .query_row(
                &format!("SELECT {} FROM documents WHERE id = ?1", DOCUMENT_COLUMNS),
                [id],
                DocumentRow::from_row,
            )
            .optional()?;

        match row {
            Some(row) => row.into_document(),
            None => Err(Error::DocumentNotFound(id.to_string())),
        }
    }

    fn delete_document(&self, id: &str) -> Result<()> {
        let deleted = self.conn().execute("DELETE FROM documents WHERE id = ?1", [id])?;
        if deleted == 0 {
            return Err(Error::DocumentNotFound(id.to_string()));
        }
        tracing::debug!(document_id = %id, "Deleted document");
        Ok(())
    }

    fn list_documents(&self, limit: usize, offset: usize) -> Result<Vec<Document>> {
        let rows: Vec<DocumentRow> = {
            let conn = self.conn();
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM documents ORDER BY created_at DESC, id ASC LIMIT ?1 OFFSET ?2",
                DOCUMENT_COLUMNS
            ))?;
            let rows = stmt
                .query_map(
                    params![sql_int(effective_limit(limit)), sql_int(offset)],
                    DocumentRow::from_row,
                )?
                .collect::<rusqlite::Result<_>>()?;
            rows
        };

        rows.into_iter().map(DocumentRow::into_document).collect()
    }
}

impl PromptStore for SqliteStore {
    fn save_prompt(&self, prompt: &PromptRecord) -> Result<()> {
        let saved = self.conn().execute(
            r#"
            INSERT INTO prompts (id, document_id, agent_type, prompt, response, schema, model, input_tokens, output_tokens, total_cost, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(id) DO UPDATE SET
                prompt = excluded.prompt,
                response = excluded.response,
                schema = excluded.schema,
                model = excluded.model,
                input_tokens = excluded.input_tokens,
                output_tokens = excluded.output_tokens,
                total_cost = excluded.total_cost
            "#,
            params![
                prompt.id,
                prompt.document_id,
                prompt.agent_type.as_str(),
                prompt.prompt,
                prompt.response,
                prompt.schema,
                prompt.model,
                prompt.input_tokens,
                prompt.output_tokens,
                prompt.total_cost,
                prompt.created_at,
            ],
        );
        match saved {
            Err(e) if is_foreign_key_violation(&e) => {
                return Err(Error::DocumentNotFound(prompt.document_id.clone()));
            }
            other => other?,
        };
        tracing::debug!(prompt_id = %prompt.id, document_id = %prompt.document_id, "Saved prompt record");
        Ok(())
    }

    fn get_prompt(&self, id: &str) -> Result<PromptRecord> {
        self.conn()
            .query_row(
                &format!("SELECT {} FROM prompts WHERE id = ?1", PROMPT_COLUMNS),
                [id],
                row_to_prompt,
            )
            .optional()?
            .ok_or_else(|| Error::PromptNotFound(id.to_string()))
    }

    fn get_prompts_by_document(&self, document_id: &str) -> Result<Vec<PromptRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM prompts WHERE document_id = ?1 ORDER BY created_at ASC, id ASC",
            PROMPT_COLUMNS
        ))?;

        let prompts = stmt
            .query_map([document_id], row_to_prompt)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(prompts)
    }
}

/// Database statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct DbStats {
    pub documents: usize,
    pub prompts: usize,
    /// USD spent across all recorded calls
    pub total_cost: f64,
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        writeln!(f, "  Documents: {}", self.documents)?;
        writeln!(f, "  Prompts: {}", self.prompts)?;
        writeln!(f, "  Total cost: ${:.4}", self.total_cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::contract::{sample_document, sample_prompt};

    #[test]
    fn test_reopen_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docs.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.save_document(&sample_document("d1", 0)).unwrap();
            store.save_prompt(&sample_prompt("p1", "d1", 0)).unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get_document("d1").unwrap().filename, "d1.pdf");
        assert_eq!(store.get_prompts_by_document("d1").unwrap().len(), 1);
    }

    #[test]
    fn test_malformed_classification_surfaces() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.save_document(&sample_document("d1", 0)).unwrap();
        store
            .conn()
            .execute(
                "UPDATE documents SET classification_json = '{not json' WHERE id = 'd1'",
                [],
            )
            .unwrap();

        let err = store.get_document("d1").unwrap_err();
        assert!(matches!(err, Error::Serialization(_)), "unexpected error: {}", err);
        assert!(store.list_documents(0, 0).is_err());
    }

    #[test]
    fn test_prompt_requires_document() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = store.save_prompt(&sample_prompt("p1", "ghost", 0)).unwrap_err();
        assert!(matches!(err, Error::DocumentNotFound(ref id) if id == "ghost"), "unexpected error: {}", err);
    }

    #[test]
    fn test_sql_int_saturates() {
        assert_eq!(sql_int(0), 0);
        assert_eq!(sql_int(42), 42);
        assert_eq!(sql_int(usize::MAX), i64::MAX);
    }

    #[test]
    fn test_null_json_columns() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.save_document(&sample_document("d1", 0)).unwrap();

        let (classification, extraction): (Option<String>, Option<String>) = store
            .conn()
            .query_row(
                "SELECT classification_json, extraction_json FROM documents WHERE id = 'd1'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert!(classification.is_none());
        assert!(extraction.is_none());

        let doc = store.get_document("d1").unwrap();
        assert!(doc.classification.is_none());
        assert!(doc.extraction.is_none());
    }

    #[test]
    fn test_stats() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.save_document(&sample_document("d1", 0)).unwrap();
        store.save_prompt(&sample_prompt("p1", "d1", 0)).unwrap();
        store.save_prompt(&sample_prompt("p2", "d1", 1)).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.documents, 1);
        assert_eq!(stats.prompts, 2);
        assert!((stats.total_cost - 0.012).abs() < 1e-9);
    }
}
