//! Database schema definitions

/// SQL to create the documents table
pub const CREATE_DOCUMENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    id TEXT PRIMARY KEY,
    filename TEXT NOT NULL,
    content_type TEXT NOT NULL,
    size INTEGER NOT NULL,
    pdf_data BLOB,
    classification_json TEXT,
    extraction_json TEXT,
    created_at DATETIME NOT NULL
)
"#;

/// SQL to create the prompts table
/// Rows are removed together with their owning document
pub const CREATE_PROMPTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS prompts (
    id TEXT PRIMARY KEY,
    document_id TEXT NOT NULL,
    agent_type TEXT NOT NULL,
    prompt TEXT NOT NULL,
    response TEXT NOT NULL,
    schema TEXT,
    model TEXT,
    input_tokens INTEGER DEFAULT 0,
    output_tokens INTEGER DEFAULT 0,
    total_cost REAL DEFAULT 0,
    created_at DATETIME NOT NULL,
    FOREIGN KEY (document_id) REFERENCES documents(id) ON DELETE CASCADE
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_prompts_document_id ON prompts(document_id)",
    "CREATE INDEX IF NOT EXISTS idx_documents_created_at ON documents(created_at)",
];

/// Pragmas applied to every connection before the schema is created
pub const PRAGMAS: &[&str] = &["PRAGMA foreign_keys = ON"];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![CREATE_DOCUMENTS_TABLE, CREATE_PROMPTS_TABLE];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
