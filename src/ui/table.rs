use tabled::{settings::Style, Table, Tabled};

use crate::document::{Document, PromptRecord};
use crate::storage::sqlite::DbStats;
use crate::ui::human_bytes;

#[derive(Tabled)]
struct DocumentRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Filename")]
    filename: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Type")]
    document_type: String,
    #[tabled(rename = "Extracted")]
    extracted: String,
    #[tabled(rename = "Created")]
    created_at: String,
}

impl From<&Document> for DocumentRow {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            filename: doc.filename.clone(),
            size: human_bytes(doc.size.max(0) as u64),
            document_type: doc
                .classification
                .as_ref()
                .map(|c| format!("{} ({:.0}%)", c.document_type, c.confidence * 100.0))
                .unwrap_or_else(|| "-".to_string()),
            extracted: if doc.is_extracted() { "yes" } else { "no" }.to_string(),
            created_at: doc.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

#[derive(Tabled)]
struct PromptRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Agent")]
    agent_type: String,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Tokens (in/out)")]
    tokens: String,
    #[tabled(rename = "Cost")]
    cost: String,
    #[tabled(rename = "Created")]
    created_at: String,
}

impl From<&PromptRecord> for PromptRow {
    fn from(record: &PromptRecord) -> Self {
        Self {
            id: record.id.clone(),
            agent_type: record.agent_type.to_string(),
            model: record.model.clone(),
            tokens: format!("{}/{}", record.input_tokens, record.output_tokens),
            cost: format!("${:.4}", record.total_cost),
            created_at: record.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

fn render<T: Tabled>(rows: Vec<T>) -> String {
    if rows.is_empty() {
        return String::new();
    }
    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn document_table(docs: &[Document]) -> String {
    render(docs.iter().map(DocumentRow::from).collect())
}

pub fn prompt_table(records: &[PromptRecord]) -> String {
    render(records.iter().map(PromptRow::from).collect())
}

pub fn stats_table(stats: &DbStats) -> String {
    render(vec![
        MetricRow { metric: "Documents", value: stats.documents.to_string() },
        MetricRow { metric: "Prompts", value: stats.prompts.to_string() },
        MetricRow { metric: "Total cost", value: format!("${:.4}", stats.total_cost) },
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{AgentType, TokenUsage};

    #[test]
    fn test_empty_tables_render_nothing() {
        assert!(document_table(&[]).is_empty());
        assert!(prompt_table(&[]).is_empty());
    }

    #[test]
    fn test_document_table() {
        let doc = Document::new("d1", "invoice.pdf", b"%PDF-1.4".to_vec());
        let table = document_table(&[doc]);
        assert!(table.contains("invoice.pdf"));
        assert!(table.contains("8 B"));
        assert!(table.contains("Filename"));
    }

    #[test]
    fn test_prompt_table() {
        let usage = TokenUsage::priced("claude-test", 1000, 200);
        let record = PromptRecord::new("p1", "d1", AgentType::Classification, "prompt", "{}", &usage);
        let table = prompt_table(&[record]);
        assert!(table.contains("classification"));
        assert!(table.contains("1000/200"));
        assert!(table.contains("$0.0060"));
    }
}
