//! Prompt templates sent alongside the PDF

/// Instructions for the classification pass
pub const CLASSIFICATION_PROMPT: &str = r#"Analyze this PDF document and classify it.

Return a JSON object with the following structure:
{
  "document_type": "string - the primary type of document (e.g., 'invoice', 'contract', 'resume', 'report', 'letter', 'form', 'receipt', 'statement', 'manual', 'other')",
  "confidence": number between 0 and 1,
  "reasoning": "string - detailed explanation of why you classified it this way, including key indicators you found",
  "subtypes": ["array of more specific classifications if applicable"],
  "language": "string - primary language of the document"
}

Be thorough in your reasoning - explain what specific elements led to your classification."#;

pub fn classification_prompt() -> String {
    CLASSIFICATION_PROMPT.to_string()
}

/// Instructions for extracting `document_type` data against `schema`
pub fn extraction_prompt(document_type: &str, schema: &str) -> String {
    format!(
        r#"You are extracting structured data from a {document_type} document.

Use the following JSON schema for the extraction:
{schema}

For each field you extract, also identify:
1. The exact source text from the document that contains this information
2. The page number where you found it (1-indexed)
3. Your confidence level (0-1) in the extraction

Return a JSON object with this structure:
{{
  "schema_used": "{document_type}",
  "data": {{
    // The extracted data matching the schema
  }},
  "fields": [
    {{
      "name": "field_name",
      "value": "extracted value",
      "source_text": "exact text from document",
      "page_number": 1,
      "confidence": 0.95
    }}
  ]
}}

Be precise with source_text - it should be the exact text that appears in the document."#
    )
}
