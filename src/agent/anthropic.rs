//! AnthropicClient - Claude Messages API
//!
//! Sends the PDF as a base64 document block followed by the instruction text,
//! then recovers the JSON answer from the first text block of the reply.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use super::response::{parse_classification, parse_extraction};
use super::{AgentClient, AgentError, AgentOutput, prompts};
use crate::document::{Classification, Extraction, PDF_CONTENT_TYPE, TokenUsage};

/// Default Anthropic API URL
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";

/// API version header
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Default model
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";

const CLASSIFY_MAX_TOKENS: u32 = 1024;
const EXTRACT_MAX_TOKENS: u32 = 4096;

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: Vec<RequestBlock<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum RequestBlock<'a> {
    Document { source: DocumentSource },
    Text { text: &'a str },
}

#[derive(Debug, Serialize)]
struct DocumentSource {
    #[serde(rename = "type")]
    source_type: &'static str,
    media_type: &'static str,
    data: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Anthropic Claude provider.
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    api_url: String,
}

impl AnthropicClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            api_url: ANTHROPIC_API_URL.to_string(),
        }
    }

    /// Build a client from `ANTHROPIC_API_KEY`
    pub fn from_env() -> Result<Self, AgentError> {
        match std::env::var("ANTHROPIC_API_KEY") {
            Ok(key) if !key.trim().is_empty() => Ok(Self::new(key)),
            _ => Err(AgentError::MissingApiKey),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set a custom API URL (for testing or proxies).
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request<'a>(&'a self, pdf_data: &[u8], prompt: &'a str, max_tokens: u32) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &self.model,
            max_tokens,
            messages: vec![Message {
                role: "user",
                content: vec![
                    RequestBlock::Document {
                        source: DocumentSource {
                            source_type: "base64",
                            media_type: PDF_CONTENT_TYPE,
                            data: BASE64.encode(pdf_data),
                        },
                    },
                    RequestBlock::Text { text: prompt },
                ],
            }],
        }
    }

    /// Send one request and return the reply text with its priced usage
    async fn send(
        &self,
        pdf_data: &[u8],
        prompt: &str,
        max_tokens: u32,
    ) -> Result<(String, TokenUsage), AgentError> {
        let body = self.build_request(pdf_data, prompt, max_tokens);
        tracing::debug!(model = %self.model, pdf_bytes = pdf_data.len(), "Calling Anthropic Messages API");

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(AgentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let reply: MessagesResponse = response.json().await?;
        let usage = TokenUsage::priced(
            self.model.clone(),
            reply.usage.input_tokens,
            reply.usage.output_tokens,
        );
        let text = first_text(&reply.content).ok_or(AgentError::EmptyResponse)?;
        Ok((text.to_string(), usage))
    }
}

/// Text of the first text block in a reply
fn first_text(content: &[ContentBlock]) -> Option<&str> {
    content
        .iter()
        .find(|block| block.block_type == "text")
        .and_then(|block| block.text.as_deref())
}

#[async_trait]
impl AgentClient for AnthropicClient {
    async fn classify(&self, pdf_data: &[u8]) -> Result<AgentOutput<Classification>, AgentError> {
        let prompt = prompts::classification_prompt();
        let (text, usage) = self.send(pdf_data, &prompt, CLASSIFY_MAX_TOKENS).await?;
        let result = parse_classification(&text)?;
        Ok(AgentOutput { result, prompt, usage })
    }

    async fn extract(
        &self,
        pdf_data: &[u8],
        document_type: &str,
        schema: &str,
    ) -> Result<AgentOutput<Extraction>, AgentError> {
        let prompt = prompts::extraction_prompt(document_type, schema);
        let (text, usage) = self.send(pdf_data, &prompt, EXTRACT_MAX_TOKENS).await?;
        let result = parse_extraction(&text)?;
        Ok(AgentOutput { result, prompt, usage })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode, header};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{Value, json};
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_request_shape() {
        let client = AnthropicClient::new("test-key").with_model("claude-test");
        let request = client.build_request(b"%PDF-1.4", "classify it", 1024);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "claude-test");
        assert_eq!(json["max_tokens"], 1024);
        let content = &json["messages"][0]["content"];
        assert_eq!(content[0]["type"], "document");
        assert_eq!(content[0]["source"]["type"], "base64");
        assert_eq!(content[0]["source"]["media_type"], "application/pdf");
        assert_eq!(content[0]["source"]["data"], "JVBERi0xLjQ=");
        assert_eq!(content[1]["type"], "text");
        assert_eq!(content[1]["text"], "classify it");
    }

    #[test]
    fn test_response_parsing() {
        let reply: MessagesResponse = serde_json::from_str(
            r#"{
                "content": [
                    {"type": "thinking", "thinking": "..."},
                    {"type": "text", "text": "{\"a\": 1}"}
                ],
                "usage": {"input_tokens": 1000, "output_tokens": 200}
            }"#,
        )
        .unwrap();

        assert_eq!(first_text(&reply.content), Some("{\"a\": 1}"));
        assert_eq!(reply.usage.input_tokens, 1000);
        assert_eq!(reply.usage.output_tokens, 200);
    }

    #[test]
    fn test_no_text_block() {
        let reply: MessagesResponse = serde_json::from_str(r#"{"content": []}"#).unwrap();
        assert_eq!(first_text(&reply.content), None);
    }

    #[test]
    fn test_default_model() {
        let client = AnthropicClient::new("k");
        assert_eq!(client.model(), DEFAULT_MODEL);
    }

    /// What the stub provider saw: the `x-api-key` header and the JSON body
    type Seen = Arc<Mutex<Option<(String, Value)>>>;

    /// Serve one canned reply on a local port and return its messages URL
    async fn stub_provider(status: StatusCode, body: &str) -> (String, Seen) {
        let seen: Seen = Arc::default();
        let recorder = Arc::clone(&seen);
        let body = body.to_string();

        let app = Router::new().route(
            "/v1/messages",
            post(move |headers: HeaderMap, Json(request): Json<Value>| {
                let recorder = Arc::clone(&recorder);
                let body = body.clone();
                async move {
                    let key = headers
                        .get("x-api-key")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    *recorder.lock().unwrap() = Some((key, request));
                    (status, [(header::CONTENT_TYPE, "application/json")], body)
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}/v1/messages", addr), seen)
    }

    fn client_for(url: &str) -> AnthropicClient {
        AnthropicClient::new("test-key")
            .with_model("claude-test")
            .with_api_url(url)
    }

    #[tokio::test]
    async fn test_classify_over_http() {
        let reply = json!({
            "content": [{
                "type": "text",
                "text": "Here you go:\n```json\n{\"document_type\": \"invoice\", \"confidence\": 0.9, \"reasoning\": \"totals\"}\n```"
            }],
            "usage": {"input_tokens": 1000, "output_tokens": 200}
        });
        let (url, seen) = stub_provider(StatusCode::OK, &reply.to_string()).await;

        let output = client_for(&url).classify(b"%PDF-1.4").await.unwrap();
        assert_eq!(output.result.document_type, "invoice");
        assert_eq!(output.usage.model, "claude-test");
        assert_eq!(output.usage.input_tokens, 1000);
        assert_eq!(output.usage.output_tokens, 200);
        assert!((output.usage.total_cost - 0.006).abs() < 1e-9);
        assert_eq!(output.prompt, prompts::classification_prompt());

        let (key, request) = seen.lock().unwrap().clone().unwrap();
        assert_eq!(key, "test-key");
        assert_eq!(request["model"], "claude-test");
        assert_eq!(request["max_tokens"], CLASSIFY_MAX_TOKENS);
        assert_eq!(request["messages"][0]["content"][0]["source"]["data"], "JVBERi0xLjQ=");
    }

    #[tokio::test]
    async fn test_extract_over_http() {
        let reply = json!({
            "content": [{
                "type": "text",
                "text": "{\"schema_used\": \"receipt\", \"data\": {\"total\": 12.5}, \"fields\": []}"
            }],
            "usage": {"input_tokens": 2000, "output_tokens": 500}
        });
        let (url, seen) = stub_provider(StatusCode::OK, &reply.to_string()).await;

        let output = client_for(&url)
            .extract(b"%PDF-1.4", "receipt", "{\"type\": \"object\"}")
            .await
            .unwrap();
        assert_eq!(output.result.schema_used, "receipt");
        assert_eq!(output.result.data["total"], 12.5);
        assert!((output.usage.total_cost - 0.0135).abs() < 1e-9);

        let (_, request) = seen.lock().unwrap().clone().unwrap();
        assert_eq!(request["max_tokens"], EXTRACT_MAX_TOKENS);
        let text = request["messages"][0]["content"][1]["text"].as_str().unwrap();
        assert!(text.contains("from a receipt document"));
    }

    #[tokio::test]
    async fn test_error_status_carries_provider_message() {
        let reply = json!({
            "type": "error",
            "error": {"type": "authentication_error", "message": "invalid x-api-key"}
        });
        let (url, _) = stub_provider(StatusCode::UNAUTHORIZED, &reply.to_string()).await;

        let err = client_for(&url).classify(b"%PDF-1.4").await.unwrap_err();
        match err {
            AgentError::Api { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "invalid x-api-key");
            }
            other => panic!("expected an API error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_status_with_unstructured_body() {
        let (url, _) = stub_provider(StatusCode::SERVICE_UNAVAILABLE, "upstream overloaded").await;

        let err = client_for(&url).classify(b"%PDF-1.4").await.unwrap_err();
        match err {
            AgentError::Api { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "upstream overloaded");
            }
            other => panic!("expected an API error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reply_without_text_is_empty_response() {
        let reply = json!({"content": [], "usage": {"input_tokens": 10, "output_tokens": 0}});
        let (url, _) = stub_provider(StatusCode::OK, &reply.to_string()).await;

        let err = client_for(&url).classify(b"%PDF-1.4").await.unwrap_err();
        assert!(matches!(err, AgentError::EmptyResponse), "unexpected error: {:?}", err);
    }

    #[tokio::test]
    async fn test_unparseable_text_is_parse_error() {
        let reply = json!({"content": [{"type": "text", "text": "I cannot read this file."}]});
        let (url, _) = stub_provider(StatusCode::OK, &reply.to_string()).await;

        let err = client_for(&url).classify(b"%PDF-1.4").await.unwrap_err();
        assert!(
            matches!(err, AgentError::Parse { what: "classification", .. }),
            "unexpected error: {:?}",
            err
        );
    }
}
