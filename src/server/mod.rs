use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::service::DocumentService;

pub mod routes;

/// Largest accepted request body (uploads included)
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Server state
pub struct AppState {
    pub service: DocumentService,
}

/// Build the API router over a fully constructed service
pub fn router(service: DocumentService) -> Router {
    let state = Arc::new(AppState { service });

    Router::new()
        .route("/api/upload", post(routes::upload))
        .route("/api/classify", post(routes::classify))
        .route("/api/extract", post(routes::extract))
        .route("/api/prompts/{id}", get(routes::prompt_history))
        .route("/api/documents", get(routes::list_documents))
        .route("/api/documents/{id}", get(routes::get_document))
        .route("/health", get(routes::health))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server(port: u16, service: DocumentService) -> anyhow::Result<()> {
    let app = router(service);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::MockAgentClient;
    use crate::storage::MemoryStore;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    const BOUNDARY: &str = "docsift-test-boundary";
    const PDF: &[u8] = b"%PDF-1.4\n1 0 obj\n<<>>\nendobj\n";

    fn app() -> Router {
        router(DocumentService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MockAgentClient::new()),
        ))
    }

    fn upload_request(filename: &str, data: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::post("/api/upload")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    fn json_request(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"ok");
    }

    #[tokio::test]
    async fn test_full_flow() {
        let app = app();

        let (status, uploaded) = send(&app, upload_request("invoice.pdf", PDF)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(uploaded["filename"], "invoice.pdf");
        assert_eq!(uploaded["size"], PDF.len());
        let id = uploaded["id"].as_str().unwrap().to_string();

        let (status, classified) = send(&app, json_request("/api/classify", json!({"document_id": id}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(classified["classification"]["document_type"], "invoice");

        let (status, extracted) = send(&app, json_request("/api/extract", json!({"document_id": id}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(extracted["extraction"]["data"]["total"], 100.0);
        assert!(extracted["schema_used"].as_str().unwrap().contains("invoice_number"));

        let (status, doc) = send(
            &app,
            Request::get(format!("/api/documents/{id}")).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(doc["pdf_base64"], "JVBERi0xLjQKMSAwIG9iago8PD4+CmVuZG9iago=");
        assert_eq!(doc["classification"]["document_type"], "invoice");
        assert!(doc["created_at"].as_str().unwrap().contains('T'));

        let (status, prompts) = send(
            &app,
            Request::get(format!("/api/prompts/{id}")).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(prompts.as_array().unwrap().len(), 2);

        let prompt_id = classified["prompt_id"].as_str().unwrap();
        let (status, prompt) = send(
            &app,
            Request::get(format!("/api/prompts/{prompt_id}")).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(prompt["agent_type"], "classification");
    }

    #[tokio::test]
    async fn test_upload_rejects_non_pdf() {
        let (status, body) = send(&app(), upload_request("notes.txt", b"plain text")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Invalid PDF"));
    }

    #[tokio::test]
    async fn test_missing_document() {
        let app = app();
        let (status, body) = send(
            &app,
            Request::get("/api/documents/missing").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("missing"));

        let (status, _) = send(&app, json_request("/api/classify", json!({"document_id": "missing"}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_extract_unclassified_without_type() {
        let app = app();
        let (_, uploaded) = send(&app, upload_request("scan.pdf", PDF)).await;
        let id = uploaded["id"].as_str().unwrap();

        let (status, _) = send(&app, json_request("/api/extract", json!({"document_id": id}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, extracted) = send(
            &app,
            json_request("/api/extract", json!({"document_id": id, "document_type": "receipt"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(extracted["extraction"]["schema_used"], "receipt");
    }

    #[tokio::test]
    async fn test_agent_calls_without_agent() {
        let app = router(DocumentService::read_only(Arc::new(MemoryStore::new())));
        let (_, uploaded) = send(&app, upload_request("scan.pdf", PDF)).await;
        let id = uploaded["id"].as_str().unwrap();

        let (status, body) = send(&app, json_request("/api/classify", json!({"document_id": id}))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["error"].as_str().unwrap().contains("No agent"));
    }

    #[tokio::test]
    async fn test_list_documents() {
        let app = app();
        for name in ["a.pdf", "b.pdf", "c.pdf"] {
            send(&app, upload_request(name, PDF)).await;
        }

        let (status, docs) = send(
            &app,
            Request::get("/api/documents?limit=2").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(docs.as_array().unwrap().len(), 2);
        assert!(docs[0].get("pdf_base64").is_none());

        let (status, docs) = send(
            &app,
            Request::get("/api/documents?offset=18446744073709551615")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(docs.as_array().unwrap().is_empty());
    }
}
