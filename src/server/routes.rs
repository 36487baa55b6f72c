use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::document::{Classification, Document, Extraction};
use crate::server::AppState;
use crate::service::{ClassifyOutcome, ExtractOutcome, PromptHistory};
use crate::Error;

#[derive(Deserialize)]
pub struct ClassifyRequest {
    pub document_id: String,
}

#[derive(Deserialize)]
pub struct ExtractRequest {
    pub document_id: String,
    /// Overrides the stored classification
    pub document_type: Option<String>,
}

#[derive(Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Serialize)]
pub struct UploadResponse {
    pub id: String,
    pub filename: String,
    pub size: i64,
}

#[derive(Serialize)]
pub struct DocumentResponse {
    pub id: String,
    pub filename: String,
    pub content_type: String,
    pub size: i64,
    pub pdf_base64: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction: Option<Extraction>,
    pub created_at: String,
}

impl From<Document> for DocumentResponse {
    fn from(doc: Document) -> Self {
        Self {
            pdf_base64: BASE64.encode(&doc.pdf_data),
            created_at: doc.created_at.to_rfc3339(),
            id: doc.id,
            filename: doc.filename,
            content_type: doc.content_type,
            size: doc.size,
            classification: doc.classification,
            extraction: doc.extraction,
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error returned by handlers, rendered as `{"error": ...}`
pub struct ApiError {
    status: StatusCode,
    message: String,
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    ApiError {
        status,
        message: message.into(),
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        let status = match &e {
            Error::DocumentNotFound(_) | Error::PromptNotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::Agent(_) => StatusCode::BAD_GATEWAY,
            Error::AgentUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("Request failed: {}", e);
        }
        api_error(status, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { error: self.message })).into_response()
    }
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<UploadResponse> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("Failed to read file: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or("upload.pdf").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("Failed to read file content: {}", e)))?;

        let doc = state.service.upload(&filename, data.to_vec())?;
        return Ok(Json(UploadResponse {
            id: doc.id,
            filename: doc.filename,
            size: doc.size,
        }));
    }

    Err(api_error(StatusCode::BAD_REQUEST, "Failed to read file: missing 'file' field"))
}

pub async fn classify(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ClassifyRequest>,
) -> ApiResult<ClassifyOutcome> {
    Ok(Json(state.service.classify(&req.document_id).await?))
}

pub async fn extract(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ExtractRequest>,
) -> ApiResult<ExtractOutcome> {
    let outcome = state
        .service
        .extract(&req.document_id, req.document_type.as_deref())
        .await?;
    Ok(Json(outcome))
}

pub async fn prompt_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<PromptHistory> {
    Ok(Json(state.service.prompt_history(&id)?))
}

pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<DocumentResponse> {
    let doc = state.service.document(&id)?;
    Ok(Json(DocumentResponse::from(doc)))
}

/// Document metadata, newest first; payloads are not included
pub async fn list_documents(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Vec<Document>> {
    let docs = state
        .service
        .list_documents(params.limit.unwrap_or(0), params.offset.unwrap_or(0))?;
    Ok(Json(docs))
}
