use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use redact_core::{Pipeline, PipelineError};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;

const FILE_FIELD: &str = "file";
const BYTES_PER_MB: u64 = 1024 * 1024;

/// Accepted uploads.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub max_upload_mb: u64,
    /// Lowercase, without the dot
    pub allowed_extensions: Vec<String>,
}

impl UploadPolicy {
    pub fn max_bytes(&self) -> usize {
        usize::try_from(self.max_upload_mb.saturating_mul(BYTES_PER_MB)).unwrap_or(usize::MAX)
    }

    pub fn is_allowed(&self, filename: &str) -> bool {
        match filename.rsplit_once('.') {
            Some((_, ext)) => {
                let ext = ext.to_ascii_lowercase();
                self.allowed_extensions.iter().any(|allowed| *allowed == ext)
            }
            None => false,
        }
    }
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_upload_mb: 16,
            allowed_extensions: ["png", "jpg", "jpeg", "bmp", "gif", "tiff"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

#[derive(Clone)]
struct AppState {
    pipeline: Arc<Pipeline>,
    policy: Arc<UploadPolicy>,
}

pub fn router(pipeline: Arc<Pipeline>, policy: UploadPolicy) -> Router {
    let body_limit = policy.max_bytes();
    let state = AppState {
        pipeline,
        policy: Arc::new(policy),
    };

    Router::new()
        .route("/redact-pii", post(redact_pii))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

pub async fn serve<F>(app: Router, host: &str, port: u16, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr).await?;

    log::info!("[Server] PII Redaction API listening on {}", addr);

    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;

    log::info!("[Server] PII Redaction API stopped");
    Ok(())
}

/// GET /health
async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "PII Redaction API"
    }))
}

/// POST /redact-pii - multipart upload, responds with the redacted PNG
async fn redact_pii(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let mut multipart = multipart.map_err(|err| {
        log::warn!("[Server] rejected upload: {}", err);
        ApiError::BadRequest("No file part in the request".to_string())
    })?;

    let (filename, content) = loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|err| ApiError::from_multipart(err, &state.policy))?
            .ok_or_else(|| ApiError::BadRequest("No file part in the request".to_string()))?;

        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        if filename.is_empty() {
            return Err(ApiError::BadRequest("No file selected".to_string()));
        }
        if !state.policy.is_allowed(&filename) {
            return Err(ApiError::BadRequest(format!(
                "File type not allowed. Allowed types: {}",
                state.policy.allowed_extensions.join(", ")
            )));
        }

        let content = field
            .bytes()
            .await
            .map_err(|err| ApiError::from_multipart(err, &state.policy))?;
        break (filename, content);
    };

    if content.is_empty() {
        return Err(ApiError::BadRequest("Empty file".to_string()));
    }

    log::info!("[Server] processing {} ({} bytes)", filename, content.len());
    let start = Instant::now();

    let pipeline = state.pipeline.clone();
    let outcome = tokio::task::spawn_blocking(move || pipeline.run(&content))
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?
        .map_err(ApiError::Pipeline)?;

    log::info!(
        "[Server] redacted {} in {} ms ({} regions)",
        filename,
        start.elapsed().as_millis(),
        outcome.report.region_count
    );

    let disposition = format!("attachment; filename=\"{}\"", download_name(&filename));
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, outcome.image.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        outcome.image.bytes,
    )
        .into_response())
}

/// Attachment name for the redacted image: the upload's sanitised stem with a `.png` extension.
pub fn download_name(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or_default();
    let stem = match base.rsplit_once('.') {
        Some((stem, _)) => stem,
        None => base,
    };

    let sanitised: String = stem
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    let sanitised = sanitised.trim_matches(|c| c == '.' || c == '_');

    if sanitised.is_empty() {
        "redacted.png".to_string()
    } else {
        format!("{}.png", sanitised)
    }
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    PayloadTooLarge { max_upload_mb: u64 },
    Pipeline(PipelineError),
    Internal(String),
}

impl ApiError {
    fn from_multipart(err: MultipartError, policy: &UploadPolicy) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge {
                max_upload_mb: policy.max_upload_mb,
            }
        } else {
            ApiError::BadRequest(format!("Malformed upload: {}", err.body_text()))
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                log::warn!("[Server] bad request: {}", message);
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ApiError::PayloadTooLarge { max_upload_mb } => {
                log::warn!("[Server] upload over {} MB rejected", max_upload_mb);
                (
                    StatusCode::PAYLOAD_TOO_LARGE,
                    Json(json!({
                        "error": format!("File too large. Maximum file size is {}MB.", max_upload_mb)
                    })),
                )
                    .into_response()
            }
            ApiError::Pipeline(err) => {
                log::error!("[Server] error processing request: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "error": format!("An error occurred: {}", err),
                        "kind": err.kind(),
                    })),
                )
                    .into_response()
            }
            ApiError::Internal(message) => {
                log::error!("[Server] internal error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "error": format!("An error occurred: {}", message),
                        "kind": "InternalError",
                    })),
                )
                    .into_response()
            }
        }
    }
}
