//! HTTP surface of the extraction service.
//!
//! # Endpoints
//!
//! Every route is served both at the root and under `/api`.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/ocr` | Multipart upload: `file`, `prompt_text`, `file_ext`, `model`, `prompt` |
//! | `POST` | `/summary` | Form: `url`, `prompt_text`, `file_ext`, `model`, `prompt` |
//! | `GET`  | `/health` | `{"status":"healthy"}` |
//!
//! Successful extractions return the sanitised text as a file download
//! (`Content-Disposition: attachment`). Errors return
//! `{"error": "<message>"}` with `400` for request problems and `500` for
//! everything else.

use crate::error::ExtractError;
use crate::extract::{ExtractRequest, Extractor};
use crate::output::SanitizedOutput;
use crate::source::SourceContent;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Largest accepted request body.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[derive(Clone)]
struct AppState {
    extractor: Arc<Extractor>,
}

/// Build the router with CORS and request tracing.
pub fn router(extractor: Arc<Extractor>) -> Router {
    let routes = Router::new()
        .route("/ocr", post(handle_ocr))
        .route("/summary", post(handle_summary))
        .route("/health", get(handle_health));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes.clone())
        .nest("/api", routes)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(AppState { extractor })
}

/// Bind to `bind` and serve until the process is stopped.
pub async fn run_server(extractor: Arc<Extractor>, bind: &str) -> Result<(), ExtractError> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| ExtractError::Internal(format!("Failed to bind {bind}: {e}")))?;
    info!("Listening on http://{}", bind);

    axum::serve(listener, router(extractor))
        .await
        .map_err(|e| ExtractError::Internal(format!("Server error: {e}")))
}

// ── Error response ──────────────────────────────────────────────────────────

struct AppError(ExtractError);

impl From<ExtractError> for AppError {
    fn from(e: ExtractError) -> Self {
        AppError(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            error!("Request failed: {}", self.0);
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

// ── Handlers ────────────────────────────────────────────────────────────────

async fn handle_health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

async fn handle_ocr(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut source: Option<SourceContent> = None;
    let mut fields = RequestFields::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ExtractError::InvalidInput(format!("Multipart error: {e}")))?
    {
        let name = field.name().map(|n| n.to_string());
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ExtractError::InvalidInput(format!("Read error: {e}")))?;
                source = Some(SourceContent::new(file_name, bytes.to_vec()));
            }
            Some(other) => {
                let key = other.to_string();
                let value = field
                    .text()
                    .await
                    .map_err(|e| ExtractError::InvalidInput(format!("Read error: {e}")))?;
                fields.set(&key, value);
            }
            None => {}
        }
    }

    let source = source.ok_or(ExtractError::MissingField("file"))?;
    if source.name.trim().is_empty() {
        return Err(ExtractError::InvalidInput("uploaded file has no name".into()).into());
    }

    if let Some(spec) = fields
        .prompt
        .as_deref()
        .and_then(|p| state.extractor.prompts().lookup(p.trim()))
    {
        if spec.requires_url() {
            return Err(ExtractError::InvalidInput(format!(
                "prompt '{}' runs on a web page; use /summary",
                spec.name
            ))
            .into());
        }
    }

    let request = fields.into_request(&state.extractor)?;
    let output = state.extractor.process_document(&source, &request).await?;
    Ok(file_response(output))
}

#[derive(Debug, Default, Deserialize)]
struct SummaryForm {
    #[serde(default)]
    url: String,
    prompt_text: Option<String>,
    file_ext: Option<String>,
    model: Option<String>,
    prompt: Option<String>,
}

async fn handle_summary(
    State(state): State<AppState>,
    Form(form): Form<SummaryForm>,
) -> Result<Response, AppError> {
    if form.url.trim().is_empty() {
        return Err(ExtractError::MissingField("url").into());
    }
    let fields = RequestFields {
        prompt_text: form.prompt_text,
        file_ext: form.file_ext,
        model: form.model,
        prompt: form.prompt,
    };
    let request = fields.into_request(&state.extractor)?;
    let output = state.extractor.process_url(&form.url, &request).await?;
    Ok(file_response(output))
}

/// Optional text fields shared by both extraction routes.
#[derive(Debug, Default)]
struct RequestFields {
    prompt_text: Option<String>,
    file_ext: Option<String>,
    model: Option<String>,
    prompt: Option<String>,
}

impl RequestFields {
    fn set(&mut self, key: &str, value: String) {
        match key {
            "prompt_text" => self.prompt_text = Some(value),
            "file_ext" => self.file_ext = Some(value),
            "model" => self.model = Some(value),
            "prompt" => self.prompt = Some(value),
            _ => {}
        }
    }

    fn into_request(self, extractor: &Extractor) -> Result<ExtractRequest, ExtractError> {
        let request = ExtractRequest {
            prompt_text: self.prompt_text.unwrap_or_default(),
            file_ext: self.file_ext.unwrap_or_default(),
            provider: self.model,
        };
        extractor.resolve_request(request, self.prompt.as_deref())
    }
}

fn file_response(output: SanitizedOutput) -> Response {
    let disposition = format!(
        "attachment; filename=\"{}\"",
        header_safe(&output.download_name)
    );
    (
        [
            (header::CONTENT_TYPE, output.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        output.text,
    )
        .into_response()
}

/// Replace anything that cannot appear inside a quoted header parameter.
fn header_safe(name: &str) -> String {
    name.chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
