mod config;
mod metrics;
mod retry;

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State},
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use config::AppConfig;
use metrics::Metrics;
use ocr::{ExtractionResult, OcrClient, OcrPipeline, TransportError};
use retry::RetryPolicy;

struct AppState {
    pipeline: OcrPipeline,
    retry: RetryPolicy,
    metrics: Arc<Metrics>,
    config: AppConfig,
}

/// Error response in the `{"detail": ...}` shape the frontend expects.
struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }

    fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.into(),
        }
    }
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        // Transport failures are the upstream's fault, not the client's.
        Self {
            status: StatusCode::BAD_GATEWAY,
            detail: format!("OCR service failure ({}): {}", err.category(), err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    ocr_api_status: &'static str,
    max_text_length: usize,
}

#[derive(Serialize)]
struct UploadResponse {
    success: bool,
    filename: String,
    text_length: usize,
    extracted_text: String,
}

#[derive(Deserialize)]
struct ProcessTextRequest {
    text: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env();
    let client = OcrClient::new(
        config.ocr.base_url.clone(),
        config.ocr.model.clone(),
        config.ocr.max_text_length,
        config.ocr.timeout_secs,
    );
    let state = Arc::new(AppState {
        pipeline: OcrPipeline::new(client),
        retry: RetryPolicy::from_config(&config.retry),
        metrics: Metrics::new(),
        config,
    });

    let listener = tokio::net::TcpListener::bind(&state.config.bind_addr).await?;
    tracing::info!(addr = %state.config.bind_addr, "server listening");

    axum::serve(listener, app(state)).await?;
    Ok(())
}

fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/upload-pdf", post(upload_pdf))
        .route("/process-pdf", post(process_pdf))
        .route("/process-text", post(process_text))
        .route("/stats", get(get_stats))
        .layer(DefaultBodyLimit::max(50 * 1024 * 1024))
        .layer(cors_layer(&state.config.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "PDF OCR Processing API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "upload": "/upload-pdf",
            "process": "/process-pdf",
            "process_text": "/process-text",
            "health": "/health",
            "stats": "/stats",
        }
    }))
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let url = format!("{}/v1/models", state.config.ocr.base_url);
    let timeout = Duration::from_secs(state.config.ocr.health_timeout_secs);
    let ocr_api_status = match reqwest::Client::builder().timeout(timeout).build() {
        Ok(probe) => match probe.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => "online",
            _ => "offline",
        },
        Err(_) => "offline",
    };

    Json(HealthResponse {
        status: "healthy",
        ocr_api_status,
        max_text_length: state.config.ocr.max_text_length,
    })
}

async fn upload_pdf(mut multipart: Multipart) -> Result<Json<UploadResponse>, ApiError> {
    let (filename, bytes) = read_pdf_upload(&mut multipart).await?;
    let text = extract_text(bytes).await?;

    let text_length = text.chars().count();
    let extracted_text = if text_length > 1000 {
        format!("{}...", ocr::prompt::truncate_input(&text, 1000))
    } else {
        text
    };

    Ok(Json(UploadResponse {
        success: true,
        filename,
        text_length,
        extracted_text,
    }))
}

async fn process_pdf(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ExtractionResult>, ApiError> {
    let (filename, bytes) = read_pdf_upload(&mut multipart).await?;
    tracing::info!(filename = %filename, bytes = bytes.len(), "processing PDF");

    let text = extract_text(bytes).await?;
    if text.is_empty() {
        state.metrics.record_request(false);
        return Err(ApiError::bad_request("No text found in PDF"));
    }
    state.metrics.record_document();

    run_ocr(&state, &text).await
}

async fn process_text(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ProcessTextRequest>,
) -> Result<Json<ExtractionResult>, ApiError> {
    if req.text.trim().is_empty() {
        return Err(ApiError::bad_request("Text cannot be empty"));
    }
    run_ocr(&state, &req.text).await
}

async fn get_stats(State(state): State<Arc<AppState>>) -> Json<metrics::MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

/// Model call plus normalization, with the configured retry policy around
/// the call. Transport failures surface as 502; everything the model said,
/// however mangled, comes back as a 200 extraction result.
async fn run_ocr(state: &AppState, text: &str) -> Result<Json<ExtractionResult>, ApiError> {
    let started = Instant::now();
    let outcome = state.retry.run("ocr_call", || state.pipeline.process(text)).await;
    state.metrics.record_ocr_call(started.elapsed());

    match outcome {
        Ok(result) => {
            state.metrics.record_request(result.success);
            Ok(Json(result))
        }
        Err(err) => {
            state.metrics.record_request(false);
            Err(ApiError::from(err))
        }
    }
}

/// Pull the uploaded file out of the multipart body and vet it.
async fn read_pdf_upload(multipart: &mut Multipart) -> Result<(String, Bytes), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::bad_request(format!("invalid multipart body: {err}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload.pdf").to_string();
        if !filename.to_lowercase().ends_with(".pdf") {
            return Err(ApiError::bad_request("Only PDF files are allowed"));
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|err| ApiError::bad_request(format!("failed to read upload: {err}")))?;
        if !pdftext::looks_like_pdf(&bytes) {
            return Err(ApiError::bad_request("File is not a valid PDF"));
        }
        return Ok((filename, bytes));
    }
    Err(ApiError::bad_request("missing 'file' field in upload"))
}

/// PDF parsing is CPU-bound; keep it off the async workers.
async fn extract_text(bytes: Bytes) -> Result<String, ApiError> {
    let result = tokio::task::spawn_blocking(move || pdftext::extract_text(&bytes))
        .await
        .map_err(|err| ApiError::internal(format!("extraction task failed: {err}")))?;
    result.map_err(|err| ApiError::bad_request(format!("Error extracting text from PDF: {err}")))
}
