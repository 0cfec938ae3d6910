//! REST API server for the document analyzer
//!
//! `GET /` health check and `POST /analyze` multipart upload.

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::DEFAULT_QUERY;
use crate::crew::AnalysisPipeline;
use crate::error::AnalyzerError;
use crate::models::CrewInputs;
use crate::tools::document::is_pdf_signature;
use crate::upload::UploadedDocument;

pub const HEALTH_MESSAGE: &str = "Financial Document Analyzer API is running";
const GENERIC_FAILURE: &str = "Error processing financial document";
const DEFAULT_FILENAME: &str = "document.pdf";

/// =============================
/// Response Models
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub status: String,
    pub query: String,
    pub analysis: String,
    pub file_processed: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub detail: String,
    pub timestamp: String,
}

/// Error returned to HTTP clients
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

impl From<AnalyzerError> for ApiError {
    fn from(err: AnalyzerError) -> Self {
        match &err {
            AnalyzerError::InvalidInput(_) => Self::new(StatusCode::BAD_REQUEST, err.to_string()),
            AnalyzerError::UnsupportedFileType(_) => {
                Self::new(StatusCode::UNSUPPORTED_MEDIA_TYPE, err.to_string())
            }
            _ if err.is_extraction_error() => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
            }
            _ => {
                error!(error = %err, "Analysis failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_FAILURE)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            status: "error".to_string(),
            detail: self.detail,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        (self.status, Json(body)).into_response()
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub pipeline: Arc<dyn AnalysisPipeline>,
    pub upload_dir: Arc<PathBuf>,
    pub max_upload_bytes: usize,
}

impl ApiState {
    pub fn new(
        pipeline: Arc<dyn AnalysisPipeline>,
        upload_dir: impl Into<PathBuf>,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            pipeline,
            upload_dir: Arc::new(upload_dir.into()),
            max_upload_bytes,
        }
    }
}

/// =============================
/// Health Endpoint
/// =============================

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": HEALTH_MESSAGE }))
}

/// =============================
/// Upload Parsing
/// =============================

struct AnalyzeForm {
    filename: Option<String>,
    bytes: Option<Vec<u8>>,
    query: Option<String>,
}

async fn read_form(mut multipart: Multipart) -> Result<AnalyzeForm, ApiError> {
    let mut form = AnalyzeForm {
        filename: None,
        bytes: None,
        query: None,
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::new(e.status(), e.body_text()))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                form.filename = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
                form.bytes = Some(bytes.to_vec());
            }
            "query" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
                form.query = Some(text);
            }
            other => {
                warn!(field = other, "Ignoring unexpected form field");
            }
        }
    }

    Ok(form)
}

/// Blank or missing queries fall back to the default prompt
fn normalize_query(query: Option<String>) -> String {
    match query {
        Some(q) if !q.trim().is_empty() => q.trim().to_string(),
        _ => DEFAULT_QUERY.to_string(),
    }
}

/// =============================
/// Analysis Endpoint
/// =============================

async fn analyze(
    State(state): State<ApiState>,
    multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    let form = read_form(multipart).await?;

    let bytes = form
        .bytes
        .ok_or_else(|| AnalyzerError::InvalidInput("No file uploaded".to_string()))?;
    if bytes.is_empty() {
        return Err(AnalyzerError::InvalidInput("Uploaded file is empty".to_string()).into());
    }
    if !is_pdf_signature(&bytes) {
        return Err(AnalyzerError::UnsupportedFileType(
            "expected a PDF document".to_string(),
        )
        .into());
    }

    let filename = form
        .filename
        .filter(|f| !f.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string());
    let query = normalize_query(form.query);

    info!(
        %request_id,
        file = %filename,
        size = bytes.len(),
        query = %query,
        "Received analysis request"
    );

    let document = UploadedDocument::persist(&state.upload_dir, bytes).await?;

    let result = state
        .pipeline
        .kickoff(CrewInputs {
            query: query.clone(),
            file_path: document.path_string(),
        })
        .await;

    document.close();

    let output = result?;

    info!(%request_id, run_id = %output.run_id, "Analysis complete");

    Ok(Json(AnalyzeResponse {
        status: "success".to_string(),
        query,
        analysis: output.raw,
        file_processed: filename,
    }))
}

/// =============================
/// Router
/// =============================

pub fn create_router(state: ApiState) -> Router {
    let body_limit = state.max_upload_bytes;

    Router::new()
        .route("/", get(root))
        .route("/analyze", post(analyze))
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    state: ApiState,
    address: &str,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(address).await?;

    info!("API Server listening on http://{}", address);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crew::build_default_crew;
    use crate::llm::LlmClient;
    use crate::models::CrewOutput;
    use crate::test_support::make_test_pdf;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    const BOUNDARY: &str = "analyzer-test-boundary";

    struct CountingPipeline {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl AnalysisPipeline for CountingPipeline {
        async fn kickoff(&self, inputs: CrewInputs) -> crate::Result<CrewOutput> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(std::path::Path::new(&inputs.file_path).exists());
            if self.fail {
                return Err(AnalyzerError::ToolError("secret internals".to_string()));
            }
            Ok(CrewOutput {
                run_id: Uuid::new_v4(),
                raw: format!("analysis for {}", inputs.query),
                tasks_output: Vec::new(),
                document_digest: String::new(),
                started_at: chrono::Utc::now(),
                finished_at: chrono::Utc::now(),
            })
        }
    }

    struct OfflineLlm;

    #[async_trait::async_trait]
    impl LlmClient for OfflineLlm {
        fn model(&self) -> &str {
            "offline"
        }

        async fn complete(&self, _system_prompt: &str, _prompt: &str) -> crate::Result<String> {
            Err(AnalyzerError::LlmError("missing credentials".to_string()))
        }
    }

    fn counting(fail: bool) -> Arc<CountingPipeline> {
        Arc::new(CountingPipeline {
            calls: AtomicUsize::new(0),
            fail,
        })
    }

    fn multipart_body(file: Option<(&str, &[u8])>, query: Option<&str>) -> Vec<u8> {
        let mut body = Vec::new();
        if let Some((filename, bytes)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; \
                     filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        if let Some(query) = query {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"query\"\r\n\r\n{query}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn analyze_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/analyze")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn upload_count(dir: &std::path::Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn test_health_payload() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(ApiState::new(counting(true), dir.path(), 1024));

        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            serde_json::json!({ "message": HEALTH_MESSAGE })
        );
    }

    #[tokio::test]
    async fn test_success_response_and_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = counting(false);
        let app = create_router(ApiState::new(pipeline.clone(), dir.path(), 1024 * 1024));

        let pdf = make_test_pdf(&["Revenue 100"]);
        let body = multipart_body(Some(("q3.pdf", &pdf)), Some("  How is liquidity?  "));
        let response = app.oneshot(analyze_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["status"], "success");
        assert_eq!(json["query"], "How is liquidity?");
        assert_eq!(json["analysis"], "analysis for How is liquidity?");
        assert_eq!(json["file_processed"], "q3.pdf");
        assert_eq!(pipeline.calls.load(Ordering::SeqCst), 1);
        assert_eq!(upload_count(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_default_query() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(ApiState::new(counting(false), dir.path(), 1024 * 1024));

        let pdf = make_test_pdf(&["Revenue 100"]);
        let response = app
            .oneshot(analyze_request(multipart_body(Some(("a.pdf", &pdf)), Some("   "))))
            .await
            .unwrap();

        let json = json_body(response).await;
        assert_eq!(json["query"], DEFAULT_QUERY);
    }

    #[tokio::test]
    async fn test_missing_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = counting(false);
        let app = create_router(ApiState::new(pipeline.clone(), dir.path(), 1024));

        let response = app
            .oneshot(analyze_request(multipart_body(None, Some("query only"))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert_eq!(json["status"], "error");
        assert!(json["detail"].as_str().unwrap().contains("No file uploaded"));
        assert_eq!(pipeline.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_non_pdf_is_rejected_without_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = counting(false);
        let app = create_router(ApiState::new(pipeline.clone(), dir.path(), 1024));

        let body = multipart_body(Some(("notes.txt", b"just some notes")), None);
        let response = app.oneshot(analyze_request(body)).await.unwrap();

        assert!(response.status().is_client_error());
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(pipeline.calls.load(Ordering::SeqCst), 0);
        assert_eq!(upload_count(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_pipeline_failure_is_generic_500_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = counting(true);
        let app = create_router(ApiState::new(pipeline.clone(), dir.path(), 1024 * 1024));

        let pdf = make_test_pdf(&["Revenue 100"]);
        let response = app
            .oneshot(analyze_request(multipart_body(Some(("a.pdf", &pdf)), None)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = json_body(response).await;
        assert_eq!(json["detail"], GENERIC_FAILURE);
        assert_eq!(pipeline.calls.load(Ordering::SeqCst), 1);
        assert_eq!(upload_count(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_oversized_upload_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = counting(false);
        let app = create_router(ApiState::new(pipeline.clone(), dir.path(), 64));

        let pdf = make_test_pdf(&["Revenue 100"]);
        let response = app
            .oneshot(analyze_request(multipart_body(Some(("a.pdf", &pdf)), None)))
            .await
            .unwrap();

        assert!(response.status().is_client_error());
        assert_eq!(pipeline.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_real_pipeline_without_llm() {
        let dir = tempfile::tempdir().unwrap();
        let crew = Arc::new(build_default_crew(Some(Arc::new(OfflineLlm))));
        let app = create_router(ApiState::new(crew, dir.path(), 1024 * 1024));

        let pdf = make_test_pdf(&["Balance Sheet", "Total Assets 500", "Total Liabilities 200"]);
        let response = app
            .oneshot(analyze_request(multipart_body(Some(("bs.pdf", &pdf)), None)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        let analysis = json["analysis"].as_str().unwrap();
        assert!(analysis.contains("## 1. Document Verification"));
        assert!(analysis.contains("Risk level:"));
        assert_eq!(upload_count(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_unreadable_pdf_is_unprocessable() {
        let dir = tempfile::tempdir().unwrap();
        let crew = Arc::new(build_default_crew(None));
        let app = create_router(ApiState::new(crew, dir.path(), 1024 * 1024));

        let body = multipart_body(Some(("broken.pdf", b"%PDF-1.4 but nothing else")), None);
        let response = app.oneshot(analyze_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(upload_count(dir.path()), 0);
    }
}
