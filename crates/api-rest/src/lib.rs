//! # API REST
//!
//! REST API implementation for the CXR report service.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, status code mapping)
//!
//! Uses `api-shared` for request/response types and `cxr-core` for the report pipeline.

#![warn(rust_2018_idioms)]

use axum::{
    extract::{Path as AxumPath, State},
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use api_shared::{
    ConditionRes, ConditionsRes, DiagnosesRes, DiagnosisRes, HealthRes, HealthService,
    PredictionsReq,
};
use cxr_core::{ErrorCategory, FilesError, ReportError, ReportId, ReportService};

const PDF_MEDIA_TYPE: &str = "application/pdf";
const REPORT_ID_HEADER: HeaderName = HeaderName::from_static("x-report-id");

/// Application state for the REST API server
///
/// Holds the report service; every handler works through it.
#[derive(Clone)]
pub struct AppState {
    service: Arc<ReportService>,
}

impl AppState {
    pub fn new(service: ReportService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(health, list_conditions, diagnoses, generate_report, get_report),
    components(schemas(
        HealthRes,
        PredictionsReq,
        ConditionRes,
        ConditionsRes,
        DiagnosisRes,
        DiagnosesRes,
    ))
)]
pub struct ApiDoc;

/// Builds the application router with Swagger UI and the given CORS layer.
pub fn router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/conditions", get(list_conditions))
        .route("/diagnoses", post(diagnoses))
        .route("/generate-report", post(generate_report))
        .route("/reports/:id", get(get_report))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .with_state(state)
}

/// CORS layer from a comma-separated origin list. `None` or blank means permissive.
///
/// # Errors
/// Returns an error if any origin is not a valid header value.
pub fn cors_layer(origins: Option<&str>) -> anyhow::Result<CorsLayer> {
    let origins: Vec<&str> = origins
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .collect();

    if origins.is_empty() {
        return Ok(CorsLayer::permissive());
    }

    let values = origins
        .into_iter()
        .map(HeaderValue::from_str)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(values))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
        .expose_headers([header::CONTENT_DISPOSITION, REPORT_ID_HEADER]))
}

/// Maps a pipeline error to a status code and a message safe for clients.
fn report_error_response(e: &ReportError) -> (StatusCode, &'static str) {
    let status = match e.category() {
        ErrorCategory::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorCategory::Configuration | ErrorCategory::Render => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorCategory::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorCategory::Backend | ErrorCategory::Validation => StatusCode::BAD_GATEWAY,
    };
    (status, e.user_message())
}

fn pdf_response(report_id: &ReportId, bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, PDF_MEDIA_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!(
                    "attachment; filename=\"{}\"",
                    report_id.download_file_name()
                ),
            ),
            (REPORT_ID_HEADER, report_id.to_string()),
        ],
        bytes,
    )
        .into_response()
}

/// Reads a stored artifact on the blocking pool.
async fn read_artifact(
    state: &AppState,
    report_id: ReportId,
) -> Result<Vec<u8>, (StatusCode, &'static str)> {
    let service = state.service.clone();
    let result = tokio::task::spawn_blocking(move || service.read_artifact(&report_id)).await;

    match result {
        Ok(Ok(bytes)) => Ok(bytes),
        Ok(Err(FilesError::ArtifactNotFound(_))) => Err((StatusCode::NOT_FOUND, "Report not found")),
        Ok(Err(e)) => {
            tracing::error!("Read report error: {:?}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Internal error"))
        }
        Err(e) => {
            tracing::error!("Read report worker error: {:?}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Internal error"))
        }
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Returns liveness only. Used for monitoring and load balancer health checks.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    get,
    path = "/conditions",
    responses(
        (status = 200, description = "Condition labels in classifier order", body = ConditionsRes)
    )
)]
/// List condition labels with their decision thresholds
#[axum::debug_handler]
async fn list_conditions(State(state): State<AppState>) -> Json<ConditionsRes> {
    let conditions = state
        .service
        .conditions()
        .iter()
        .map(|c| ConditionRes {
            label: c.label.to_string(),
            threshold: c.threshold,
        })
        .collect();
    Json(ConditionsRes { conditions })
}

#[utoipa::path(
    post,
    path = "/diagnoses",
    request_body = PredictionsReq,
    responses(
        (status = 200, description = "Per-condition threshold decisions", body = DiagnosesRes),
        (status = 400, description = "Invalid predictions length")
    )
)]
/// Apply per-condition thresholds to classifier output
///
/// A condition is diagnosed (1) when its probability is strictly greater than its threshold.
#[axum::debug_handler]
async fn diagnoses(
    State(state): State<AppState>,
    Json(req): Json<PredictionsReq>,
) -> Result<Json<DiagnosesRes>, (StatusCode, &'static str)> {
    match state.service.diagnose(&req.predictions) {
        Ok(diagnoses) => Ok(Json(DiagnosesRes {
            diagnoses: diagnoses
                .into_iter()
                .map(|d| DiagnosisRes {
                    label: d.label.into_inner(),
                    probability: d.probability.value(),
                    threshold: d.threshold,
                    diagnosis: u8::from(d.positive),
                })
                .collect(),
        })),
        Err(e) => {
            tracing::warn!("Diagnoses rejected: {}", e);
            Err(report_error_response(&e))
        }
    }
}

#[utoipa::path(
    post,
    path = "/generate-report",
    request_body = PredictionsReq,
    responses(
        (status = 200, description = "Rendered PDF report", content_type = "application/pdf", body = Vec<u8>),
        (status = 400, description = "Invalid predictions length"),
        (status = 500, description = "Service misconfigured or rendering failed"),
        (status = 502, description = "Narrative backend failed or returned an incomplete report"),
        (status = 504, description = "Narrative backend timed out")
    )
)]
/// Generate a chest X-ray report
///
/// Runs the full pipeline (narrative request, parsing, rendering) and returns the stored PDF
/// as an attachment named `cxr_report_<id>.pdf`. The report id is also returned in the
/// `x-report-id` header so the document can be fetched again from `/reports/{id}`.
#[axum::debug_handler]
async fn generate_report(
    State(state): State<AppState>,
    Json(req): Json<PredictionsReq>,
) -> Result<Response, (StatusCode, &'static str)> {
    let artifact = match state.service.generate(&req.predictions).await {
        Ok(artifact) => artifact,
        Err(e) => {
            match e.category() {
                ErrorCategory::InvalidInput => tracing::warn!("Generate report rejected: {}", e),
                _ => tracing::error!("Generate report error: {:?}", e),
            }
            return Err(report_error_response(&e));
        }
    };

    let bytes = read_artifact(&state, artifact.report_id).await?;
    Ok(pdf_response(&artifact.report_id, bytes))
}

#[utoipa::path(
    get,
    path = "/reports/{id}",
    params(("id" = String, Path, description = "Report id (32 lowercase hex characters)")),
    responses(
        (status = 200, description = "Previously rendered PDF report", content_type = "application/pdf", body = Vec<u8>),
        (status = 400, description = "Malformed report id"),
        (status = 404, description = "Report not found")
    )
)]
/// Fetch a previously generated report
#[axum::debug_handler]
async fn get_report(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Response, (StatusCode, &'static str)> {
    let report_id =
        ReportId::parse(&id).map_err(|_| (StatusCode::BAD_REQUEST, "Invalid report id"))?;
    let bytes = read_artifact(&state, report_id).await?;
    Ok(pdf_response(&report_id, bytes))
}
