//! HTTP adapter over the analysis pipeline.
//!
//! Thin by design: handlers translate transport-specific input (multipart
//! upload, JSON body) into pipeline calls and map [`ReportError`] onto HTTP
//! statuses. No extraction, normalization, or metrics logic lives here —
//! both endpoints drive the same consolidated pipeline in
//! [`crate::analyze`].
//!
//! Error responses are always a structured JSON body with a stable `error`
//! kind string plus a human-readable `message`; `details` carries the raw
//! model output when an extraction response could not be parsed.

use crate::analyze::{analyze_bytes, analyze_stored};
use crate::config::AnalysisConfig;
use crate::error::ReportError;
use crate::report::{ExtractedReport, FuelPriceMap};
use crate::storage::ReportStore;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::error;

/// Shared state for all handlers: one config, one optional store.
/// Both are read-only after startup.
pub struct AppState {
    pub config: AnalysisConfig,
    pub store: Option<ReportStore>,
}

/// Structured JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Stable machine-readable kind, from [`ReportError::kind`].
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

type ApiError = (StatusCode, Json<ErrorBody>);
type ApiResult<T> = Result<T, ApiError>;

/// Build the application router with all routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_upload_bytes;
    Router::new()
        .route("/health", get(health))
        .route("/analyze-report", post(analyze_report))
        .route("/analyze-stored", post(analyze_stored_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the router on `addr` until the process is stopped.
pub async fn serve(state: Arc<AppState>, addr: std::net::SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("reportd listening on {addr}");
    axum::serve(listener, build_router(state)).await
}

// ── Handlers ─────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    storage_configured: bool,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        storage_configured: state.store.is_some(),
    })
}

/// `POST /analyze-report` — multipart upload with a single `file` field
/// (PDF, bounded by the configured upload limit) and an optional
/// `fuel_prices` JSON field.
async fn analyze_report(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<Json<ExtractedReport>> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut prices = FuelPriceMap::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        into_response(ReportError::InvalidRequest(format!(
            "malformed multipart body: {e}"
        )))
    })? {
        match field.name() {
            Some("file") => {
                let name = field.file_name().unwrap_or("report.pdf").to_string();
                let bytes = field.bytes().await.map_err(|e| {
                    into_response(ReportError::InvalidRequest(format!(
                        "failed to read upload: {e}"
                    )))
                })?;
                file = Some((name, bytes.to_vec()));
            }
            Some("fuel_prices") => {
                let text = field.text().await.unwrap_or_default();
                prices = serde_json::from_str(&text).map_err(|e| {
                    into_response(ReportError::InvalidRequest(format!(
                        "fuel_prices is not a valid price map: {e}"
                    )))
                })?;
            }
            _ => {}
        }
    }

    let (name, bytes) = file.ok_or_else(|| into_response(ReportError::MissingInput))?;

    let report = analyze_bytes(&name, bytes, &prices, &state.config)
        .await
        .map_err(into_response)?;
    Ok(Json(report))
}

/// Request body for the storage-triggered entry point.
#[derive(Debug, Deserialize)]
struct AnalyzeStoredRequest {
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    fuel_prices: Option<FuelPriceMap>,
}

/// `POST /analyze-stored` — analyze a report already in the bucket.
/// Omitting `path` selects the most-recently-updated file under the
/// configured prefix.
async fn analyze_stored_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeStoredRequest>,
) -> ApiResult<Json<crate::analyze::StoredAnalysis>> {
    let store = state.store.as_ref().ok_or_else(|| {
        into_response(ReportError::StorageUnavailable {
            detail: "no report bucket configured".to_string(),
        })
    })?;

    let prices = req.fuel_prices.unwrap_or_default();
    let analysis = analyze_stored(store, req.path.as_deref(), &prices, &state.config)
        .await
        .map_err(into_response)?;
    Ok(Json(analysis))
}

// ── Error mapping ────────────────────────────────────────────────────────

fn status_for(err: &ReportError) -> StatusCode {
    match err {
        ReportError::MissingInput => StatusCode::BAD_REQUEST,
        ReportError::UnreadablePdf { .. } => StatusCode::BAD_REQUEST,
        ReportError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        ReportError::ModelUnavailable { .. } => StatusCode::BAD_GATEWAY,
        ReportError::InvalidModelOutput { .. } => StatusCode::BAD_GATEWAY,
        ReportError::StorageUnavailable { .. } => StatusCode::BAD_GATEWAY,
        ReportError::EmptyBucket { .. } => StatusCode::NOT_FOUND,
        ReportError::InvalidConfig(_)
        | ReportError::ProviderNotConfigured { .. }
        | ReportError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn into_response(err: ReportError) -> ApiError {
    let status = status_for(&err);

    // Internal failures get a generic message; full detail stays in logs.
    let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!("Internal failure: {err}");
        "An internal error occurred.".to_string()
    } else {
        err.to_string()
    };

    let details = err.raw_output().map(|raw| raw.to_string());

    (
        status,
        Json(ErrorBody {
            error: err.kind(),
            message,
            details,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_matches_contract() {
        assert_eq!(status_for(&ReportError::MissingInput), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_for(&ReportError::ModelUnavailable { detail: "x".into() }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&ReportError::InvalidModelOutput {
                detail: "x".into(),
                raw: "y".into()
            }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&ReportError::Internal("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn malformed_request_bodies_are_client_errors() {
        let (status, Json(body)) = into_response(ReportError::InvalidRequest(
            "malformed multipart body: unexpected end of stream".into(),
        ));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "invalid_request");
        assert!(body.message.contains("multipart"));
    }

    #[test]
    fn internal_errors_hide_detail_from_clients() {
        let (status, Json(body)) = into_response(ReportError::Internal("secret".into()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.message.contains("secret"));
        assert_eq!(body.error, "internal_error");
    }

    #[test]
    fn invalid_output_exposes_raw_text_in_details() {
        let (_, Json(body)) = into_response(ReportError::InvalidModelOutput {
            detail: "not json".into(),
            raw: "gibberish".into(),
        });
        assert_eq!(body.details.as_deref(), Some("gibberish"));
    }
}
