use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chime_core::IngestError;
use chime_types::{ErrorResponse, PullResponse, SoundCheckReport, TriggerRequest, TriggerResponse};
use serde_json::json;

use super::state::ServerState;

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(ErrorResponse::new(message))).into_response()
}

pub async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn method_not_allowed() -> Response {
    error(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

/// Ingestion. The body is parsed by hand so a malformed or non-JSON body is
/// reported as an invalid amount rather than an extractor rejection.
pub async fn trigger(State(state): State<ServerState>, body: Bytes) -> Response {
    let request: TriggerRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!(error = %e, "Unparseable trigger body");
            return error(StatusCode::BAD_REQUEST, "Invalid amount");
        }
    };

    match state.ingestor.accept(request.amount.as_ref()) {
        Ok(delivery) => (
            StatusCode::OK,
            Json(TriggerResponse::accepted(delivery.amount)),
        )
            .into_response(),
        Err(IngestError::Invalid(e)) => {
            tracing::info!(reason = %e, "Rejected amount");
            error(StatusCode::BAD_REQUEST, "Invalid amount")
        }
        Err(e) => {
            tracing::error!(error = %e, "Ingestion failed");
            error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

/// Drains the pull buffer; a second call returns `[]`
pub async fn check_amounts(State(state): State<ServerState>) -> Response {
    match state.pull.drain_all() {
        Ok(deliveries) => {
            if !deliveries.is_empty() {
                tracing::debug!(count = deliveries.len(), "Pull buffer drained");
            }
            Json(PullResponse::from_deliveries(deliveries)).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to drain pull buffer");
            error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

pub async fn check_sounds(State(state): State<ServerState>) -> Json<SoundCheckReport> {
    let report = state.catalogue.report();
    if !report.success {
        tracing::warn!(missing = ?report.missing_files, "Sound files missing");
    }
    Json(report)
}
