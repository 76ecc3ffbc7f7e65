//! Sync endpoint handlers
//!
//! Handlers stay thin: extract, call [`SyncService`], translate the error.

use crate::error::AppError;
use crate::server::types::{ErrorBody, HealthResponse, SyncQuery};
use crate::services::SyncService;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Json, Query, State as AxumState},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{error, warn};

// ============================================================================
// Health Check
// ============================================================================

/// Health check endpoint - GET /health or GET /
pub async fn health_check(AxumState(state): AxumState<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        store: state.store.as_ref().map(|store| store.name()),
    })
}

// ============================================================================
// Sync
// ============================================================================

/// Read the shared record - GET /sync?id=<code>
pub async fn get_sync(
    AxumState(state): AxumState<Arc<AppState>>,
    Query(query): Query<SyncQuery>,
) -> Response {
    match SyncService::load(&state, query.id.as_deref()).await {
        Ok(record) => (
            StatusCode::OK,
            [(header::CACHE_CONTROL, "no-store")],
            Json(record),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// Replace the shared record - PUT /sync?id=<code> (POST accepted too)
///
/// The body is taken raw so that malformed JSON gets the same
/// `{"error": ...}` shape as every other failure.
pub async fn put_sync(
    AxumState(state): AxumState<Arc<AppState>>,
    Query(query): Query<SyncQuery>,
    body: Bytes,
) -> Response {
    match SyncService::save(&state, query.id.as_deref(), &body).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => error_response(e),
    }
}

fn error_response(err: AppError) -> Response {
    let status = err.status_code();
    let message = match &err {
        AppError::Validation(message) => {
            warn!("Rejected sync request: {}", message);
            message.clone()
        }
        AppError::NotConfigured(_) => "sync not configured".to_string(),
        _ => {
            error!("Sync store failure: {}", err);
            "store error".to_string()
        }
    };

    (status, Json(ErrorBody::new(message))).into_response()
}
