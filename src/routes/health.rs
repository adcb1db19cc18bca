use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::app::AppState;
use crate::store::Store;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub services: ServiceHealth,
}

#[derive(Serialize)]
pub struct ServiceHealth {
    /// `postgres` or `memory`
    pub store: String,
    pub store_status: String,
}

/// Health check endpoint - public
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let store_result = state.store.health_check().await;
    if let Err(e) = &store_result {
        tracing::warn!(error = %e, "Store health check failed");
    }

    // The store is the only critical dependency
    let (status, status_code) = if store_result.is_ok() {
        ("healthy", StatusCode::OK)
    } else {
        ("unhealthy", StatusCode::SERVICE_UNAVAILABLE)
    };

    (
        status_code,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            services: ServiceHealth {
                store: state.store.backend_name().to_string(),
                store_status: if store_result.is_ok() { "ok" } else { "error" }.to_string(),
            },
        }),
    )
}
