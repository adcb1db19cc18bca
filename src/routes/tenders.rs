//! Tender catalog routes

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{Created, DataResponse, NoContent, Paginated, PaginationParams};
use crate::app::AppState;
use crate::auth::RequireAdmin;
use crate::domain::{CreateTenderRequest, TenderResponse};
use crate::error::ApiError;

/// GET /tenders
pub async fn list_tenders(
    State(state): State<Arc<AppState>>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (tenders, total) = state
        .catalog
        .list_tenders(pagination.offset(), pagination.limit())
        .await?;

    let now = state.clock.now();
    let data = tenders
        .into_iter()
        .map(|t| TenderResponse::new(t, now))
        .collect();
    Ok(Paginated::new(data, &pagination, total))
}

/// GET /tenders/:tender_id
pub async fn get_tender(
    State(state): State<Arc<AppState>>,
    Path(tender_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let tender = state.catalog.get_tender(tender_id).await?;
    Ok(Json(DataResponse::new(TenderResponse::new(
        tender,
        state.clock.now(),
    ))))
}

/// POST /tenders
///
/// Publish a tender. Admin only.
pub async fn create_tender(
    State(state): State<Arc<AppState>>,
    admin: RequireAdmin,
    Json(req): Json<CreateTenderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::debug!(user_id = %admin.user_id, title = %req.title, "Publishing tender");

    let tender = state.catalog.publish(req).await?;
    Ok(Created(DataResponse::new(TenderResponse::new(
        tender,
        state.clock.now(),
    ))))
}

/// DELETE /tenders/:tender_id
///
/// Remove a tender. Its proposals are kept. Admin only.
pub async fn delete_tender(
    State(state): State<Arc<AppState>>,
    admin: RequireAdmin,
    Path(tender_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::debug!(user_id = %admin.user_id, tender_id = %tender_id, "Removing tender");

    state.catalog.remove(tender_id).await?;
    Ok(NoContent)
}
