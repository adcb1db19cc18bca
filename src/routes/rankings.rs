use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::DataResponse;
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::bidding::RankingOutcome;
use crate::domain::{RankingEntry, RankingResponse};
use crate::error::ApiError;

impl From<RankingOutcome> for RankingResponse {
    fn from(outcome: RankingOutcome) -> Self {
        let rankings = outcome
            .ranked
            .into_iter()
            .filter_map(|p| {
                Some(RankingEntry {
                    rank: p.rank?,
                    proposal_id: p.id,
                    user_id: p.user_id,
                    budget: p.budget,
                    timeline: p.timeline,
                    submitted_at: p.submitted_at,
                })
            })
            .collect();

        Self {
            tender_id: outcome.tender_id,
            is_final: outcome.is_final,
            ranked_at: outcome.ranked_at,
            rankings,
            rejected_count: outcome.rejected_count,
        }
    }
}

/// GET /tenders/:tender_id/rankings
///
/// Runs a ranking pass and returns the order. Before the deadline the
/// result is provisional (`is_final: false`).
pub async fn get_rankings(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(tender_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::debug!(user_id = %auth.user_id, tender_id = %tender_id, "Ranking requested");

    let outcome = state.ranker.rank(tender_id).await?;
    Ok(Json(DataResponse::new(RankingResponse::from(outcome))))
}
