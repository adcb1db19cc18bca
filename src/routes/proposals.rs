//! Proposal routes

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{Attachment, Created, DataResponse, Paginated, PaginationParams};
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::{CreateProposalRequest, MyProposalResponse, ProposalResponse};
use crate::error::ApiError;
use crate::services::ProposalDocument;
use crate::store::{retry_once, ProposalStore};

/// POST /tenders/:tender_id/proposals
pub async fn submit_proposal(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(tender_id): Path<Uuid>,
    Json(req): Json<CreateProposalRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let draft = req.into_draft().map_err(ApiError::validation)?;
    let proposal = state.gate.submit(tender_id, auth.user_id, draft).await?;
    Ok(Created(DataResponse::new(ProposalResponse::from(proposal))))
}

/// GET /proposals/my
///
/// The caller's active proposals. `tender_title` is null when the tender
/// has been removed since.
pub async fn my_proposals(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = auth.user_id;
    let (proposals, total) = retry_once("proposals_for_user", || {
        state
            .store
            .proposals_for_user(user_id, pagination.offset(), pagination.limit())
    })
    .await?;

    let mut titles: HashMap<Uuid, Option<String>> = HashMap::new();
    let mut data = Vec::with_capacity(proposals.len());
    for proposal in proposals {
        let title = match titles.get(&proposal.tender_id) {
            Some(title) => title.clone(),
            None => {
                let title = state
                    .catalog
                    .find_tender(proposal.tender_id)
                    .await?
                    .map(|t| t.title);
                titles.insert(proposal.tender_id, title.clone());
                title
            }
        };
        data.push(MyProposalResponse {
            proposal: proposal.into(),
            tender_title: title,
        });
    }

    Ok(Paginated::new(data, &pagination, total))
}

/// DELETE /proposals/:proposal_id
///
/// Withdraw the caller's proposal while its tender is open.
pub async fn withdraw_proposal(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(proposal_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let proposal = state.gate.withdraw(proposal_id, auth.user_id).await?;
    Ok(Json(DataResponse::new(ProposalResponse::from(proposal))))
}

/// GET /proposals/:proposal_id/document
///
/// PDF summary of an eligible or ranked proposal, for its owner or an admin.
pub async fn proposal_document(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(proposal_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let proposal = retry_once("get_proposal", || state.store.get_proposal(proposal_id))
        .await?
        .filter(|p| p.is_active() && (p.user_id == auth.user_id || auth.is_admin()))
        .ok_or_else(|| ApiError::not_found(format!("Proposal {proposal_id} not found")))?;

    let tender = state.catalog.find_tender(proposal.tender_id).await?;
    let document = ProposalDocument::for_proposal(&proposal, tender.as_ref().map(|t| t.title.as_str()))?;
    let bytes = state.renderer.render(&document)?;

    tracing::info!(
        proposal_id = %proposal.id,
        user_id = %auth.user_id,
        size = bytes.len(),
        "Proposal document rendered"
    );
    Ok(Attachment {
        content_type: state.renderer.content_type(),
        filename: format!("proposal-{}.pdf", proposal.id),
        bytes,
    })
}
