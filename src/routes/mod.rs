pub mod auth;
pub mod health;
pub mod me;
pub mod proposals;
pub mod rankings;
pub mod tenders;

#[cfg(test)]
mod tests;

use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

use crate::app::AppState;

/// Build the API router with all routes
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Public routes
        .route("/health", get(health::health_check))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        // Protected routes
        .route("/me", get(me::get_me))
        // Tenders
        .route(
            "/tenders",
            get(tenders::list_tenders).post(tenders::create_tender),
        )
        .route(
            "/tenders/:tender_id",
            get(tenders::get_tender).delete(tenders::delete_tender),
        )
        // Proposals (nested under tenders)
        .route(
            "/tenders/:tender_id/proposals",
            post(proposals::submit_proposal),
        )
        .route("/tenders/:tender_id/rankings", get(rankings::get_rankings))
        // Caller's proposals
        .route("/proposals/my", get(proposals::my_proposals))
        .route("/proposals/:proposal_id", delete(proposals::withdraw_proposal))
        .route(
            "/proposals/:proposal_id/document",
            get(proposals::proposal_document),
        )
}
