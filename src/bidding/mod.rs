//! Tender bidding rules
//!
//! - [`catalog`] owns tender records.
//! - [`gate`] admits proposals (deadline, one active proposal per bidder).
//! - [`evaluator`] checks a proposal against a tender's requirements.
//! - [`ranker`] turns a tender's proposals into a rank order.
//! - [`sweeper`] finalizes rankings once deadlines pass.

pub mod catalog;
pub mod clock;
pub mod evaluator;
pub mod gate;
pub mod ranker;
pub mod seed;
pub mod sweeper;

pub use catalog::TenderCatalog;
pub use clock::{Clock, SystemClock};
pub use gate::SubmissionGate;
pub use ranker::{ProposalRanker, RankingOutcome};
pub use sweeper::DeadlineSweeper;

use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum BiddingError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    DeadlinePassed(String),

    #[error("{0}")]
    DuplicateSubmission(String),

    #[error("{0}")]
    ValidationFailed(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl BiddingError {
    pub fn tender_not_found(id: uuid::Uuid) -> Self {
        Self::NotFound(format!("Tender {id} not found"))
    }
}
