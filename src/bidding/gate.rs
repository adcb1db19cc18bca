//! Admission of proposals into a tender's pool

use std::sync::Arc;
use uuid::Uuid;

use super::{BiddingError, Clock};
use crate::domain::{Proposal, ProposalDraft, ProposalStatus};
use crate::store::{retry_once, ProposalStore, Store, StoreError, TenderStore};

#[derive(Clone)]
pub struct SubmissionGate {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl SubmissionGate {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Admit a proposal for `tender_id` from `user_id`.
    ///
    /// Uniqueness of the active `(tender, user)` pair is decided by the
    /// store's insert, so concurrent submissions cannot both succeed.
    pub async fn submit(
        &self,
        tender_id: Uuid,
        user_id: Uuid,
        draft: ProposalDraft,
    ) -> Result<Proposal, BiddingError> {
        let tender = retry_once("get_tender", || self.store.get_tender(tender_id))
            .await?
            .ok_or_else(|| BiddingError::tender_not_found(tender_id))?;

        let now = self.clock.now();
        if !tender.is_open_at(now) {
            return Err(BiddingError::DeadlinePassed(format!(
                "Tender {} stopped accepting proposals at {}",
                tender.id,
                tender.deadline.to_rfc3339()
            )));
        }

        let proposal = draft.into_proposal(tender_id, user_id, now);
        let proposal_id = proposal.id;
        let inserted =
            retry_once("insert_proposal", || self.store.insert_proposal(proposal.clone())).await;

        let proposal = match inserted {
            Ok(p) => p,
            Err(StoreError::Conflict(_)) => {
                // A retried insert may collide with its own first attempt.
                match retry_once("get_proposal", || self.store.get_proposal(proposal_id)).await? {
                    Some(own) => own,
                    None => {
                        return Err(BiddingError::DuplicateSubmission(format!(
                            "You have already submitted a proposal for tender {tender_id}"
                        )))
                    }
                }
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            proposal_id = %proposal.id,
            tender_id = %tender_id,
            user_id = %user_id,
            budget = %proposal.budget,
            timeline = proposal.timeline,
            "Proposal submitted"
        );
        Ok(proposal)
    }

    /// Withdraw the caller's own proposal while its tender is still open.
    /// Rejected proposals stay on record and cannot be withdrawn.
    pub async fn withdraw(
        &self,
        proposal_id: Uuid,
        user_id: Uuid,
    ) -> Result<Proposal, BiddingError> {
        let not_found = || BiddingError::NotFound(format!("Proposal {proposal_id} not found"));

        let mut proposal = retry_once("get_proposal", || self.store.get_proposal(proposal_id))
            .await?
            .filter(|p| p.user_id == user_id && p.is_active())
            .ok_or_else(not_found)?;

        if proposal.status == ProposalStatus::Rejected {
            return Err(BiddingError::ValidationFailed(
                "Rejected proposals cannot be withdrawn".to_string(),
            ));
        }

        let now = self.clock.now();
        let tender = retry_once("get_tender", || self.store.get_tender(proposal.tender_id)).await?;
        match tender {
            Some(t) if t.is_open_at(now) => {}
            Some(t) => {
                return Err(BiddingError::DeadlinePassed(format!(
                    "Tender {} closed at {}; proposals can no longer be withdrawn",
                    t.id,
                    t.deadline.to_rfc3339()
                )))
            }
            None => {
                return Err(BiddingError::DeadlinePassed(format!(
                    "Tender {} is no longer available; proposals can no longer be withdrawn",
                    proposal.tender_id
                )))
            }
        }

        let withdrawn = retry_once("withdraw_proposal", || {
            self.store.withdraw_proposal(proposal_id, user_id, now)
        })
        .await?;
        let proposal = if withdrawn {
            proposal.withdrawn_at = Some(now);
            proposal
        } else {
            // A retry finds nothing to withdraw when its first attempt landed.
            retry_once("get_proposal", || self.store.get_proposal(proposal_id))
                .await?
                .filter(|p| p.user_id == user_id && p.withdrawn_at.is_some())
                .ok_or_else(not_found)?
        };

        tracing::info!(
            proposal_id = %proposal_id,
            tender_id = %proposal.tender_id,
            user_id = %user_id,
            "Proposal withdrawn"
        );
        Ok(proposal)
    }
}
