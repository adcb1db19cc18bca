//! Ranking of a tender's proposals

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::sync::Arc;
use uuid::Uuid;

use super::evaluator::{evaluate, Eligibility};
use super::{BiddingError, Clock};
use crate::domain::{Proposal, ProposalStatus, Tender};
use crate::store::{retry_once, ProposalStore, RankingPass, Store, TenderStore};

/// Result of one ranking pass
#[derive(Debug, Clone)]
pub struct RankingOutcome {
    pub tender_id: Uuid,
    /// True once the tender's deadline has passed; earlier passes are provisional.
    pub is_final: bool,
    pub ranked_at: DateTime<Utc>,
    /// Ranked proposals, best first.
    pub ranked: Vec<Proposal>,
    pub rejected_count: usize,
}

/// Lower budget wins, then shorter timeline, then earlier submission, then id.
fn ranking_order(a: &Proposal, b: &Proposal) -> Ordering {
    a.budget
        .cmp(&b.budget)
        .then(a.timeline.cmp(&b.timeline))
        .then(a.submitted_at.cmp(&b.submitted_at))
        .then(a.id.cmp(&b.id))
}

/// Evaluate and rank every proposal of `tender`.
///
/// Proposals already `rejected` are left as they are. Every other proposal is
/// re-evaluated: failures become `rejected` with their reasons, the rest are
/// ranked `1..=N` in [`ranking_order`]. Returns all input proposals, ranked
/// ones first in rank order.
pub fn rank_proposals(tender: &Tender, proposals: Vec<Proposal>) -> Vec<Proposal> {
    let mut eligible = Vec::with_capacity(proposals.len());
    let mut settled = Vec::new();

    for mut proposal in proposals {
        if proposal.status == ProposalStatus::Rejected {
            settled.push(proposal);
            continue;
        }

        match evaluate(tender, &proposal) {
            Eligibility::Eligible => {
                proposal.status = ProposalStatus::Eligible;
                proposal.rejection_reasons.clear();
                eligible.push(proposal);
            }
            rejected @ Eligibility::Rejected(_) => {
                proposal.status = ProposalStatus::Rejected;
                proposal.rank = None;
                proposal.rejection_reasons = rejected.reasons();
                settled.push(proposal);
            }
        }
    }

    eligible.sort_by(ranking_order);
    for (position, proposal) in eligible.iter_mut().enumerate() {
        proposal.status = ProposalStatus::Ranked;
        proposal.rank = Some(position as u32 + 1);
    }

    eligible.extend(settled);
    eligible
}

/// Runs ranking passes against the store.
#[derive(Clone)]
pub struct ProposalRanker {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl ProposalRanker {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Rank all proposals of a tender. Allowed before the deadline, in which
    /// case the outcome is marked non-final.
    pub async fn rank(&self, tender_id: Uuid) -> Result<RankingOutcome, BiddingError> {
        let tender = retry_once("get_tender", || self.store.get_tender(tender_id))
            .await?
            .ok_or_else(|| BiddingError::tender_not_found(tender_id))?;

        let pass: RankingPass<'_> =
            &|proposals: Vec<Proposal>| rank_proposals(&tender, proposals);
        let updated = retry_once("apply_ranking", || {
            self.store.apply_ranking(tender_id, pass)
        })
        .await?;

        let ranked_at = self.clock.now();
        let is_final = !tender.is_open_at(ranked_at);
        let rejected_count = updated
            .iter()
            .filter(|p| p.status == ProposalStatus::Rejected)
            .count();
        let mut ranked: Vec<Proposal> = updated
            .into_iter()
            .filter(|p| p.status == ProposalStatus::Ranked)
            .collect();
        ranked.sort_by_key(|p| p.rank);

        tracing::info!(
            tender_id = %tender_id,
            ranked = ranked.len(),
            rejected = rejected_count,
            is_final,
            "Ranking pass completed"
        );

        Ok(RankingOutcome {
            tender_id,
            is_final,
            ranked_at,
            ranked,
            rejected_count,
        })
    }
}
