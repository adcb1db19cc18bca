//! In-process store used when no database is configured, and by tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use uuid::Uuid;

use super::{
    ProposalStore, RankingPass, Store, StoreError, StoreResult, TenderStore, UserStore,
};
use crate::domain::auth::User;
use crate::domain::{Proposal, ProposalStatus, Tender};

/// All collections sit behind one lock, so every check-then-write below is
/// a single critical section.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    tenders: HashMap<Uuid, Tender>,
    proposals: HashMap<Uuid, Proposal>,
    users: HashMap<Uuid, User>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn page<T>(items: Vec<T>, offset: u64, limit: u64) -> (Vec<T>, u64) {
    let total = items.len() as u64;
    let page = items
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .collect();
    (page, total)
}

#[async_trait]
impl TenderStore for MemoryStore {
    async fn insert_tender(&self, tender: Tender) -> StoreResult<Tender> {
        let mut inner = self.inner.lock();
        if inner.tenders.contains_key(&tender.id) {
            return Err(StoreError::Conflict(format!("tender {} exists", tender.id)));
        }
        inner.tenders.insert(tender.id, tender.clone());
        Ok(tender)
    }

    async fn seed_tenders(&self, tenders: Vec<Tender>) -> StoreResult<usize> {
        let mut inner = self.inner.lock();
        let mut added = 0;
        for tender in tenders {
            if !inner.tenders.contains_key(&tender.id) {
                inner.tenders.insert(tender.id, tender);
                added += 1;
            }
        }
        Ok(added)
    }

    async fn get_tender(&self, id: Uuid) -> StoreResult<Option<Tender>> {
        Ok(self.inner.lock().tenders.get(&id).cloned())
    }

    async fn list_tenders(&self, offset: u64, limit: u64) -> StoreResult<(Vec<Tender>, u64)> {
        let mut tenders: Vec<Tender> = self.inner.lock().tenders.values().cloned().collect();
        tenders.sort_by(|a, b| a.deadline.cmp(&b.deadline).then(a.id.cmp(&b.id)));
        Ok(page(tenders, offset, limit))
    }

    async fn closed_tenders(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> StoreResult<Vec<Tender>> {
        let mut closed: Vec<Tender> = self
            .inner
            .lock()
            .tenders
            .values()
            .filter(|t| t.deadline >= since && t.deadline <= until)
            .cloned()
            .collect();
        closed.sort_by(|a, b| a.deadline.cmp(&b.deadline).then(a.id.cmp(&b.id)));
        Ok(closed)
    }

    async fn delete_tender(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.inner.lock().tenders.remove(&id).is_some())
    }
}

#[async_trait]
impl ProposalStore for MemoryStore {
    async fn insert_proposal(&self, proposal: Proposal) -> StoreResult<Proposal> {
        let mut inner = self.inner.lock();
        let duplicate = inner.proposals.values().any(|p| {
            p.is_active() && p.tender_id == proposal.tender_id && p.user_id == proposal.user_id
        });
        if duplicate {
            return Err(StoreError::Conflict(format!(
                "user {} already has an active proposal on tender {}",
                proposal.user_id, proposal.tender_id
            )));
        }
        inner.proposals.insert(proposal.id, proposal.clone());
        Ok(proposal)
    }

    async fn get_proposal(&self, id: Uuid) -> StoreResult<Option<Proposal>> {
        Ok(self.inner.lock().proposals.get(&id).cloned())
    }

    async fn proposals_for_user(
        &self,
        user_id: Uuid,
        offset: u64,
        limit: u64,
    ) -> StoreResult<(Vec<Proposal>, u64)> {
        let mut proposals: Vec<Proposal> = self
            .inner
            .lock()
            .proposals
            .values()
            .filter(|p| p.user_id == user_id && p.is_active())
            .cloned()
            .collect();
        proposals.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at).then(a.id.cmp(&b.id)));
        Ok(page(proposals, offset, limit))
    }

    async fn withdraw_proposal(
        &self,
        id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut inner = self.inner.lock();
        match inner.proposals.get_mut(&id) {
            Some(p)
                if p.user_id == user_id
                    && p.is_active()
                    && p.status != ProposalStatus::Rejected =>
            {
                p.withdrawn_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn apply_ranking(
        &self,
        tender_id: Uuid,
        pass: RankingPass<'_>,
    ) -> StoreResult<Vec<Proposal>> {
        let mut inner = self.inner.lock();
        let mut current: Vec<Proposal> = inner
            .proposals
            .values()
            .filter(|p| p.tender_id == tender_id && p.is_active())
            .cloned()
            .collect();
        current.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at).then(a.id.cmp(&b.id)));

        let updated = pass(current);
        for proposal in &updated {
            inner.proposals.insert(proposal.id, proposal.clone());
        }
        Ok(updated)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: User) -> StoreResult<User> {
        let mut inner = self.inner.lock();
        if inner.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!("email {} is taken", user.email)));
        }
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .inner
            .lock()
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
