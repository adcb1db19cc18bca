//! Store wrapper that injects one-off transient failures.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use uuid::Uuid;

use super::{
    MemoryStore, ProposalStore, RankingPass, Store, StoreError, StoreResult, TenderStore,
    UserStore,
};
use crate::domain::auth::User;
use crate::domain::{Proposal, Tender};

/// Where an injected failure lands relative to the write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// The call fails without touching the data.
    Before,
    /// The call takes effect, then the reply is lost.
    After,
}

/// [`MemoryStore`] with per-operation faults, each consumed by the next call.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    faults: Mutex<HashMap<&'static str, Fault>>,
    calls: Mutex<HashMap<&'static str, u32>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call to `operation` fail with `Unavailable`.
    pub fn fail_once(&self, operation: &'static str, fault: Fault) {
        self.faults.lock().insert(operation, fault);
    }

    /// How many times `operation` has been called.
    pub fn calls(&self, operation: &'static str) -> u32 {
        self.calls.lock().get(operation).copied().unwrap_or(0)
    }

    async fn run<T, Fut>(&self, operation: &'static str, call: Fut) -> StoreResult<T>
    where
        Fut: Future<Output = StoreResult<T>>,
    {
        *self.calls.lock().entry(operation).or_default() += 1;
        let fault = self.faults.lock().remove(operation);
        let blip = || StoreError::Unavailable(format!("{operation}: connection reset"));
        match fault {
            Some(Fault::Before) => Err(blip()),
            Some(Fault::After) => {
                call.await?;
                Err(blip())
            }
            None => call.await,
        }
    }
}

#[async_trait]
impl TenderStore for FlakyStore {
    async fn insert_tender(&self, tender: Tender) -> StoreResult<Tender> {
        self.run("insert_tender", self.inner.insert_tender(tender)).await
    }

    async fn seed_tenders(&self, tenders: Vec<Tender>) -> StoreResult<usize> {
        self.run("seed_tenders", self.inner.seed_tenders(tenders)).await
    }

    async fn get_tender(&self, id: Uuid) -> StoreResult<Option<Tender>> {
        self.run("get_tender", self.inner.get_tender(id)).await
    }

    async fn list_tenders(&self, offset: u64, limit: u64) -> StoreResult<(Vec<Tender>, u64)> {
        self.run("list_tenders", self.inner.list_tenders(offset, limit))
            .await
    }

    async fn closed_tenders(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> StoreResult<Vec<Tender>> {
        self.run("closed_tenders", self.inner.closed_tenders(since, until))
            .await
    }

    async fn delete_tender(&self, id: Uuid) -> StoreResult<bool> {
        self.run("delete_tender", self.inner.delete_tender(id)).await
    }
}

#[async_trait]
impl ProposalStore for FlakyStore {
    async fn insert_proposal(&self, proposal: Proposal) -> StoreResult<Proposal> {
        self.run("insert_proposal", self.inner.insert_proposal(proposal))
            .await
    }

    async fn get_proposal(&self, id: Uuid) -> StoreResult<Option<Proposal>> {
        self.run("get_proposal", self.inner.get_proposal(id)).await
    }

    async fn proposals_for_user(
        &self,
        user_id: Uuid,
        offset: u64,
        limit: u64,
    ) -> StoreResult<(Vec<Proposal>, u64)> {
        self.run(
            "proposals_for_user",
            self.inner.proposals_for_user(user_id, offset, limit),
        )
        .await
    }

    async fn withdraw_proposal(
        &self,
        id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        self.run(
            "withdraw_proposal",
            self.inner.withdraw_proposal(id, user_id, at),
        )
        .await
    }

    async fn apply_ranking(
        &self,
        tender_id: Uuid,
        pass: RankingPass<'_>,
    ) -> StoreResult<Vec<Proposal>> {
        self.run("apply_ranking", self.inner.apply_ranking(tender_id, pass))
            .await
    }
}

#[async_trait]
impl UserStore for FlakyStore {
    async fn insert_user(&self, user: User) -> StoreResult<User> {
        self.run("insert_user", self.inner.insert_user(user)).await
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.run("find_user_by_email", self.inner.find_user_by_email(email))
            .await
    }
}

#[async_trait]
impl Store for FlakyStore {
    async fn health_check(&self) -> StoreResult<()> {
        self.run("health_check", self.inner.health_check()).await
    }

    fn backend_name(&self) -> &'static str {
        self.inner.backend_name()
    }
}
