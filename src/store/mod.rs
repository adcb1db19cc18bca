//! Persistence boundary
//!
//! The bidding components talk to storage only through these traits, so the
//! same logic runs against Postgres in production and [`MemoryStore`] in tests
//! or when no database is configured.

#[cfg(test)]
pub mod flaky;
pub mod memory;
pub mod postgres;
pub mod retry;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use retry::retry_once;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::auth::User;
use crate::domain::{Proposal, Tender};

/// Error enumeration for storage failures.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The backend could not be reached; the call may succeed if repeated.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("storage failure: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Pure status/rank pass over every active proposal of one tender.
///
/// Receives the current proposals and returns them with updated `status`,
/// `rank` and `rejection_reasons`. Stores run it while holding the tender's
/// ranking lock and persist the result atomically.
pub type RankingPass<'a> = &'a (dyn Fn(Vec<Proposal>) -> Vec<Proposal> + Send + Sync);

#[async_trait]
pub trait TenderStore: Send + Sync {
    /// Fails with `Conflict` if the id is taken.
    async fn insert_tender(&self, tender: Tender) -> StoreResult<Tender>;

    /// Inserts the tenders whose ids are not present yet; returns how many were added.
    async fn seed_tenders(&self, tenders: Vec<Tender>) -> StoreResult<usize>;

    async fn get_tender(&self, id: Uuid) -> StoreResult<Option<Tender>>;

    /// Page of tenders ordered by deadline then id, plus the total count.
    async fn list_tenders(&self, offset: u64, limit: u64) -> StoreResult<(Vec<Tender>, u64)>;

    /// Tenders whose deadline falls in `since..=until`, ordered by deadline.
    async fn closed_tenders(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> StoreResult<Vec<Tender>>;

    /// Removes the tender only. Returns false if it did not exist.
    async fn delete_tender(&self, id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait ProposalStore: Send + Sync {
    /// Fails with `Conflict` if the user already has an active proposal on the tender.
    async fn insert_proposal(&self, proposal: Proposal) -> StoreResult<Proposal>;

    async fn get_proposal(&self, id: Uuid) -> StoreResult<Option<Proposal>>;

    /// Active proposals of a user, newest first, plus the total count.
    async fn proposals_for_user(
        &self,
        user_id: Uuid,
        offset: u64,
        limit: u64,
    ) -> StoreResult<(Vec<Proposal>, u64)>;

    /// Marks an active, non-rejected proposal owned by `user_id` as withdrawn.
    /// Returns false when no such proposal exists.
    async fn withdraw_proposal(
        &self,
        id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<bool>;

    /// Runs `pass` over the tender's active proposals under an exclusive
    /// per-tender lock and commits every change or none.
    async fn apply_ranking(
        &self,
        tender_id: Uuid,
        pass: RankingPass<'_>,
    ) -> StoreResult<Vec<Proposal>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Conflict` if the email is taken.
    async fn insert_user(&self, user: User) -> StoreResult<User>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
}

/// Everything the service needs from persistence.
#[async_trait]
pub trait Store: TenderStore + ProposalStore + UserStore {
    async fn health_check(&self) -> StoreResult<()>;

    fn backend_name(&self) -> &'static str;
}
