//! PostgreSQL-backed store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    ProposalStore, RankingPass, Store, StoreError, StoreResult, TenderStore, UserStore,
};
use crate::domain::auth::{User, UserRole};
use crate::domain::{Proposal, ProposalStatus, Requirements, TagSet, Tender};

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                StoreError::Conflict(db.message().to_string())
            }
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::WorkerCrashed => StoreError::Unavailable(err.to_string()),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply pending schema migrations.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

const TENDER_COLUMNS: &str = "id, title, description, min_budget, max_timeline, \
     required_materials, required_specialization, deadline, created_at";

const PROPOSAL_COLUMNS: &str = "id, tender_id, user_id, budget, timeline, materials, \
     specialization, status, rank, rejection_reasons, submitted_at, withdrawn_at";

/// Database row for tender
#[derive(Debug, sqlx::FromRow)]
struct TenderRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    min_budget: Decimal,
    max_timeline: i32,
    required_materials: Vec<String>,
    required_specialization: Vec<String>,
    deadline: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl TryFrom<TenderRow> for Tender {
    type Error = StoreError;

    fn try_from(row: TenderRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            title: row.title,
            description: row.description,
            requirements: Requirements {
                min_budget: row.min_budget,
                max_timeline: column_u32("max_timeline", row.max_timeline)?,
                required_materials: column_tags("required_materials", row.required_materials)?,
                required_specialization: column_tags(
                    "required_specialization",
                    row.required_specialization,
                )?,
            },
            deadline: row.deadline,
            created_at: row.created_at,
        })
    }
}

/// Database row for proposal
#[derive(Debug, sqlx::FromRow)]
struct ProposalRow {
    id: Uuid,
    tender_id: Uuid,
    user_id: Uuid,
    budget: Decimal,
    timeline: i32,
    materials: Vec<String>,
    specialization: Vec<String>,
    status: String,
    rank: Option<i32>,
    rejection_reasons: Vec<String>,
    submitted_at: DateTime<Utc>,
    withdrawn_at: Option<DateTime<Utc>>,
}

impl TryFrom<ProposalRow> for Proposal {
    type Error = StoreError;

    fn try_from(row: ProposalRow) -> Result<Self, Self::Error> {
        let status = ProposalStatus::parse(&row.status)
            .ok_or_else(|| StoreError::Backend(format!("unknown proposal status {}", row.status)))?;
        let rank = row.rank.map(|r| column_u32("rank", r)).transpose()?;

        Ok(Self {
            id: row.id,
            tender_id: row.tender_id,
            user_id: row.user_id,
            budget: row.budget,
            timeline: column_u32("timeline", row.timeline)?,
            materials: column_tags("materials", row.materials)?,
            specialization: column_tags("specialization", row.specialization)?,
            status,
            rank,
            rejection_reasons: row.rejection_reasons,
            submitted_at: row.submitted_at,
            withdrawn_at: row.withdrawn_at,
        })
    }
}

/// Database row for user
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = UserRole::parse(&row.role)
            .ok_or_else(|| StoreError::Backend(format!("unknown user role {}", row.role)))?;
        Ok(Self {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            role,
            created_at: row.created_at,
        })
    }
}

fn column_u32(column: &str, value: i32) -> StoreResult<u32> {
    u32::try_from(value).map_err(|_| StoreError::Backend(format!("negative {column}: {value}")))
}

fn column_tags(column: &str, values: Vec<String>) -> StoreResult<TagSet> {
    TagSet::parse(column, values).map_err(StoreError::Backend)
}

fn to_i32(column: &str, value: u32) -> StoreResult<i32> {
    i32::try_from(value).map_err(|_| StoreError::Backend(format!("{column} out of range: {value}")))
}

fn rows_into<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

async fn insert_tender_row(
    executor: &PgPool,
    tender: &Tender,
    on_conflict_ignore: bool,
) -> StoreResult<u64> {
    let sql = format!(
        "INSERT INTO tenders ({TENDER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9){}",
        if on_conflict_ignore {
            " ON CONFLICT (id) DO NOTHING"
        } else {
            ""
        }
    );
    let result = sqlx::query(&sql)
        .bind(tender.id)
        .bind(&tender.title)
        .bind(&tender.description)
        .bind(tender.requirements.min_budget)
        .bind(to_i32("max_timeline", tender.requirements.max_timeline)?)
        .bind(tender.requirements.required_materials.as_slice().to_vec())
        .bind(tender.requirements.required_specialization.as_slice().to_vec())
        .bind(tender.deadline)
        .bind(tender.created_at)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

#[async_trait]
impl TenderStore for PgStore {
    async fn insert_tender(&self, tender: Tender) -> StoreResult<Tender> {
        insert_tender_row(&self.pool, &tender, false).await?;
        Ok(tender)
    }

    async fn seed_tenders(&self, tenders: Vec<Tender>) -> StoreResult<usize> {
        let mut added = 0;
        for tender in &tenders {
            added += insert_tender_row(&self.pool, tender, true).await? as usize;
        }
        Ok(added)
    }

    async fn get_tender(&self, id: Uuid) -> StoreResult<Option<Tender>> {
        let row = sqlx::query_as::<_, TenderRow>(&format!(
            "SELECT {TENDER_COLUMNS} FROM tenders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Tender::try_from).transpose()
    }

    async fn list_tenders(&self, offset: u64, limit: u64) -> StoreResult<(Vec<Tender>, u64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tenders")
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, TenderRow>(&format!(
            "SELECT {TENDER_COLUMNS} FROM tenders ORDER BY deadline ASC, id ASC LIMIT $1 OFFSET $2"
        ))
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok((rows_into(rows)?, total as u64))
    }

    async fn closed_tenders(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> StoreResult<Vec<Tender>> {
        let rows = sqlx::query_as::<_, TenderRow>(&format!(
            "SELECT {TENDER_COLUMNS} FROM tenders \
             WHERE deadline >= $1 AND deadline <= $2 \
             ORDER BY deadline ASC, id ASC"
        ))
        .bind(since)
        .bind(until)
        .fetch_all(&self.pool)
        .await?;
        rows_into(rows)
    }

    async fn delete_tender(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM tenders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ProposalStore for PgStore {
    async fn insert_proposal(&self, proposal: Proposal) -> StoreResult<Proposal> {
        let rank = proposal.rank.map(|r| to_i32("rank", r)).transpose()?;
        sqlx::query(&format!(
            "INSERT INTO proposals ({PROPOSAL_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"
        ))
        .bind(proposal.id)
        .bind(proposal.tender_id)
        .bind(proposal.user_id)
        .bind(proposal.budget)
        .bind(to_i32("timeline", proposal.timeline)?)
        .bind(proposal.materials.as_slice().to_vec())
        .bind(proposal.specialization.as_slice().to_vec())
        .bind(proposal.status.as_str())
        .bind(rank)
        .bind(&proposal.rejection_reasons)
        .bind(proposal.submitted_at)
        .bind(proposal.withdrawn_at)
        .execute(&self.pool)
        .await?;
        Ok(proposal)
    }

    async fn get_proposal(&self, id: Uuid) -> StoreResult<Option<Proposal>> {
        let row = sqlx::query_as::<_, ProposalRow>(&format!(
            "SELECT {PROPOSAL_COLUMNS} FROM proposals WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Proposal::try_from).transpose()
    }

    async fn proposals_for_user(
        &self,
        user_id: Uuid,
        offset: u64,
        limit: u64,
    ) -> StoreResult<(Vec<Proposal>, u64)> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM proposals WHERE user_id = $1 AND withdrawn_at IS NULL",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, ProposalRow>(&format!(
            "SELECT {PROPOSAL_COLUMNS} FROM proposals \
             WHERE user_id = $1 AND withdrawn_at IS NULL \
             ORDER BY submitted_at DESC, id ASC LIMIT $2 OFFSET $3"
        ))
        .bind(user_id)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok((rows_into(rows)?, total as u64))
    }

    async fn withdraw_proposal(
        &self,
        id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE proposals SET withdrawn_at = $3
            WHERE id = $1 AND user_id = $2 AND withdrawn_at IS NULL AND status <> 'rejected'
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn apply_ranking(
        &self,
        tender_id: Uuid,
        pass: RankingPass<'_>,
    ) -> StoreResult<Vec<Proposal>> {
        let mut tx = self.pool.begin().await?;

        // Serializes ranking passes for this tender across all instances;
        // released on commit or rollback.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(tender_id.to_string())
            .execute(&mut *tx)
            .await?;

        let rows = sqlx::query_as::<_, ProposalRow>(&format!(
            "SELECT {PROPOSAL_COLUMNS} FROM proposals \
             WHERE tender_id = $1 AND withdrawn_at IS NULL \
             ORDER BY submitted_at ASC, id ASC FOR UPDATE"
        ))
        .bind(tender_id)
        .fetch_all(&mut *tx)
        .await?;
        let before: Vec<Proposal> = rows_into(rows)?;

        let after = pass(before.clone());

        let mut changed = 0usize;
        for proposal in &after {
            if before.iter().any(|b| b == proposal) {
                continue;
            }
            let rank = proposal.rank.map(|r| to_i32("rank", r)).transpose()?;
            sqlx::query(
                "UPDATE proposals SET status = $2, rank = $3, rejection_reasons = $4 WHERE id = $1",
            )
            .bind(proposal.id)
            .bind(proposal.status.as_str())
            .bind(rank)
            .bind(&proposal.rejection_reasons)
            .execute(&mut *tx)
            .await?;
            changed += 1;
        }

        tx.commit().await?;

        tracing::debug!(tender_id = %tender_id, changed, "Ranking pass committed");
        Ok(after)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: User) -> StoreResult<User> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, role, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, password_hash, role, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::try_from).transpose()
    }
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
