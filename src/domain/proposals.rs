use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{parse_days, TagSet};

/// Proposal status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Pending,
    Eligible,
    Rejected,
    Ranked,
}

impl Default for ProposalStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl ProposalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Eligible => "eligible",
            Self::Rejected => "rejected",
            Self::Ranked => "ranked",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "eligible" => Some(Self::Eligible),
            "rejected" => Some(Self::Rejected),
            "ranked" => Some(Self::Ranked),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Proposal entity. `tender_id` and `user_id` are plain references; the
/// tender may be gone by the time the proposal is read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Proposal {
    pub id: Uuid,
    pub tender_id: Uuid,
    pub user_id: Uuid,
    pub budget: Decimal,
    /// Offered delivery time, in days
    pub timeline: u32,
    pub materials: TagSet,
    pub specialization: TagSet,
    pub status: ProposalStatus,
    pub rank: Option<u32>,
    pub rejection_reasons: Vec<String>,
    pub submitted_at: DateTime<Utc>,
    pub withdrawn_at: Option<DateTime<Utc>>,
}

impl Proposal {
    pub fn is_active(&self) -> bool {
        self.withdrawn_at.is_none()
    }

    /// Only proposals that passed evaluation can be rendered as documents.
    pub fn is_renderable(&self) -> bool {
        matches!(
            self.status,
            ProposalStatus::Eligible | ProposalStatus::Ranked
        )
    }
}

/// Validated proposal contents, ready for the submission gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalDraft {
    pub budget: Decimal,
    pub timeline: u32,
    pub materials: TagSet,
    pub specialization: TagSet,
}

impl ProposalDraft {
    pub fn into_proposal(self, tender_id: Uuid, user_id: Uuid, now: DateTime<Utc>) -> Proposal {
        Proposal {
            id: Uuid::new_v4(),
            tender_id,
            user_id,
            budget: self.budget,
            timeline: self.timeline,
            materials: self.materials,
            specialization: self.specialization,
            status: ProposalStatus::Pending,
            rank: None,
            rejection_reasons: Vec::new(),
            submitted_at: now,
            withdrawn_at: None,
        }
    }
}

/// Request DTO for submitting a proposal
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProposalRequest {
    pub budget: Decimal,
    pub timeline: i64,
    #[serde(default)]
    pub materials: Vec<String>,
    #[serde(default)]
    pub specialization: Vec<String>,
}

impl CreateProposalRequest {
    pub fn into_draft(self) -> Result<ProposalDraft, String> {
        let mut problems = Vec::new();

        if self.budget < Decimal::ZERO {
            problems.push("budget must be zero or greater".to_string());
        }
        let timeline = parse_days("timeline", self.timeline).unwrap_or_else(|e| {
            problems.push(e);
            0
        });
        let materials = TagSet::parse("materials", &self.materials).unwrap_or_else(|e| {
            problems.push(e);
            TagSet::default()
        });
        let specialization =
            TagSet::parse("specialization", &self.specialization).unwrap_or_else(|e| {
                problems.push(e);
                TagSet::default()
            });

        if !problems.is_empty() {
            return Err(problems.join("; "));
        }

        Ok(ProposalDraft {
            budget: self.budget,
            timeline,
            materials,
            specialization,
        })
    }
}

/// Response DTO for proposal
#[derive(Debug, Clone, Serialize)]
pub struct ProposalResponse {
    pub id: Uuid,
    pub tender_id: Uuid,
    pub budget: Decimal,
    pub timeline: u32,
    pub materials: TagSet,
    pub specialization: TagSet,
    pub status: ProposalStatus,
    pub rank: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rejection_reasons: Vec<String>,
    pub submitted_at: DateTime<Utc>,
}

impl From<Proposal> for ProposalResponse {
    fn from(p: Proposal) -> Self {
        Self {
            id: p.id,
            tender_id: p.tender_id,
            budget: p.budget,
            timeline: p.timeline,
            materials: p.materials,
            specialization: p.specialization,
            status: p.status,
            rank: p.rank,
            rejection_reasons: p.rejection_reasons,
            submitted_at: p.submitted_at,
        }
    }
}

/// Caller's own proposal together with the tender it was made against.
/// `tender_title` is `None` when the tender has since been removed.
#[derive(Debug, Clone, Serialize)]
pub struct MyProposalResponse {
    #[serde(flatten)]
    pub proposal: ProposalResponse,
    pub tender_title: Option<String>,
}

/// One row of a ranking table
#[derive(Debug, Clone, Serialize)]
pub struct RankingEntry {
    pub rank: u32,
    pub proposal_id: Uuid,
    pub user_id: Uuid,
    pub budget: Decimal,
    pub timeline: u32,
    pub submitted_at: DateTime<Utc>,
}

/// Response DTO for a ranking pass
#[derive(Debug, Clone, Serialize)]
pub struct RankingResponse {
    pub tender_id: Uuid,
    pub is_final: bool,
    pub ranked_at: DateTime<Utc>,
    pub rankings: Vec<RankingEntry>,
    pub rejected_count: usize,
}
