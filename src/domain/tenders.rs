use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{parse_days, TagSet};

/// Acceptance requirements every proposal is checked against
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Requirements {
    pub min_budget: Decimal,
    /// Longest acceptable delivery time, in days
    pub max_timeline: u32,
    pub required_materials: TagSet,
    pub required_specialization: TagSet,
}

/// Published tender entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tender {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub requirements: Requirements,
    pub deadline: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Tender {
    /// Submissions are accepted strictly before the deadline.
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        now < self.deadline
    }
}

/// Request DTO for publishing a tender
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTenderRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub min_budget: Decimal,
    pub max_timeline: i64,
    #[serde(default)]
    pub required_materials: Vec<String>,
    #[serde(default)]
    pub required_specialization: Vec<String>,
    pub deadline: DateTime<Utc>,
}

impl CreateTenderRequest {
    /// Validate the request and build the tender it describes.
    pub fn into_tender(self, now: DateTime<Utc>) -> Result<Tender, String> {
        let mut problems = Vec::new();

        let title = self.title.trim().to_string();
        if title.is_empty() {
            problems.push("title must not be empty".to_string());
        }
        if self.min_budget < Decimal::ZERO {
            problems.push("min_budget must be zero or greater".to_string());
        }
        let max_timeline = parse_days("max_timeline", self.max_timeline).unwrap_or_else(|e| {
            problems.push(e);
            0
        });
        let required_materials = TagSet::parse("required_materials", &self.required_materials)
            .unwrap_or_else(|e| {
                problems.push(e);
                TagSet::default()
            });
        let required_specialization =
            TagSet::parse("required_specialization", &self.required_specialization)
                .unwrap_or_else(|e| {
                    problems.push(e);
                    TagSet::default()
                });

        if !problems.is_empty() {
            return Err(problems.join("; "));
        }

        Ok(Tender {
            id: Uuid::new_v4(),
            title,
            description: self
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            requirements: Requirements {
                min_budget: self.min_budget,
                max_timeline,
                required_materials,
                required_specialization,
            },
            deadline: self.deadline,
            created_at: now,
        })
    }
}

/// Response DTO for tender
#[derive(Debug, Clone, Serialize)]
pub struct TenderResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub requirements: Requirements,
    pub deadline: DateTime<Utc>,
    pub is_open: bool,
    pub created_at: DateTime<Utc>,
}

impl TenderResponse {
    pub fn new(t: Tender, now: DateTime<Utc>) -> Self {
        Self {
            is_open: t.is_open_at(now),
            id: t.id,
            title: t.title,
            description: t.description,
            requirements: t.requirements,
            deadline: t.deadline,
            created_at: t.created_at,
        }
    }
}
