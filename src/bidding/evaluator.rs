//! Eligibility of a proposal against a tender's requirements

use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

use crate::domain::{Proposal, Tender};

/// One requirement the proposal does not meet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "constraint", rename_all = "snake_case")]
pub enum RequirementFailure {
    BudgetBelowMinimum { offered: Decimal, minimum: Decimal },
    TimelineExceedsMaximum { offered: u32, maximum: u32 },
    MissingMaterials { missing: Vec<String> },
    MissingSpecializations { missing: Vec<String> },
}

impl fmt::Display for RequirementFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BudgetBelowMinimum { offered, minimum } => {
                write!(f, "budget {offered} is below the minimum of {minimum}")
            }
            Self::TimelineExceedsMaximum { offered, maximum } => write!(
                f,
                "timeline of {offered} days exceeds the maximum of {maximum} days"
            ),
            Self::MissingMaterials { missing } => {
                write!(f, "missing required materials: {}", missing.join(", "))
            }
            Self::MissingSpecializations { missing } => write!(
                f,
                "missing required specializations: {}",
                missing.join(", ")
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    /// Never empty.
    Rejected(Vec<RequirementFailure>),
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Eligible)
    }

    /// Human-readable failure descriptions, empty when eligible.
    pub fn reasons(&self) -> Vec<String> {
        match self {
            Self::Eligible => Vec::new(),
            Self::Rejected(failures) => failures.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Check every requirement of `tender` against `proposal` and report all
/// that fail.
pub fn evaluate(tender: &Tender, proposal: &Proposal) -> Eligibility {
    let req = &tender.requirements;
    let mut failures = Vec::new();

    if proposal.budget < req.min_budget {
        failures.push(RequirementFailure::BudgetBelowMinimum {
            offered: proposal.budget,
            minimum: req.min_budget,
        });
    }

    if proposal.timeline > req.max_timeline {
        failures.push(RequirementFailure::TimelineExceedsMaximum {
            offered: proposal.timeline,
            maximum: req.max_timeline,
        });
    }

    let missing = req.required_materials.missing_from(&proposal.materials);
    if !missing.is_empty() {
        failures.push(RequirementFailure::MissingMaterials { missing });
    }

    let missing = req.required_specialization.missing_from(&proposal.specialization);
    if !missing.is_empty() {
        failures.push(RequirementFailure::MissingSpecializations { missing });
    }

    if failures.is_empty() {
        Eligibility::Eligible
    } else {
        Eligibility::Rejected(failures)
    }
}
