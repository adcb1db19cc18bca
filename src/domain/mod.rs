//! Domain types and DTOs
//!
//! These types define the data structures for tenders, proposals and accounts.

pub mod auth;
pub mod proposals;
pub mod tenders;

// Re-export commonly used types
pub use proposals::*;
pub use tenders::*;

use serde::{Deserialize, Serialize};

/// Longest timeline a tender may demand or a proposal may offer, in days.
pub const MAX_TIMELINE_DAYS: u32 = 36_500;

/// Parse a day count in `1..=MAX_TIMELINE_DAYS`.
pub fn parse_days(field: &str, raw: i64) -> Result<u32, String> {
    match u32::try_from(raw) {
        Ok(days) if (1..=MAX_TIMELINE_DAYS).contains(&days) => Ok(days),
        _ => Err(format!(
            "{field} must be between 1 and {MAX_TIMELINE_DAYS} days"
        )),
    }
}

/// Normalized set of labels (materials, specializations).
///
/// Entries are trimmed, deduplicated ignoring case and kept sorted, so two
/// sets built from the same labels compare equal regardless of input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet(Vec<String>);

impl TagSet {
    /// Build a set from raw user input. Fails on blank entries.
    pub fn parse<I, S>(field: &str, raw: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tags: Vec<String> = Vec::new();
        for entry in raw {
            let entry = entry.as_ref().trim();
            if entry.is_empty() {
                return Err(format!("{field} must not contain blank entries"));
            }
            if !tags.iter().any(|t| t.eq_ignore_ascii_case(entry)) {
                tags.push(entry.to_string());
            }
        }
        tags.sort_by_key(|t| t.to_lowercase());
        Ok(Self(tags))
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Entries of `self` that `offered` lacks, in sorted order.
    pub fn missing_from(&self, offered: &TagSet) -> Vec<String> {
        self.0
            .iter()
            .filter(|tag| !offered.contains(tag))
            .cloned()
            .collect()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
