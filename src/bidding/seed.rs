//! Built-in tender catalog loaded at startup

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{Requirements, TagSet, Tender};

struct SeedTender {
    id: u128,
    title: &'static str,
    description: &'static str,
    min_budget: i64,
    max_timeline: u32,
    materials: &'static [&'static str],
    specialization: &'static [&'static str],
    open_days: i64,
}

const SEED_TENDERS: &[SeedTender] = &[
    SeedTender {
        id: 0x5eed_0001,
        title: "Road construction: Ring Road phase II",
        description: "Construction of a 12 km two-lane asphalt road with drainage.",
        min_budget: 5_000_000,
        max_timeline: 180,
        materials: &["Cement", "Bitumen", "Steel"],
        specialization: &["Road construction"],
        open_days: 30,
    },
    SeedTender {
        id: 0x5eed_0002,
        title: "Municipal water treatment plant upgrade",
        description: "Replace filtration units and pipework at the east treatment plant.",
        min_budget: 12_000_000,
        max_timeline: 365,
        materials: &["Steel", "PVC pipe", "Concrete"],
        specialization: &["Water engineering", "Civil engineering"],
        open_days: 45,
    },
    SeedTender {
        id: 0x5eed_0003,
        title: "School rooftop solar installation",
        description: "Supply and install 250 kW of rooftop photovoltaic capacity.",
        min_budget: 800_000,
        max_timeline: 90,
        materials: &["Solar panels", "Inverters", "Copper wiring"],
        specialization: &["Electrical installation"],
        open_days: 21,
    },
    SeedTender {
        id: 0x5eed_0004,
        title: "Hospital wing interior fit-out",
        description: "Partitioning, finishes and flooring for the new outpatient wing.",
        min_budget: 2_500_000,
        max_timeline: 120,
        materials: &["Gypsum board", "Paint", "Vinyl flooring"],
        specialization: &["Interior finishing"],
        open_days: 14,
    },
];

/// Seed tenders with stable ids; deadlines are relative to `now`.
pub fn seed_tenders(now: DateTime<Utc>) -> Vec<Tender> {
    SEED_TENDERS
        .iter()
        .map(|seed| Tender {
            id: Uuid::from_u128(seed.id),
            title: seed.title.to_string(),
            description: Some(seed.description.to_string()),
            requirements: Requirements {
                min_budget: Decimal::from(seed.min_budget),
                max_timeline: seed.max_timeline,
                required_materials: tags(seed.materials),
                required_specialization: tags(seed.specialization),
            },
            deadline: now + Duration::days(seed.open_days),
            created_at: now,
        })
        .collect()
}

fn tags(items: &[&str]) -> TagSet {
    // Seed labels are non-blank literals.
    TagSet::parse("seed", items).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_tenders_satisfy_catalog_invariants() {
        let now = Utc::now();
        let tenders = seed_tenders(now);
        assert_eq!(tenders.len(), SEED_TENDERS.len());
        for tender in &tenders {
            assert!(tender.requirements.min_budget >= Decimal::ZERO);
            assert!(tender.requirements.max_timeline > 0);
            assert!(tender.is_open_at(now));
            assert_eq!(
                tender.requirements.required_materials.as_slice().len(),
                SEED_TENDERS
                    .iter()
                    .find(|s| Uuid::from_u128(s.id) == tender.id)
                    .map(|s| s.materials.len())
                    .unwrap()
            );
        }
    }

    #[test]
    fn seed_ids_are_stable() {
        let a = seed_tenders(Utc::now());
        let b = seed_tenders(Utc::now() + Duration::days(3));
        let ids_a: Vec<_> = a.iter().map(|t| t.id).collect();
        let ids_b: Vec<_> = b.iter().map(|t| t.id).collect();
        assert_eq!(ids_a, ids_b);
    }
}
