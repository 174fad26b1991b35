//! Index assignment for the vehicle collection and the static entities.
//!
//! Vehicles share one contiguous index space (`car[0..N)`), partitioned into
//! ranges that each belong to exactly one category. Jammers and roadside units
//! are declared as individual submodules and get their own 0-based counters.

use serde::Serialize;

use crate::error::ValidationError;
use crate::request::JammerKind;

/// Who owns a range of vehicle indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleCategory {
    /// Explicitly placed vehicles, one config block per index.
    Manual,
    /// The n-th emitted flow batch.
    Flow {
        batch: usize,
    },
    Background,
    /// Default-configured slack slots.
    Margin,
}

/// Half-open index range `[start_index, end_index_exclusive)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntityIndexRange {
    pub category: VehicleCategory,
    pub start_index: usize,
    pub end_index_exclusive: usize,
}

impl EntityIndexRange {
    pub fn len(&self) -> usize {
        self.end_index_exclusive - self.start_index
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, index: usize) -> bool {
        (self.start_index..self.end_index_exclusive).contains(&index)
    }

    /// Last index in the range, inclusive.
    pub fn last_index(&self) -> usize {
        self.end_index_exclusive.saturating_sub(1)
    }
}

/// Vehicle counts per category, in allocation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VehiclePlan {
    pub manual: usize,
    /// Vehicle count of every emitted flow batch, in emission order.
    pub flows: Vec<usize>,
    pub background: usize,
    pub margin: usize,
}

impl VehiclePlan {
    pub fn total(&self) -> usize {
        self.manual + self.flows.iter().sum::<usize>() + self.background + self.margin
    }
}

/// Assigns contiguous ranges: manual, each flow batch, background, margin.
/// Empty categories get no range.
pub fn allocate_vehicles(plan: &VehiclePlan) -> Result<Vec<EntityIndexRange>, ValidationError> {
    let categories = std::iter::once((VehicleCategory::Manual, plan.manual))
        .chain(
            plan.flows
                .iter()
                .enumerate()
                .map(|(batch, count)| (VehicleCategory::Flow { batch }, *count)),
        )
        .chain([
            (VehicleCategory::Background, plan.background),
            (VehicleCategory::Margin, plan.margin),
        ]);

    let mut ranges = Vec::new();
    let mut cursor = 0usize;
    for (category, count) in categories {
        if count == 0 {
            continue;
        }
        let start_index = cursor;
        let end_index_exclusive = cursor + count;
        ranges.push(EntityIndexRange {
            category,
            start_index,
            end_index_exclusive,
        });
        cursor = end_index_exclusive;
    }

    validate_ranges(plan.total(), &ranges)?;
    Ok(ranges)
}

/// Checks that `ranges` tile `[0, total)` without gaps or overlaps.
pub fn validate_ranges(total: usize, ranges: &[EntityIndexRange]) -> Result<(), ValidationError> {
    if ranges.is_empty() {
        return if total == 0 {
            Ok(())
        } else {
            Err(ValidationError::new(format!(
                "no ranges cover {total} vehicles"
            )))
        };
    }

    if ranges.iter().any(EntityIndexRange::is_empty) {
        return Err(ValidationError::new("vehicle ranges must not be empty"));
    }

    if ranges[0].start_index != 0 || ranges[ranges.len() - 1].end_index_exclusive != total {
        return Err(ValidationError::new(
            "vehicle ranges do not cover the full collection",
        ));
    }

    for idx in 1..ranges.len() {
        if ranges[idx - 1].end_index_exclusive != ranges[idx].start_index {
            return Err(ValidationError::new("vehicle ranges overlap or leave gaps"));
        }
    }

    Ok(())
}

/// Closed set of individually declared (non-vehicle) entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityClass {
    MobileJammer,
    StaticJammer,
    RoadsideUnit,
}

impl EntityClass {
    pub fn for_jammer(kind: JammerKind) -> Self {
        match kind {
            JammerKind::Mobile => Self::MobileJammer,
            JammerKind::Static => Self::StaticJammer,
        }
    }

    pub fn is_jammer(self) -> bool {
        matches!(self, Self::MobileJammer | Self::StaticJammer)
    }
}

/// Counters for jammers and roadside units, assigned in request order.
#[derive(Debug, Default)]
pub struct StaticIndexer {
    jammers: usize,
    roadside_units: usize,
}

impl StaticIndexer {
    pub fn next(&mut self, class: EntityClass) -> usize {
        let counter = if class.is_jammer() {
            &mut self.jammers
        } else {
            &mut self.roadside_units
        };
        let index = *counter;
        *counter += 1;
        index
    }

    pub fn jammers(&self) -> usize {
        self.jammers
    }

    pub fn roadside_units(&self) -> usize {
        self.roadside_units
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_then_background_without_flows() {
        let plan = VehiclePlan {
            manual: 3,
            background: 5,
            ..Default::default()
        };
        let ranges = allocate_vehicles(&plan).expect("allocation should pass");
        assert_eq!(
            ranges,
            vec![
                EntityIndexRange {
                    category: VehicleCategory::Manual,
                    start_index: 0,
                    end_index_exclusive: 3,
                },
                EntityIndexRange {
                    category: VehicleCategory::Background,
                    start_index: 3,
                    end_index_exclusive: 8,
                },
            ]
        );
        assert_eq!(ranges[1].last_index(), 7);
    }

    #[test]
    fn flows_sit_between_manual_and_background_and_margin_is_last() {
        let plan = VehiclePlan {
            manual: 2,
            flows: vec![4, 1],
            background: 3,
            margin: 2,
        };
        let ranges = allocate_vehicles(&plan).expect("allocation should pass");
        let layout: Vec<_> = ranges
            .iter()
            .map(|r| (r.category, r.start_index, r.end_index_exclusive))
            .collect();
        assert_eq!(
            layout,
            vec![
                (VehicleCategory::Manual, 0, 2),
                (VehicleCategory::Flow { batch: 0 }, 2, 6),
                (VehicleCategory::Flow { batch: 1 }, 6, 7),
                (VehicleCategory::Background, 7, 10),
                (VehicleCategory::Margin, 10, 12),
            ]
        );
        let covered: usize = ranges.iter().map(EntityIndexRange::len).sum();
        assert_eq!(covered, plan.total());
    }

    #[test]
    fn empty_categories_get_no_range() {
        let plan = VehiclePlan {
            background: 4,
            ..Default::default()
        };
        let ranges = allocate_vehicles(&plan).expect("allocation should pass");
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].start_index, 0);
        assert!(allocate_vehicles(&VehiclePlan::default())
            .expect("empty plan")
            .is_empty());
    }

    #[test]
    fn validate_rejects_gaps_and_partial_cover() {
        let gap = [
            EntityIndexRange {
                category: VehicleCategory::Manual,
                start_index: 0,
                end_index_exclusive: 2,
            },
            EntityIndexRange {
                category: VehicleCategory::Background,
                start_index: 3,
                end_index_exclusive: 5,
            },
        ];
        let error = validate_ranges(5, &gap).expect_err("gap should fail");
        assert_eq!(error.message(), "vehicle ranges overlap or leave gaps");

        let error = validate_ranges(6, &gap).expect_err("short cover should fail");
        assert_eq!(
            error.message(),
            "vehicle ranges do not cover the full collection"
        );
    }

    #[test]
    fn jammers_and_rsus_count_independently() {
        let mut indexer = StaticIndexer::default();
        let order = [
            EntityClass::RoadsideUnit,
            EntityClass::MobileJammer,
            EntityClass::StaticJammer,
            EntityClass::RoadsideUnit,
        ];
        let indices: Vec<_> = order.iter().map(|class| indexer.next(*class)).collect();
        assert_eq!(indices, vec![0, 0, 1, 1]);
        assert_eq!(indexer.jammers(), 2);
        assert_eq!(indexer.roadside_units(), 2);
    }
}
