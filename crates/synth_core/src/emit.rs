//! Text emitters for the scenario artifacts.
//!
//! Every emitter reads the same [`ResolvedScenario`], so vehicle ranges and
//! static entity indices agree across the topology, the configuration and the
//! route files by construction.

mod config;
mod launch;
mod routes;
mod topology;
mod xml;

pub use config::omnetpp_ini;
pub use launch::{
    demo_xml, launchd_xml, package_ned, sumocfg, DEMO_FILE, LAUNCHD_FILE, OMNETPP_FILE,
    PACKAGE_FILE, SUMOCFG_FILE,
};
pub use routes::{fixed_routes_xml, FIXED_ROUTES_FILE, RANDOM_ROUTES_FILE};
pub use topology::{class_spec, simulation_ned, ClassSpec, MobilityTemplate, NED_FILE};
pub use xml::escape_attr;

/// Every file name the engine may write into a scenario folder.
pub const ARTIFACT_FILES: [&str; 9] = [
    NED_FILE,
    PACKAGE_FILE,
    OMNETPP_FILE,
    SUMOCFG_FILE,
    LAUNCHD_FILE,
    DEMO_FILE,
    FIXED_ROUTES_FILE,
    RANDOM_ROUTES_FILE,
    crate::packager::METADATA_FILE,
];

use crate::allocator::{EntityClass, EntityIndexRange, VehicleCategory};
use crate::packager::ScenarioLayout;
use crate::request::{JammerSettings, RsuSettings, ScenarioDefaults, VehicleSettings};
use crate::snapper::ResolvedEdge;

/// A routed, individually configured vehicle.
#[derive(Debug, Clone, PartialEq)]
pub struct ManualVehicle {
    pub index: usize,
    pub from: ResolvedEdge,
    pub to: ResolvedEdge,
    /// Placed without a destination; the trip drives its edge end to end.
    pub full_traversal: bool,
    pub settings: VehicleSettings,
}

/// One `<flow>` and the vehicle range it fills.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowBatch {
    pub batch: usize,
    pub from: ResolvedEdge,
    pub to: ResolvedEdge,
    pub count: usize,
    /// Start and end snapped to the same edge; the flow drives its full length.
    pub full_traversal: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StaticSettings {
    Jammer(JammerSettings),
    RoadsideUnit(RsuSettings),
}

/// A jammer or roadside unit with its projected position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticEntity {
    pub class: EntityClass,
    pub index: usize,
    pub x: f64,
    pub y: f64,
    pub settings: StaticSettings,
}

impl StaticEntity {
    pub fn module_name(&self) -> String {
        format!("{}_{}", class_spec(self.class).module_prefix, self.index)
    }
}

/// Everything the emitters need, already snapped, allocated and projected.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedScenario {
    pub layout: ScenarioLayout,
    /// File name of the map asset inside the scenario folder.
    pub map_file: String,
    pub duration_s: u32,
    pub seed: u64,
    pub defaults: ScenarioDefaults,
    pub manual: Vec<ManualVehicle>,
    pub flows: Vec<FlowBatch>,
    pub vehicle_ranges: Vec<EntityIndexRange>,
    pub statics: Vec<StaticEntity>,
    /// Whether a background route file is part of the bundle.
    pub has_background_routes: bool,
}

impl ResolvedScenario {
    /// Size of the `car[]` vector.
    pub fn vehicle_count(&self) -> usize {
        self.vehicle_ranges
            .last()
            .map_or(0, |range| range.end_index_exclusive)
    }

    /// Non-manual ranges, adjacent ones merged. They all run on the batch
    /// defaults, so each span gets one compressed configuration block.
    pub fn batched_spans(&self) -> Vec<BatchedSpan> {
        let mut spans: Vec<BatchedSpan> = Vec::new();
        let batched = self
            .vehicle_ranges
            .iter()
            .filter(|range| range.category != VehicleCategory::Manual && !range.is_empty());
        for range in batched {
            match spans.last_mut() {
                Some(span) if span.end_index_exclusive == range.start_index => {
                    span.end_index_exclusive = range.end_index_exclusive;
                    span.categories.push(range.category);
                }
                _ => spans.push(BatchedSpan {
                    start_index: range.start_index,
                    end_index_exclusive: range.end_index_exclusive,
                    categories: vec![range.category],
                }),
            }
        }
        spans
    }

    /// Route files referenced by the traffic configuration, in load order.
    pub fn route_files(&self) -> Vec<&'static str> {
        let mut files = vec![FIXED_ROUTES_FILE];
        if self.has_background_routes {
            files.push(RANDOM_ROUTES_FILE);
        }
        files
    }
}

/// Contiguous vehicles sharing one configuration block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchedSpan {
    pub start_index: usize,
    pub end_index_exclusive: usize,
    /// Categories covered, in index order.
    pub categories: Vec<VehicleCategory>,
}

impl BatchedSpan {
    pub fn selector(&self) -> String {
        index_selector(self.start_index, self.end_index_exclusive)
    }
}

/// `car[a..b]` for a range, `car[a]` when it holds a single vehicle.
pub fn range_selector(range: &EntityIndexRange) -> String {
    index_selector(range.start_index, range.end_index_exclusive)
}

fn index_selector(start: usize, end_exclusive: usize) -> String {
    if end_exclusive - start == 1 {
        format!("car[{start}]")
    } else {
        format!("car[{start}..{}]", end_exclusive - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_selector_collapses_single_vehicle() {
        let single = EntityIndexRange {
            category: VehicleCategory::Margin,
            start_index: 4,
            end_index_exclusive: 5,
        };
        assert_eq!(range_selector(&single), "car[4]");

        let many = EntityIndexRange {
            category: VehicleCategory::Background,
            start_index: 3,
            end_index_exclusive: 8,
        };
        assert_eq!(range_selector(&many), "car[3..7]");
    }

    #[test]
    fn adjacent_batched_ranges_share_one_span() {
        let range = |category, start_index, end_index_exclusive| EntityIndexRange {
            category,
            start_index,
            end_index_exclusive,
        };
        let scenario = ResolvedScenario {
            layout: ScenarioLayout::from_name("spans"),
            map_file: "grid.net.xml".to_string(),
            duration_s: 60,
            seed: 1,
            defaults: ScenarioDefaults::default(),
            manual: Vec::new(),
            flows: Vec::new(),
            vehicle_ranges: vec![
                range(VehicleCategory::Manual, 0, 2),
                range(VehicleCategory::Flow { batch: 0 }, 2, 5),
                range(VehicleCategory::Background, 5, 9),
                range(VehicleCategory::Margin, 9, 10),
            ],
            statics: Vec::new(),
            has_background_routes: true,
        };

        let spans = scenario.batched_spans();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].selector(), "car[2..9]");
        assert_eq!(
            spans[0].categories,
            [
                VehicleCategory::Flow { batch: 0 },
                VehicleCategory::Background,
                VehicleCategory::Margin,
            ]
        );
    }
}
