//! Scenario request model: what the caller asks the engine to synthesize.
//!
//! A [`SimulationRequest`] is transient. It is built (or deserialized) per
//! call, normalized by [`normalize_request`], consumed by one synthesis pass
//! and then dropped.

mod params;
mod validate;

pub use params::{
    AppDefaults, JammerKind, JammerParams, JammerSettings, JammingDefaults, JammingStrategy,
    RsuDefaults, RsuParams, RsuSettings, ScenarioDefaults, VehicleParams, VehicleSettings,
};
pub use validate::normalize_request;

use serde::{Deserialize, Serialize};

const DEFAULT_DURATION_S: u32 = 120;
const DEFAULT_SEED: u64 = 1234;

/// A WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub(crate) fn cache_key(&self) -> (u64, u64) {
        (self.lat.to_bits(), self.lng.to_bits())
    }
}

/// An entity placed on the map by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlacedEntity {
    /// A routed vehicle. Without `end` it drives the full length of the edge
    /// nearest `start`.
    Vehicle {
        start: GeoPoint,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        end: Option<GeoPoint>,
        #[serde(default)]
        params: VehicleParams,
    },
    Jammer {
        position: GeoPoint,
        #[serde(default)]
        params: JammerParams,
    },
    RoadsideUnit {
        position: GeoPoint,
        #[serde(default)]
        params: RsuParams,
    },
}

impl PlacedEntity {
    pub fn vehicle(start: GeoPoint, end: GeoPoint) -> Self {
        Self::Vehicle {
            start,
            end: Some(end),
            params: VehicleParams::default(),
        }
    }

    /// A vehicle with only a start point.
    pub fn vehicle_at(start: GeoPoint) -> Self {
        Self::Vehicle {
            start,
            end: None,
            params: VehicleParams::default(),
        }
    }

    pub fn jammer(position: GeoPoint, kind: JammerKind) -> Self {
        Self::Jammer {
            position,
            params: JammerParams {
                kind: Some(kind),
                ..Default::default()
            },
        }
    }

    pub fn roadside_unit(position: GeoPoint) -> Self {
        Self::RoadsideUnit {
            position,
            params: RsuParams::default(),
        }
    }
}

/// A route between two points: a flow batch when `count` is set, otherwise a
/// single explicit trip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteSpec {
    pub start: GeoPoint,
    pub end: GeoPoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
}

impl RouteSpec {
    pub fn flow(start: GeoPoint, end: GeoPoint, count: u32) -> Self {
        Self {
            start,
            end,
            count: Some(count),
        }
    }

    pub fn explicit(start: GeoPoint, end: GeoPoint) -> Self {
        Self {
            start,
            end,
            count: None,
        }
    }

    pub fn kind(&self) -> RouteKind {
        match self.count {
            Some(count) => RouteKind::Flow { count },
            None => RouteKind::Explicit,
        }
    }
}

/// Route expression style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    Explicit,
    Flow { count: u32 },
}

/// What to do when a route's start and end snap to the same edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameEdgePolicy {
    /// Drop the route and report it.
    Skip,
    /// Keep the route and force travel along the whole edge.
    FullTraversal,
}

impl RouteKind {
    pub fn same_edge_policy(&self) -> SameEdgePolicy {
        match self {
            RouteKind::Explicit => SameEdgePolicy::Skip,
            RouteKind::Flow { .. } => SameEdgePolicy::FullTraversal,
        }
    }
}

/// Everything needed to synthesize one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRequest {
    pub name: String,
    /// File name of a `.net.xml` inside the configured maps directory.
    pub map: String,
    #[serde(default = "default_duration_s")]
    pub duration_s: u32,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub entities: Vec<PlacedEntity>,
    #[serde(default)]
    pub routes: Vec<RouteSpec>,
    /// Procedurally generated filler vehicles.
    #[serde(default)]
    pub background_vehicles: u32,
    /// Extra, default-configured slots appended to the vehicle collection.
    /// Zero unless the caller wants slack for vehicles the traffic simulator
    /// may insert beyond the planned ones.
    #[serde(default)]
    pub vehicle_margin: u32,
    #[serde(default)]
    pub defaults: ScenarioDefaults,
}

fn default_duration_s() -> u32 {
    DEFAULT_DURATION_S
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

impl SimulationRequest {
    pub fn new(name: impl Into<String>, map: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            map: map.into(),
            duration_s: DEFAULT_DURATION_S,
            seed: DEFAULT_SEED,
            entities: Vec::new(),
            routes: Vec::new(),
            background_vehicles: 0,
            vehicle_margin: 0,
            defaults: ScenarioDefaults::default(),
        }
    }

    pub fn with_duration_s(mut self, duration_s: u32) -> Self {
        self.duration_s = duration_s;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_entity(mut self, entity: PlacedEntity) -> Self {
        self.entities.push(entity);
        self
    }

    pub fn with_route(mut self, route: RouteSpec) -> Self {
        self.routes.push(route);
        self
    }

    pub fn with_background_vehicles(mut self, count: u32) -> Self {
        self.background_vehicles = count;
        self
    }

    pub fn with_vehicle_margin(mut self, margin: u32) -> Self {
        self.vehicle_margin = margin;
        self
    }

    pub fn with_defaults(mut self, defaults: ScenarioDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Number of routes the caller asked for, explicit vehicles included.
    pub fn requested_route_count(&self) -> usize {
        let vehicles = self
            .entities
            .iter()
            .filter(|entity| matches!(entity, PlacedEntity::Vehicle { .. }))
            .count();
        vehicles + self.routes.len()
    }
}
