//! Road network capability: projection and lane proximity queries.
//!
//! The engine never talks to a concrete network format directly. It receives a
//! [`NetworkLoader`] at construction and asks it for a fresh [`RoadNetwork`] on
//! every synthesis call:
//!
//! - **`SumoNetLoader`**: parses SUMO `.net.xml` files (projection from the
//!   `<location>` element, lane geometry indexed in an R-tree).
//! - **`GridNetwork`** (feature `test-helpers`): in-memory Manhattan grid for
//!   tests and benchmarks.

mod lane_index;
mod location;
mod sumo;
pub mod utm;

pub use lane_index::{LaneIndex, LaneShape};
pub use location::{Boundary, NetLocation, ProjectionError};
pub use sumo::{parse_net_xml, NetworkError, SumoNetLoader, SumoNetwork};

use std::path::Path;

use crate::error::SynthesisError;
use crate::request::GeoPoint;

/// A lane found near a query point.
#[derive(Debug, Clone, PartialEq)]
pub struct LaneCandidate {
    pub lane_id: String,
    pub edge_id: String,
    /// Perpendicular distance from the query point, in network units.
    pub distance: f64,
    /// Declaration order of the lane in the network; lower means found first.
    pub order: usize,
}

/// A loaded road network.
pub trait RoadNetwork {
    /// Primary geographic → planar projection.
    fn geo_to_xy(&self, geo: GeoPoint) -> Result<(f64, f64), ProjectionError>;

    /// Older, coarser projection kept as a second chance when the primary one
    /// is unavailable.
    fn geo_to_xy_legacy(&self, geo: GeoPoint) -> Result<(f64, f64), ProjectionError>;

    /// Inverse of [`RoadNetwork::geo_to_xy`].
    fn xy_to_geo(&self, x: f64, y: f64) -> Result<GeoPoint, ProjectionError>;

    /// Drivable lanes within `radius` of `(x, y)`, in declaration order.
    fn neighboring_lanes(&self, x: f64, y: f64, radius: f64) -> Vec<LaneCandidate>;
}

/// Produces a fresh network per synthesis call.
pub trait NetworkLoader {
    fn load(&self, path: &Path) -> Result<Box<dyn RoadNetwork>, SynthesisError>;
}
