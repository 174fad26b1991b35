//! Test helpers for engine-level tests and benchmarks.
//!
//! [`GridNetwork`] stands in for a parsed `.net.xml`: a Manhattan grid of
//! two-way blocks with a linear projection, so a test can place a point on a
//! known edge by planar coordinates. [`ScriptedTripGenerator`] replaces the
//! external trip generator and records what it was asked for.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::SynthesisError;
use crate::network::{
    LaneCandidate, LaneIndex, LaneShape, NetworkLoader, ProjectionError, RoadNetwork,
};
use crate::request::GeoPoint;
use crate::trips::{TripGenerator, TripRequest};

/// Network units per degree in both axes. Coarse, but exact and invertible.
pub const UNITS_PER_DEGREE: f64 = 100_000.0;

/// Default origin of test grids, somewhere in Berlin.
pub const TEST_ORIGIN: GeoPoint = GeoPoint {
    lat: 52.5,
    lng: 13.4,
};

/// Which projections a [`GridNetwork`] answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GridProjection {
    #[default]
    Primary,
    /// Only the legacy projection works.
    LegacyOnly,
    /// Neither projection works; callers fall back to raw coordinates.
    Unprojected,
}

/// Shape of a test grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    pub origin: GeoPoint,
    /// Intersections per row and per column.
    pub size: usize,
    /// Block length in network units.
    pub spacing: f64,
    pub projection: GridProjection,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            origin: TEST_ORIGIN,
            size: 4,
            spacing: 1000.0,
            projection: GridProjection::Primary,
        }
    }
}

impl GridSpec {
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub fn with_projection(mut self, projection: GridProjection) -> Self {
        self.projection = projection;
        self
    }

    /// Geographic point for planar `(x, y)` on this grid.
    pub fn geo_at(&self, x: f64, y: f64) -> GeoPoint {
        GeoPoint::new(
            self.origin.lat + y / UNITS_PER_DEGREE,
            self.origin.lng + x / UNITS_PER_DEGREE,
        )
    }

    /// Midpoint of horizontal edge `h{row}_{col}`.
    pub fn horizontal_mid(&self, row: usize, col: usize) -> GeoPoint {
        self.geo_at((col as f64 + 0.5) * self.spacing, row as f64 * self.spacing)
    }

    pub fn build(&self) -> GridNetwork {
        GridNetwork::new(*self)
    }
}

/// In-memory Manhattan grid.
///
/// Edge `h{r}_{c}` joins intersection `(r, c)` to `(r, c + 1)`, edge `v{r}_{c}`
/// joins `(r, c)` to `(r + 1, c)`. Each edge has one lane, `<edge>_0`.
#[derive(Debug)]
pub struct GridNetwork {
    spec: GridSpec,
    lanes: LaneIndex,
}

impl GridNetwork {
    pub fn new(spec: GridSpec) -> Self {
        let mut shapes = Vec::new();
        let s = spec.spacing;
        for row in 0..spec.size {
            for col in 0..spec.size {
                let (x, y) = (col as f64 * s, row as f64 * s);
                if col + 1 < spec.size {
                    let edge = format!("h{row}_{col}");
                    let lane = format!("{edge}_0");
                    shapes.push(LaneShape::new(lane, edge, vec![(x, y), (x + s, y)]));
                }
                if row + 1 < spec.size {
                    let edge = format!("v{row}_{col}");
                    let lane = format!("{edge}_0");
                    shapes.push(LaneShape::new(lane, edge, vec![(x, y), (x, y + s)]));
                }
            }
        }
        Self {
            spec,
            lanes: LaneIndex::new(shapes),
        }
    }

    pub fn spec(&self) -> &GridSpec {
        &self.spec
    }

    pub fn edge_count(&self) -> usize {
        self.lanes.len()
    }

    fn linear(&self, geo: GeoPoint) -> (f64, f64) {
        (
            (geo.lng - self.spec.origin.lng) * UNITS_PER_DEGREE,
            (geo.lat - self.spec.origin.lat) * UNITS_PER_DEGREE,
        )
    }
}

impl RoadNetwork for GridNetwork {
    fn geo_to_xy(&self, geo: GeoPoint) -> Result<(f64, f64), ProjectionError> {
        match self.spec.projection {
            GridProjection::Primary => Ok(self.linear(geo)),
            _ => Err(ProjectionError::NotGeoreferenced),
        }
    }

    fn geo_to_xy_legacy(&self, geo: GeoPoint) -> Result<(f64, f64), ProjectionError> {
        match self.spec.projection {
            GridProjection::Unprojected => Err(ProjectionError::NoGeographicBoundary),
            _ => Ok(self.linear(geo)),
        }
    }

    fn xy_to_geo(&self, x: f64, y: f64) -> Result<GeoPoint, ProjectionError> {
        match self.spec.projection {
            GridProjection::Primary => Ok(self.spec.geo_at(x, y)),
            _ => Err(ProjectionError::NotGeoreferenced),
        }
    }

    fn neighboring_lanes(&self, x: f64, y: f64, radius: f64) -> Vec<LaneCandidate> {
        self.lanes.lanes_within(x, y, radius)
    }
}

/// Loader handing out a fresh [`GridNetwork`] for any existing path.
///
/// Clones share one load counter.
#[derive(Debug, Clone, Default)]
pub struct GridLoader {
    pub spec: GridSpec,
    loads: Arc<AtomicUsize>,
}

impl GridLoader {
    pub fn new(spec: GridSpec) -> Self {
        Self {
            spec,
            loads: Arc::default(),
        }
    }

    /// Number of `load` calls so far, failed ones included.
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl NetworkLoader for GridLoader {
    fn load(&self, path: &Path) -> Result<Box<dyn RoadNetwork>, SynthesisError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if !path.is_file() {
            return Err(SynthesisError::MapNotFound {
                path: path.to_path_buf(),
            });
        }
        Ok(Box::new(self.spec.build()))
    }
}

/// What a [`ScriptedTripGenerator`] was asked for.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedTrip {
    pub duration_s: u32,
    pub period_s: f64,
    pub seed: u64,
}

/// Shared view of the calls a [`ScriptedTripGenerator`] received.
pub type TripLog = Arc<Mutex<Vec<RecordedTrip>>>;

#[derive(Debug, Clone)]
enum Script {
    Routes(String),
    Fail(String),
}

/// Trip generator returning canned output.
#[derive(Debug, Clone)]
pub struct ScriptedTripGenerator {
    script: Script,
    log: TripLog,
}

/// Minimal background route file with one trip on the test grid.
pub const SAMPLE_RANDOM_ROUTES: &str = concat!(
    "<routes>\n",
    "    <trip id=\"0\" depart=\"0.00\" from=\"h0_0\" to=\"h0_1\"/>\n",
    "</routes>\n",
);

impl ScriptedTripGenerator {
    pub fn returning(routes: impl Into<String>) -> Self {
        Self {
            script: Script::Routes(routes.into()),
            log: TripLog::default(),
        }
    }

    /// Fails every call as the real tool would on a non-zero exit.
    pub fn failing(diagnostic: impl Into<String>) -> Self {
        Self {
            script: Script::Fail(diagnostic.into()),
            log: TripLog::default(),
        }
    }

    pub fn log(&self) -> TripLog {
        Arc::clone(&self.log)
    }
}

impl Default for ScriptedTripGenerator {
    fn default() -> Self {
        Self::returning(SAMPLE_RANDOM_ROUTES)
    }
}

impl TripGenerator for ScriptedTripGenerator {
    fn generate(&self, request: &TripRequest<'_>) -> Result<String, SynthesisError> {
        if let Ok(mut log) = self.log.lock() {
            log.push(RecordedTrip {
                duration_s: request.duration_s,
                period_s: request.period_s,
                seed: request.seed,
            });
        }
        match &self.script {
            Script::Routes(routes) => Ok(routes.clone()),
            Script::Fail(diagnostic) => Err(SynthesisError::ToolFailed {
                tool: "randomTrips.py".to_string(),
                status: "exit status: 1".to_string(),
                diagnostic: diagnostic.clone(),
            }),
        }
    }
}
