//! End-to-end synthesis: request in, scenario archive out.
//!
//! [`ScenarioEngine`] is long-lived and holds only configuration plus the
//! injected capabilities (network loader, trip generator). Each call to
//! [`ScenarioEngine::synthesize`] builds a fresh [`SynthesisContext`] that owns
//! the loaded network and snap cache for that call alone.
//!
//! Pipeline: project → snap → allocate → emit → package.

mod context;

pub use context::SynthesisContext;

use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::allocator::{
    allocate_vehicles, EntityClass, EntityIndexRange, StaticIndexer, VehiclePlan,
};
use crate::config::EngineConfig;
use crate::emit::{self, FlowBatch, ManualVehicle, ResolvedScenario, StaticEntity, StaticSettings};
use crate::error::{ErrorKind, SynthesisError};
use crate::network::{NetworkLoader, SumoNetLoader};
use crate::packager::{self, GeneratedArtifact, ScenarioLayout};
use crate::request::{
    GeoPoint, PlacedEntity, RouteKind, SameEdgePolicy, SimulationRequest, VehicleParams,
};
use crate::snapper::ResolvedEdge;
use crate::trips::{trip_period, RandomTripsGenerator, TripGenerator, TripRequest};

/// Where a skipped route came from in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteSource {
    /// `entities[index]`, a placed vehicle.
    Entity { index: usize },
    /// `routes[index]`.
    Route { index: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// Start and end snapped to the same edge on an explicit trip.
    SameEdge { edge_id: String },
    /// No drivable lane near `point`.
    Unresolvable { point: GeoPoint, max_radius: f64 },
}

/// A requested route that produced no traffic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRoute {
    pub source: RouteSource,
    pub reason: SkipReason,
}

/// What resolution made of a request; written into `metadata.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolutionSummary {
    pub vehicle_count: usize,
    pub vehicle_ranges: Vec<EntityIndexRange>,
    pub jammers: usize,
    pub roadside_units: usize,
    pub background_vehicles: usize,
    /// Points placed with the legacy or raw projection.
    pub degraded_projections: usize,
    pub skipped_routes: Vec<SkippedRoute>,
}

/// A finished scenario.
#[derive(Debug, Clone)]
pub struct ScenarioBundle {
    pub layout: ScenarioLayout,
    /// Generated files, relative to the scenario folder, in archive order.
    pub artifacts: Vec<GeneratedArtifact>,
    pub archive: Vec<u8>,
    pub summary: ResolutionSummary,
}

impl ScenarioBundle {
    pub fn artifact(&self, path: &str) -> Option<&GeneratedArtifact> {
        self.artifacts.iter().find(|artifact| artifact.path == path)
    }

    /// Artifact content as text, if present.
    pub fn text(&self, path: &str) -> Option<&str> {
        self.artifact(path).and_then(GeneratedArtifact::as_str)
    }

    pub fn skipped_routes(&self) -> &[SkippedRoute] {
        &self.summary.skipped_routes
    }

    /// Writes the archive as `<dir>/<name>.zip` and returns its path.
    pub fn write_archive(&self, dir: &Path) -> Result<PathBuf, SynthesisError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(self.layout.archive_file_name());
        std::fs::write(&path, &self.archive)?;
        Ok(path)
    }
}

/// A failed synthesis with the routes skipped before the failure.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct SynthesisFailure {
    pub error: SynthesisError,
    pub skipped: Vec<SkippedRoute>,
}

impl SynthesisFailure {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

impl From<SynthesisError> for SynthesisFailure {
    fn from(error: SynthesisError) -> Self {
        Self {
            error,
            skipped: Vec::new(),
        }
    }
}

pub struct ScenarioEngine {
    config: EngineConfig,
    loader: Box<dyn NetworkLoader>,
    trips: Box<dyn TripGenerator>,
}

impl std::fmt::Debug for ScenarioEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ScenarioEngine {
    pub fn new(
        config: EngineConfig,
        loader: Box<dyn NetworkLoader>,
        trips: Box<dyn TripGenerator>,
    ) -> Self {
        Self {
            config,
            loader,
            trips,
        }
    }

    /// Engine backed by SUMO files and `randomTrips.py`. Tool lookup happens
    /// here, once, so a missing interpreter or script is a configuration
    /// error at startup rather than mid-synthesis.
    pub fn from_config(config: EngineConfig) -> Result<Self, SynthesisError> {
        let trips = RandomTripsGenerator::from_config(&config)?;
        Ok(Self::new(config, Box::new(SumoNetLoader), Box::new(trips)))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn synthesize(
        &self,
        request: &SimulationRequest,
    ) -> Result<ScenarioBundle, SynthesisFailure> {
        let mut run = SynthesisRun::default();
        match self.run(request, &mut run) {
            Ok(bundle) => Ok(bundle),
            Err(error) => Err(SynthesisFailure {
                error,
                skipped: run.skipped,
            }),
        }
    }

    fn run(
        &self,
        request: &SimulationRequest,
        run: &mut SynthesisRun,
    ) -> Result<ScenarioBundle, SynthesisError> {
        let layout = ScenarioLayout::from_name(&request.name);
        let map_path = self.config.map_path(&request.map);
        if !map_path.is_file() {
            return Err(SynthesisError::MapNotFound { path: map_path });
        }
        if request.background_vehicles > 0 {
            self.trips.ensure_available()?;
        }

        info!(scenario = layout.name(), map = %map_path.display(), "loading road network");
        let network = self.loader.load(&map_path)?;
        let mut ctx = SynthesisContext::new(network, self.config.snap_cache_capacity);

        let manual = resolve_manual_vehicles(&mut ctx, request, run)?;
        let flows = resolve_flows(&mut ctx, request, run)?;

        let background = request.background_vehicles as usize;
        let requested = request.requested_route_count();
        if requested > 0 && manual.is_empty() && flows.is_empty() && background == 0 {
            return Err(SynthesisError::NoResolvableRoutes { requested });
        }

        let plan = VehiclePlan {
            manual: manual.len(),
            flows: flows.iter().map(|flow| flow.count).collect(),
            background,
            margin: request.vehicle_margin as usize,
        };
        let vehicle_ranges = allocate_vehicles(&plan).map_err(SynthesisError::Allocation)?;
        info!(
            vehicles = plan.total(),
            manual = plan.manual,
            flow_batches = plan.flows.len(),
            background,
            "allocated vehicle indices"
        );

        let (statics, indexer) = place_statics(&mut ctx, request);

        let background_routes = if background > 0 {
            let trip_request = TripRequest {
                network: &map_path,
                duration_s: request.duration_s,
                period_s: trip_period(request.duration_s, request.background_vehicles),
                seed: request.seed,
            };
            Some(self.trips.generate(&trip_request)?)
        } else {
            None
        };

        let scenario = ResolvedScenario {
            layout: layout.clone(),
            map_file: request.map.clone(),
            duration_s: request.duration_s,
            seed: request.seed,
            defaults: request.defaults.clone(),
            manual,
            flows,
            vehicle_ranges,
            statics,
            has_background_routes: background_routes.is_some(),
        };

        let summary = ResolutionSummary {
            vehicle_count: scenario.vehicle_count(),
            vehicle_ranges: scenario.vehicle_ranges.clone(),
            jammers: indexer.jammers(),
            roadside_units: indexer.roadside_units(),
            background_vehicles: background,
            degraded_projections: ctx.degraded_projections(),
            skipped_routes: run.skipped.clone(),
        };

        let mut artifacts = emit_artifacts(&scenario, background_routes);
        let generated_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let metadata = packager::metadata_artifact(request, &summary, &generated_at)?;
        artifacts.push(metadata);
        info!(artifacts = artifacts.len(), "emitted scenario artifacts");

        let archive = packager::package(&layout, &artifacts, &map_path, &request.map)?;

        Ok(ScenarioBundle {
            layout,
            artifacts,
            archive,
            summary,
        })
    }
}

/// Skipped routes collected while a call is in flight.
#[derive(Debug, Default)]
struct SynthesisRun {
    skipped: Vec<SkippedRoute>,
}

impl SynthesisRun {
    fn skip(&mut self, source: RouteSource, reason: SkipReason) {
        warn!(?source, ?reason, "skipping route");
        self.skipped.push(SkippedRoute { source, reason });
    }
}

/// Snaps one point; a snapping failure is recorded and yields `None`, any
/// other failure aborts.
fn resolve_point(
    ctx: &mut SynthesisContext,
    run: &mut SynthesisRun,
    source: RouteSource,
    point: GeoPoint,
) -> Result<Option<ResolvedEdge>, SynthesisError> {
    match ctx.resolve(point) {
        Ok(edge) => Ok(Some(edge)),
        Err(SynthesisError::GeoResolution { point, max_radius }) => {
            run.skip(source, SkipReason::Unresolvable { point, max_radius });
            Ok(None)
        }
        Err(other) => Err(other),
    }
}

fn resolve_ends(
    ctx: &mut SynthesisContext,
    run: &mut SynthesisRun,
    source: RouteSource,
    start: GeoPoint,
    end: GeoPoint,
) -> Result<Option<(ResolvedEdge, ResolvedEdge)>, SynthesisError> {
    let Some(from) = resolve_point(ctx, run, source, start)? else {
        return Ok(None);
    };
    Ok(resolve_point(ctx, run, source, end)?.map(|to| (from, to)))
}

/// Placed vehicles first, then explicit routes, each becoming one trip.
///
/// A placed vehicle without an end drives the whole edge nearest its start.
fn resolve_manual_vehicles(
    ctx: &mut SynthesisContext,
    request: &SimulationRequest,
    run: &mut SynthesisRun,
) -> Result<Vec<ManualVehicle>, SynthesisError> {
    let placed = request
        .entities
        .iter()
        .enumerate()
        .filter_map(|(index, entity)| match entity {
            PlacedEntity::Vehicle { start, end, params } => {
                Some((RouteSource::Entity { index }, *start, *end, *params))
            }
            _ => None,
        });
    let explicit = request
        .routes
        .iter()
        .enumerate()
        .filter(|(_, route)| route.kind() == RouteKind::Explicit)
        .map(|(index, route)| {
            (
                RouteSource::Route { index },
                route.start,
                Some(route.end),
                VehicleParams::default(),
            )
        });

    let mut manual = Vec::new();
    for (source, start, end, params) in placed.chain(explicit) {
        let resolved = match end {
            Some(end) => {
                resolve_ends(ctx, run, source, start, end)?.map(|(from, to)| (from, to, false))
            }
            None => resolve_point(ctx, run, source, start)?.map(|edge| (edge.clone(), edge, true)),
        };
        let Some((from, to, full_traversal)) = resolved else {
            continue;
        };
        if !full_traversal
            && from.edge_id == to.edge_id
            && RouteKind::Explicit.same_edge_policy() == SameEdgePolicy::Skip
        {
            run.skip(
                source,
                SkipReason::SameEdge {
                    edge_id: from.edge_id,
                },
            );
            continue;
        }
        manual.push(ManualVehicle {
            index: manual.len(),
            from,
            to,
            full_traversal,
            settings: params.resolve(&request.defaults.app),
        });
    }
    Ok(manual)
}

fn resolve_flows(
    ctx: &mut SynthesisContext,
    request: &SimulationRequest,
    run: &mut SynthesisRun,
) -> Result<Vec<FlowBatch>, SynthesisError> {
    let mut flows = Vec::new();
    for (index, route) in request.routes.iter().enumerate() {
        let kind = route.kind();
        let RouteKind::Flow { count } = kind else {
            continue;
        };
        let source = RouteSource::Route { index };
        let Some((from, to)) = resolve_ends(ctx, run, source, route.start, route.end)? else {
            continue;
        };
        let same_edge = from.edge_id == to.edge_id;
        if same_edge && kind.same_edge_policy() == SameEdgePolicy::Skip {
            run.skip(
                source,
                SkipReason::SameEdge {
                    edge_id: from.edge_id,
                },
            );
            continue;
        }
        flows.push(FlowBatch {
            batch: flows.len(),
            from,
            to,
            count: count as usize,
            full_traversal: same_edge,
        });
    }
    Ok(flows)
}

/// Jammers and roadside units in request order, each with its own counter.
fn place_statics(
    ctx: &mut SynthesisContext,
    request: &SimulationRequest,
) -> (Vec<StaticEntity>, StaticIndexer) {
    let mut indexer = StaticIndexer::default();
    let mut statics = Vec::new();
    for entity in &request.entities {
        let (position, class, settings) = match entity {
            PlacedEntity::Jammer { position, params } => {
                let settings = params.resolve(&request.defaults.jamming);
                (
                    *position,
                    EntityClass::for_jammer(settings.kind),
                    StaticSettings::Jammer(settings),
                )
            }
            PlacedEntity::RoadsideUnit { position, params } => (
                *position,
                EntityClass::RoadsideUnit,
                StaticSettings::RoadsideUnit(params.resolve(&request.defaults.rsu)),
            ),
            PlacedEntity::Vehicle { .. } => continue,
        };
        let point = ctx.project(position);
        statics.push(StaticEntity {
            class,
            index: indexer.next(class),
            x: point.x,
            y: point.y,
            settings,
        });
    }
    (statics, indexer)
}

fn emit_artifacts(
    scenario: &ResolvedScenario,
    background_routes: Option<String>,
) -> Vec<GeneratedArtifact> {
    let mut artifacts = vec![
        GeneratedArtifact::text(emit::NED_FILE, emit::simulation_ned(scenario)),
        GeneratedArtifact::text(emit::PACKAGE_FILE, emit::package_ned(scenario)),
        GeneratedArtifact::text(emit::OMNETPP_FILE, emit::omnetpp_ini(scenario)),
        GeneratedArtifact::text(emit::SUMOCFG_FILE, emit::sumocfg(scenario)),
        GeneratedArtifact::text(emit::LAUNCHD_FILE, emit::launchd_xml(scenario)),
        GeneratedArtifact::text(emit::DEMO_FILE, emit::demo_xml()),
        GeneratedArtifact::text(
            emit::FIXED_ROUTES_FILE,
            emit::fixed_routes_xml(&scenario.manual, &scenario.flows, scenario.duration_s),
        ),
    ];
    if let Some(routes) = background_routes {
        artifacts.push(GeneratedArtifact::text(emit::RANDOM_ROUTES_FILE, routes));
    }
    artifacts
}
