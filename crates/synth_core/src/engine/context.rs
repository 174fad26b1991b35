use std::num::NonZeroUsize;

use lru::LruCache;

use crate::error::SynthesisError;
use crate::network::RoadNetwork;
use crate::projector::{self, ProjectedPoint, ProjectionMethod};
use crate::request::GeoPoint;
use crate::snapper::{self, ResolvedEdge, SNAP_RADIUS_LADDER};

/// State owned by exactly one synthesis call: the loaded network and the snap
/// cache. Dropped when the call returns.
pub struct SynthesisContext {
    network: Box<dyn RoadNetwork>,
    snap_cache: LruCache<(u64, u64), Option<ResolvedEdge>>,
    degraded_projections: usize,
}

impl SynthesisContext {
    pub fn new(network: Box<dyn RoadNetwork>, cache_capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            network,
            snap_cache: LruCache::new(capacity),
            degraded_projections: 0,
        }
    }

    pub fn network(&self) -> &dyn RoadNetwork {
        self.network.as_ref()
    }

    /// Projects with the fallback chain, counting every non-primary result.
    pub fn project(&mut self, geo: GeoPoint) -> ProjectedPoint {
        let point = projector::project(self.network.as_ref(), geo);
        if point.method != ProjectionMethod::Primary {
            self.degraded_projections += 1;
        }
        point
    }

    /// Geographic point → nearest drivable edge, or a resolution failure
    /// carrying the original point.
    pub fn resolve(&mut self, geo: GeoPoint) -> Result<ResolvedEdge, SynthesisError> {
        let key = geo.cache_key();
        let resolved = match self.snap_cache.get(&key) {
            Some(cached) => cached.clone(),
            None => {
                let point = self.project(geo);
                let resolved =
                    snapper::snap(self.network.as_ref(), point.x, point.y, &SNAP_RADIUS_LADDER);
                self.snap_cache.put(key, resolved.clone());
                resolved
            }
        };
        resolved.ok_or(SynthesisError::GeoResolution {
            point: geo,
            max_radius: max_snap_radius(),
        })
    }

    pub fn degraded_projections(&self) -> usize {
        self.degraded_projections
    }
}

fn max_snap_radius() -> f64 {
    SNAP_RADIUS_LADDER
        .iter()
        .copied()
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{Boundary, LaneShape, NetLocation, SumoNetwork};

    fn context() -> SynthesisContext {
        // Legacy-only georeference: 0.01 degree == 1000 units.
        let location = NetLocation::new(
            (0.0, 0.0),
            Boundary::parse("0,0,1000,1000").expect("boundary"),
            Boundary::parse("10.0,50.0,10.01,50.01").expect("boundary"),
            "!",
        );
        let lane = LaneShape::new("e_0", "e", vec![(0.0, 500.0), (1000.0, 500.0)]);
        let network = SumoNetwork::new(location, vec![lane]);
        SynthesisContext::new(Box::new(network), 8)
    }

    #[test]
    fn resolves_and_caches_points() {
        let mut ctx = context();
        let geo = GeoPoint::new(50.005, 10.005);
        let first = ctx.resolve(geo).expect("resolvable");
        assert_eq!(first.edge_id, "e");
        assert_eq!(ctx.degraded_projections(), 1);

        let second = ctx.resolve(geo).expect("resolvable");
        assert_eq!(first, second);
        assert_eq!(
            ctx.degraded_projections(),
            1,
            "cached point is not re-projected"
        );
    }

    #[test]
    fn unresolvable_point_reports_original_coordinates() {
        let mut ctx = context();
        let geo = GeoPoint::new(49.99, 10.0);
        match ctx.resolve(geo) {
            Err(SynthesisError::GeoResolution { point, max_radius }) => {
                assert_eq!(point, geo);
                assert_eq!(max_radius, 500.0);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(ctx.resolve(geo).is_err(), "cached failure stays a failure");
    }
}
