//! Geographic → network-local coordinates.

use tracing::warn;

use crate::network::RoadNetwork;
use crate::request::GeoPoint;

/// Which step of the fallback chain produced a projected point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionMethod {
    Primary,
    Legacy,
    /// `(lng, lat)` used as planar coordinates unchanged.
    Raw,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedPoint {
    pub x: f64,
    pub y: f64,
    pub method: ProjectionMethod,
}

/// Projects a point onto `network`'s planar frame.
///
/// Tries the primary projection, then the legacy one, then treats the
/// coordinate as already planar. Never fails; each degradation is logged.
pub fn project(network: &dyn RoadNetwork, geo: GeoPoint) -> ProjectedPoint {
    let primary_err = match network.geo_to_xy(geo) {
        Ok((x, y)) => {
            return ProjectedPoint {
                x,
                y,
                method: ProjectionMethod::Primary,
            }
        }
        Err(err) => err,
    };

    match network.geo_to_xy_legacy(geo) {
        Ok((x, y)) => {
            warn!(
                lat = geo.lat,
                lng = geo.lng,
                reason = %primary_err,
                "primary projection unavailable, using legacy projection"
            );
            ProjectedPoint {
                x,
                y,
                method: ProjectionMethod::Legacy,
            }
        }
        Err(legacy_err) => {
            warn!(
                lat = geo.lat,
                lng = geo.lng,
                primary = %primary_err,
                legacy = %legacy_err,
                "no projection available, treating coordinates as planar"
            );
            ProjectedPoint {
                x: geo.lng,
                y: geo.lat,
                method: ProjectionMethod::Raw,
            }
        }
    }
}
