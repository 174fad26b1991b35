use crate::request::GeoPoint;

use super::utm::{self, UtmZone};

/// Why a network could not project a point.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProjectionError {
    #[error("network is not georeferenced")]
    NotGeoreferenced,
    #[error("unsupported projection '{0}'")]
    Unsupported(String),
    #[error("network has no geographic boundary")]
    NoGeographicBoundary,
    #[error("projection produced a non-finite coordinate")]
    NonFinite,
}

/// Axis-aligned box as written in SUMO `xmin,ymin,xmax,ymax` attributes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Boundary {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Boundary {
    pub fn parse(raw: &str) -> Option<Self> {
        let values = parse_floats(raw)?;
        match values.as_slice() {
            [xmin, ymin, xmax, ymax] => Some(Self {
                xmin: *xmin,
                ymin: *ymin,
                xmax: *xmax,
                ymax: *ymax,
            }),
            _ => None,
        }
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    fn is_geographic(&self) -> bool {
        self.width() > 0.0
            && self.height() > 0.0
            && self.xmin >= -180.0
            && self.xmax <= 180.0
            && self.ymin >= -90.0
            && self.ymax <= 90.0
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Projection {
    /// `projParameter="!"`: plain cartesian network.
    None,
    Utm(UtmZone),
    Unsupported(String),
}

impl Projection {
    fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() || raw == "!" {
            return Projection::None;
        }

        let mut proj = None;
        let mut zone = None;
        let mut south = false;
        let mut wgs84 = true;
        for token in raw.split_whitespace() {
            let token = token.trim_start_matches('+');
            match token.split_once('=') {
                Some(("proj", value)) => proj = Some(value),
                Some(("zone", value)) => zone = value.parse::<u8>().ok(),
                Some(("ellps", value)) | Some(("datum", value)) => {
                    wgs84 &= value.eq_ignore_ascii_case("WGS84")
                }
                None if token == "south" => south = true,
                _ => {}
            }
        }

        match (proj, zone.and_then(|z| UtmZone::new(z, south))) {
            (Some("utm"), Some(zone)) if wgs84 => Projection::Utm(zone),
            _ => Projection::Unsupported(raw.to_string()),
        }
    }
}

/// Georeference of a SUMO network (`<location>` element).
#[derive(Debug, Clone, PartialEq)]
pub struct NetLocation {
    pub net_offset: (f64, f64),
    pub conv_boundary: Boundary,
    pub orig_boundary: Boundary,
    projection: Projection,
}

impl NetLocation {
    pub fn new(
        net_offset: (f64, f64),
        conv_boundary: Boundary,
        orig_boundary: Boundary,
        proj_parameter: &str,
    ) -> Self {
        Self {
            net_offset,
            conv_boundary,
            orig_boundary,
            projection: Projection::parse(proj_parameter),
        }
    }

    /// Location of a network that carries no georeference at all.
    pub fn cartesian() -> Self {
        Self::new((0.0, 0.0), Boundary::default(), Boundary::default(), "!")
    }

    pub fn geo_to_xy(&self, geo: GeoPoint) -> Result<(f64, f64), ProjectionError> {
        match &self.projection {
            Projection::Utm(zone) => {
                let (e, n) = utm::forward(*zone, geo.lng, geo.lat);
                finite((e + self.net_offset.0, n + self.net_offset.1))
            }
            Projection::None => Err(ProjectionError::NotGeoreferenced),
            Projection::Unsupported(raw) => Err(ProjectionError::Unsupported(raw.clone())),
        }
    }

    /// Linear mapping of the geographic boundary onto the converted one.
    pub fn geo_to_xy_legacy(&self, geo: GeoPoint) -> Result<(f64, f64), ProjectionError> {
        let orig = &self.orig_boundary;
        let conv = &self.conv_boundary;
        if !orig.is_geographic() {
            return Err(ProjectionError::NoGeographicBoundary);
        }
        let x = conv.xmin + (geo.lng - orig.xmin) / orig.width() * conv.width();
        let y = conv.ymin + (geo.lat - orig.ymin) / orig.height() * conv.height();
        finite((x, y))
    }

    pub fn xy_to_geo(&self, x: f64, y: f64) -> Result<GeoPoint, ProjectionError> {
        match &self.projection {
            Projection::Utm(zone) => {
                let (lng, lat) =
                    utm::inverse(*zone, x - self.net_offset.0, y - self.net_offset.1);
                let (lng, lat) = finite((lng, lat))?;
                Ok(GeoPoint::new(lat, lng))
            }
            Projection::None => Err(ProjectionError::NotGeoreferenced),
            Projection::Unsupported(raw) => Err(ProjectionError::Unsupported(raw.clone())),
        }
    }
}

fn finite(point: (f64, f64)) -> Result<(f64, f64), ProjectionError> {
    if point.0.is_finite() && point.1.is_finite() {
        Ok(point)
    } else {
        Err(ProjectionError::NonFinite)
    }
}

pub(super) fn parse_floats(raw: &str) -> Option<Vec<f64>> {
    raw.split(',')
        .map(|part| part.trim().parse::<f64>().ok())
        .collect()
}
