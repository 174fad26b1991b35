use std::path::Path;

use tracing::debug;

use crate::error::SynthesisError;
use crate::request::GeoPoint;

use super::lane_index::{LaneIndex, LaneShape};
use super::location::{parse_floats, Boundary, NetLocation, ProjectionError};
use super::{LaneCandidate, NetworkLoader, RoadNetwork};

const VEHICLE_CLASS: &str = "passenger";
const NON_DRIVABLE_FUNCTIONS: [&str; 3] = ["internal", "crossing", "walkingarea"];

/// Malformed `.net.xml` content.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("invalid XML: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("root element is <{0}>, expected <net>")]
    UnexpectedRoot(String),
    #[error("invalid {attribute} on <location>: '{value}'")]
    BadLocation {
        attribute: &'static str,
        value: String,
    },
    #[error("lane {lane} has an unreadable shape")]
    BadShape { lane: String },
}

/// A SUMO road network held in memory for one synthesis call.
#[derive(Debug)]
pub struct SumoNetwork {
    location: NetLocation,
    lanes: LaneIndex,
}

impl SumoNetwork {
    pub fn new(location: NetLocation, lanes: Vec<LaneShape>) -> Self {
        Self {
            location,
            lanes: LaneIndex::new(lanes),
        }
    }

    pub fn location(&self) -> &NetLocation {
        &self.location
    }

    /// Number of drivable lanes kept from the file.
    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }
}

impl RoadNetwork for SumoNetwork {
    fn geo_to_xy(&self, geo: GeoPoint) -> Result<(f64, f64), ProjectionError> {
        self.location.geo_to_xy(geo)
    }

    fn geo_to_xy_legacy(&self, geo: GeoPoint) -> Result<(f64, f64), ProjectionError> {
        self.location.geo_to_xy_legacy(geo)
    }

    fn xy_to_geo(&self, x: f64, y: f64) -> Result<GeoPoint, ProjectionError> {
        self.location.xy_to_geo(x, y)
    }

    fn neighboring_lanes(&self, x: f64, y: f64, radius: f64) -> Vec<LaneCandidate> {
        self.lanes.lanes_within(x, y, radius)
    }
}

/// Parses the content of a SUMO `.net.xml` file.
///
/// Only what snapping and projection need is kept: the `<location>` element
/// and the shapes of lanes a passenger car may use.
pub fn parse_net_xml(xml: &str) -> Result<SumoNetwork, NetworkError> {
    let doc = roxmltree::Document::parse(xml)?;
    let root = doc.root_element();
    if root.tag_name().name() != "net" {
        return Err(NetworkError::UnexpectedRoot(
            root.tag_name().name().to_string(),
        ));
    }

    let mut location = NetLocation::cartesian();
    let mut lanes = Vec::new();

    for node in root.children().filter(|n| n.is_element()) {
        match node.tag_name().name() {
            "location" => location = parse_location(&node)?,
            "edge" => {
                let function = node.attribute("function").unwrap_or("normal");
                if NON_DRIVABLE_FUNCTIONS.contains(&function) {
                    continue;
                }
                let edge_id = node.attribute("id").unwrap_or_default();
                for lane in node
                    .children()
                    .filter(|n| n.is_element() && n.tag_name().name() == "lane")
                {
                    if !is_drivable(&lane) {
                        continue;
                    }
                    let lane_id = lane.attribute("id").unwrap_or_default();
                    let points = lane
                        .attribute("shape")
                        .and_then(parse_shape)
                        .ok_or_else(|| NetworkError::BadShape {
                            lane: lane_id.to_string(),
                        })?;
                    lanes.push(LaneShape::new(lane_id, edge_id, points));
                }
            }
            _ => {}
        }
    }

    Ok(SumoNetwork::new(location, lanes))
}

fn parse_location(node: &roxmltree::Node<'_, '_>) -> Result<NetLocation, NetworkError> {
    let offset_raw = node.attribute("netOffset").unwrap_or("0.00,0.00");
    let net_offset = match parse_floats(offset_raw).as_deref() {
        Some([x, y]) => (*x, *y),
        _ => {
            return Err(NetworkError::BadLocation {
                attribute: "netOffset",
                value: offset_raw.to_string(),
            })
        }
    };

    let boundary = |attribute: &'static str| -> Result<Boundary, NetworkError> {
        match node.attribute(attribute) {
            None => Ok(Boundary::default()),
            Some(raw) => Boundary::parse(raw).ok_or_else(|| NetworkError::BadLocation {
                attribute,
                value: raw.to_string(),
            }),
        }
    };

    Ok(NetLocation::new(
        net_offset,
        boundary("convBoundary")?,
        boundary("origBoundary")?,
        node.attribute("projParameter").unwrap_or("!"),
    ))
}

fn is_drivable(lane: &roxmltree::Node<'_, '_>) -> bool {
    let lists = |attribute: &str, class: &str| {
        lane.attribute(attribute)
            .map(|raw| raw.split_whitespace().any(|c| c == class || c == "all"))
    };
    let allow = lists("allow", VEHICLE_CLASS);
    let disallow = lists("disallow", VEHICLE_CLASS);
    match (allow, disallow) {
        (Some(allowed), _) => allowed,
        (None, Some(disallowed)) => !disallowed,
        (None, None) => true,
    }
}

fn parse_shape(raw: &str) -> Option<Vec<(f64, f64)>> {
    let points = raw
        .split_whitespace()
        .map(|pair| {
            let mut coords = pair.split(',').map(|c| c.parse::<f64>().ok());
            // A third component (elevation) is ignored.
            Some((coords.next()??, coords.next()??))
        })
        .collect::<Option<Vec<_>>>()?;
    (!points.is_empty()).then_some(points)
}

/// Loads `.net.xml` files from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct SumoNetLoader;

impl NetworkLoader for SumoNetLoader {
    fn load(&self, path: &Path) -> Result<Box<dyn RoadNetwork>, SynthesisError> {
        if !path.is_file() {
            return Err(SynthesisError::MapNotFound {
                path: path.to_path_buf(),
            });
        }
        let xml = std::fs::read_to_string(path).map_err(|err| SynthesisError::NetworkUnreadable {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        let network = parse_net_xml(&xml).map_err(|err| SynthesisError::NetworkUnreadable {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        debug!(
            path = %path.display(),
            lanes = network.lane_count(),
            "loaded road network"
        );
        Ok(Box::new(network))
    }
}
