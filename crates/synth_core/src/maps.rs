//! Map assets: listing available networks and building new ones from
//! OpenStreetMap data.

#[cfg(feature = "map-fetch")]
pub mod fetch;

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use tracing::{error, info};

use crate::config::EngineConfig;
use crate::error::SynthesisError;
use crate::packager::sanitize;
use crate::process::run_with_timeout;
use crate::request::GeoPoint;

pub const NET_SUFFIX: &str = ".net.xml";
const KM_PER_DEGREE: f64 = 111.32;
const NETCONVERT: &str = "netconvert";

/// Options applied to every OSM conversion.
const NETCONVERT_OPTIONS: &[&str] = &[
    "--geometry.remove",
    "--ramps.guess",
    "--junctions.join",
    "--tls.guess-signals",
    "--tls.discard-simple",
    "--tls.join",
    "--no-turnarounds.tls",
    "--output.street-names",
];

/// File names of the `.net.xml` maps in `dir`, sorted.
pub fn list_maps(dir: &Path) -> Result<Vec<String>, SynthesisError> {
    if !dir.is_dir() {
        return Err(SynthesisError::MapNotFound {
            path: dir.to_path_buf(),
        });
    }
    let mut maps = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if name.ends_with(NET_SUFFIX) {
                maps.push(name.to_string());
            }
        }
    }
    maps.sort();
    Ok(maps)
}

/// Geographic rectangle in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BoundingBox {
    /// Square of `size_km` on a side centred on `center`.
    pub fn around(center: GeoPoint, size_km: f64) -> Self {
        let half = size_km / 2.0;
        let delta_lat = half / KM_PER_DEGREE;
        let delta_lng = half / (KM_PER_DEGREE * center.lat.to_radians().cos());
        Self {
            south: center.lat - delta_lat,
            west: center.lng - delta_lng,
            north: center.lat + delta_lat,
            east: center.lng + delta_lng,
        }
    }

    /// `south,west,north,east`, the order Overpass expects.
    pub fn to_overpass(&self) -> String {
        format!("{},{},{},{}", self.south, self.west, self.north, self.east)
    }
}

/// Name for a generated map: `<city>_<size>km.net.xml`.
pub fn generated_map_name(city: &str, size_km: f64) -> String {
    format!(
        "{}_{}km{NET_SUFFIX}",
        sanitize(city).to_lowercase(),
        size_km.trunc() as u64
    )
}

/// Converts an OSM extract into a SUMO network with `netconvert`.
#[derive(Debug, Clone)]
pub struct NetConverter {
    binary: PathBuf,
    timeout: Duration,
}

impl NetConverter {
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, SynthesisError> {
        let binary = config.netconvert_binary();
        if !binary.is_file() {
            return Err(SynthesisError::configuration(format!(
                "{} not found; check SUMO_HOME ({})",
                binary.display(),
                config.sumo_home.display()
            )));
        }
        Ok(Self::new(binary, config.netconvert_timeout))
    }

    fn command(&self, osm: &Path, output: &Path) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .arg("--osm-files")
            .arg(osm)
            .arg("-o")
            .arg(output)
            .args(NETCONVERT_OPTIONS);
        command
    }

    pub fn convert(&self, osm: &Path, output: &Path) -> Result<(), SynthesisError> {
        let scratch = tempfile::Builder::new()
            .prefix("synth-netconvert-")
            .tempdir()?;
        info!(osm = %osm.display(), output = %output.display(), "converting OSM data");
        let result = run_with_timeout(
            self.command(osm, output),
            NETCONVERT,
            self.timeout,
            scratch.path(),
        )?;

        if !result.status.success() {
            error!(status = %result.status, stderr = %result.stderr, "netconvert failed");
            return Err(SynthesisError::ToolFailed {
                tool: NETCONVERT.to_string(),
                status: result.status.to_string(),
                diagnostic: result.stderr,
            });
        }
        if !output.is_file() {
            return Err(SynthesisError::ToolProducedNothing {
                tool: NETCONVERT.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_only_network_files_in_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in ["b.net.xml", "a.net.xml", "notes.txt", "c.osm"] {
            std::fs::write(dir.path().join(name), "").expect("write");
        }
        std::fs::create_dir(dir.path().join("d.net.xml")).expect("mkdir");
        assert_eq!(
            list_maps(dir.path()).expect("list"),
            ["a.net.xml", "b.net.xml"]
        );
    }

    #[test]
    fn missing_maps_dir_is_reported() {
        let err = list_maps(Path::new("/nonexistent/maps")).expect_err("missing");
        assert_eq!(err.kind(), crate::error::ErrorKind::AssetMissing);
    }

    #[test]
    fn bounding_box_spans_the_requested_size() {
        let bbox = BoundingBox::around(GeoPoint::new(0.0, 10.0), 2.0);
        assert!((bbox.north - bbox.south - 2.0 / 111.32).abs() < 1e-12);
        assert!((bbox.east - bbox.west - 2.0 / 111.32).abs() < 1e-12);

        let north = BoundingBox::around(GeoPoint::new(60.0, 10.0), 2.0);
        let width = north.east - north.west;
        assert!(
            (width - 2.0 * (2.0 / 111.32)).abs() < 1e-9,
            "half as many km per degree at 60°"
        );
    }

    #[test]
    fn overpass_order_is_south_west_north_east() {
        let bbox = BoundingBox {
            south: 1.0,
            west: 2.0,
            north: 3.0,
            east: 4.0,
        };
        assert_eq!(bbox.to_overpass(), "1,2,3,4");
    }

    #[test]
    fn generated_names_are_file_safe() {
        assert_eq!(
            generated_map_name("Porto Alegre", 2.7),
            "porto_alegre_2km.net.xml"
        );
    }

    #[test]
    fn netconvert_command_carries_conversion_options() {
        let converter = NetConverter::new("/opt/sumo/bin/netconvert", Duration::from_secs(1));
        let command = converter.command(Path::new("in.osm"), Path::new("out.net.xml"));
        let args: Vec<_> = command
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        assert_eq!(args[..4], ["--osm-files", "in.osm", "-o", "out.net.xml"]);
        assert_eq!(args[4..], *NETCONVERT_OPTIONS);
    }

    #[test]
    fn missing_netconvert_is_a_configuration_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = EngineConfig::default().with_sumo_home(dir.path());
        let err = NetConverter::from_config(&config).expect_err("missing binary");
        assert_eq!(err.kind(), crate::error::ErrorKind::ConfigurationError);
    }
}
