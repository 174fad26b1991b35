//! City lookup and OSM download over HTTP.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{info, warn};

use super::{generated_map_name, BoundingBox, NetConverter};
use crate::error::SynthesisError;
use crate::request::GeoPoint;

pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";
pub const OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";
const USER_AGENT: &str = concat!("cosim-synth/", env!("CARGO_PKG_VERSION"));
const GEOCODE_TIMEOUT: Duration = Duration::from_secs(10);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum MapFetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("place '{0}' not found")]
    PlaceNotFound(String),
    #[error("geocoder returned an unreadable coordinate: {0}")]
    BadCoordinate(String),
    #[error(transparent)]
    Conversion(#[from] SynthesisError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

/// Overpass query for every highway way inside `bbox`, with its nodes.
pub fn highway_query(bbox: &BoundingBox) -> String {
    format!(
        "[out:xml][timeout:25];\n(\n  way[\"highway\"]({});\n);\n(._;>;);\nout meta;\n",
        bbox.to_overpass()
    )
}

#[derive(Debug, Clone)]
pub struct MapFetcher {
    client: Client,
    nominatim_url: String,
    overpass_url: String,
}

impl MapFetcher {
    pub fn new() -> Result<Self, MapFetchError> {
        Self::with_endpoints(NOMINATIM_URL, OVERPASS_URL)
    }

    pub fn with_endpoints(nominatim_url: &str, overpass_url: &str) -> Result<Self, MapFetchError> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            nominatim_url: nominatim_url.to_string(),
            overpass_url: overpass_url.to_string(),
        })
    }

    /// First geocoder hit for `place`.
    pub fn geocode(&self, place: &str) -> Result<GeoPoint, MapFetchError> {
        let places: Vec<Place> = self
            .client
            .get(&self.nominatim_url)
            .query(&[("q", place), ("format", "json"), ("limit", "1")])
            .timeout(GEOCODE_TIMEOUT)
            .send()?
            .error_for_status()?
            .json()?;
        let first = places
            .into_iter()
            .next()
            .ok_or_else(|| MapFetchError::PlaceNotFound(place.to_string()))?;
        let parse = |raw: &str| {
            raw.trim()
                .parse::<f64>()
                .map_err(|_| MapFetchError::BadCoordinate(raw.to_string()))
        };
        let point = GeoPoint::new(parse(&first.lat)?, parse(&first.lon)?);
        info!(place, lat = point.lat, lng = point.lng, "geocoded place");
        Ok(point)
    }

    /// Downloads the highway network inside `bbox` as OSM XML into `dest`.
    pub fn download_highways(&self, bbox: &BoundingBox, dest: &Path) -> Result<(), MapFetchError> {
        info!(bbox = %bbox.to_overpass(), "downloading OSM highways");
        let body = self
            .client
            .post(&self.overpass_url)
            .body(highway_query(bbox))
            .timeout(DOWNLOAD_TIMEOUT)
            .send()?
            .error_for_status()?
            .text()?;
        std::fs::write(dest, body)?;
        Ok(())
    }

    /// Geocodes `place`, downloads a `size_km` square around it and converts
    /// it into `<maps_dir>/<place>_<size>km.net.xml`.
    pub fn generate_map(
        &self,
        converter: &NetConverter,
        maps_dir: &Path,
        place: &str,
        size_km: f64,
    ) -> Result<PathBuf, MapFetchError> {
        std::fs::create_dir_all(maps_dir)?;
        let center = self.geocode(place)?;
        let bbox = BoundingBox::around(center, size_km);

        let osm = tempfile::Builder::new()
            .prefix("synth-osm-")
            .suffix(".osm")
            .tempfile()?;
        self.download_highways(&bbox, osm.path())?;

        let output = maps_dir.join(generated_map_name(place, size_km));
        converter.convert(osm.path(), &output)?;
        if let Err(err) = osm.close() {
            warn!(error = %err, "could not remove temporary OSM file");
        }
        info!(map = %output.display(), "map generated");
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_selects_highways_in_box() {
        let bbox = BoundingBox {
            south: 1.0,
            west: 2.0,
            north: 3.0,
            east: 4.0,
        };
        let query = highway_query(&bbox);
        assert!(query.starts_with("[out:xml][timeout:25];"));
        assert!(query.contains("way[\"highway\"](1,2,3,4);"));
        assert!(query.trim_end().ends_with("out meta;"));
    }

    #[test]
    fn geocoder_payload_parses() {
        let payload = r#"[{"lat": "-30.03", "lon": "-51.23", "display_name": "x"}]"#;
        let places: Vec<Place> = serde_json::from_str(payload).expect("payload");
        assert_eq!(places[0].lat, "-30.03");
    }
}
