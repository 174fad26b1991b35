use crate::emit::ARTIFACT_FILES;
use crate::error::ValidationError;

use super::{GeoPoint, PlacedEntity, SimulationRequest};

pub fn normalize_request(request: SimulationRequest) -> Result<SimulationRequest, ValidationError> {
    let mut request = request;

    request.name = request.name.trim().to_string();
    if request.name.is_empty() {
        return Err(ValidationError::new("name cannot be empty"));
    }

    request.map = request.map.trim().to_string();
    if request.map.is_empty() {
        return Err(ValidationError::new("map cannot be empty"));
    }
    if request.map.contains('/') || request.map.contains('\\') || request.map.contains("..") {
        return Err(ValidationError::new(format!(
            "map '{}' must be a plain file name inside the maps directory",
            request.map
        )));
    }

    if ARTIFACT_FILES.contains(&request.map.as_str()) {
        return Err(ValidationError::new(format!(
            "map '{}' collides with a generated scenario file",
            request.map
        )));
    }

    if request.duration_s == 0 {
        return Err(ValidationError::new(
            "duration_s must be a positive integer",
        ));
    }

    for (idx, entity) in request.entities.iter().enumerate() {
        match entity {
            PlacedEntity::Vehicle { start, end, .. } => {
                check_point(start, &format!("entities[{idx}].start"))?;
                if let Some(end) = end {
                    check_point(end, &format!("entities[{idx}].end"))?;
                }
            }
            PlacedEntity::Jammer { position, params } => {
                check_point(position, &format!("entities[{idx}].position"))?;
                let settings = params.resolve(&request.defaults.jamming);
                if settings.stop_s < settings.start_s {
                    return Err(ValidationError::new(format!(
                        "entities[{idx}]: jammer stop_s ({}) is before start_s ({})",
                        settings.stop_s, settings.start_s
                    )));
                }
            }
            PlacedEntity::RoadsideUnit { position, .. } => {
                check_point(position, &format!("entities[{idx}].position"))?;
            }
        }
    }

    for (idx, route) in request.routes.iter().enumerate() {
        check_point(&route.start, &format!("routes[{idx}].start"))?;
        check_point(&route.end, &format!("routes[{idx}].end"))?;
        if route.count == Some(0) {
            return Err(ValidationError::new(format!(
                "routes[{idx}].count must be a positive integer"
            )));
        }
    }

    Ok(request)
}

fn check_point(point: &GeoPoint, label: &str) -> Result<(), ValidationError> {
    if !point.lat.is_finite() || !point.lng.is_finite() {
        return Err(ValidationError::new(format!(
            "{label} is not a finite coordinate"
        )));
    }
    if !(-90.0..=90.0).contains(&point.lat) || !(-180.0..=180.0).contains(&point.lng) {
        return Err(ValidationError::new(format!(
            "{label} ({}, {}) is outside the WGS84 range",
            point.lat, point.lng
        )));
    }
    Ok(())
}
