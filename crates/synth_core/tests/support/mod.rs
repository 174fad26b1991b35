#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use synth_core::engine::ScenarioEngine;
use synth_core::network::SumoNetLoader;
use synth_core::test_helpers::{GridLoader, GridSpec, ScriptedTripGenerator, TripLog};
use synth_core::EngineConfig;

pub const GRID_MAP: &str = "grid.net.xml";
pub const CORRIDOR_MAP: &str = "corridor.net.xml";

/// Engine over an in-memory grid, a maps directory holding a placeholder
/// `grid.net.xml`, and a scripted trip generator.
pub struct TestEngine {
    pub engine: ScenarioEngine,
    pub grid: GridSpec,
    pub trips: TripLog,
    maps: tempfile::TempDir,
}

impl TestEngine {
    pub fn grid() -> Self {
        Self::with_generator(GridSpec::default(), ScriptedTripGenerator::default())
    }

    pub fn with_generator(grid: GridSpec, generator: ScriptedTripGenerator) -> Self {
        let maps = tempfile::tempdir().expect("maps dir");
        std::fs::write(maps.path().join(GRID_MAP), "<net/>\n").expect("write map");
        let trips = generator.log();
        let engine = ScenarioEngine::new(
            EngineConfig::default().with_maps_dir(maps.path()),
            Box::new(GridLoader::new(grid)),
            Box::new(generator),
        );
        Self {
            engine,
            grid,
            trips,
            maps,
        }
    }

    pub fn maps_dir(&self) -> &Path {
        self.maps.path()
    }

    pub fn trip_calls(&self) -> usize {
        self.trips.lock().expect("trip log").len()
    }
}

/// Engine reading the real `.net.xml` fixtures from disk.
pub fn fixture_engine(generator: ScriptedTripGenerator) -> ScenarioEngine {
    ScenarioEngine::new(
        EngineConfig::default().with_maps_dir(fixtures_dir()),
        Box::new(SumoNetLoader),
        Box::new(generator),
    )
}

pub fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

/// Archive entries by path, as text.
pub fn unzip(archive: &[u8]) -> BTreeMap<String, String> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive)).expect("valid zip");
    let mut entries = BTreeMap::new();
    for i in 0..zip.len() {
        let mut file = zip.by_index(i).expect("zip entry");
        let mut content = String::new();
        file.read_to_string(&mut content).expect("utf8 entry");
        entries.insert(file.name().to_string(), content);
    }
    entries
}

/// `omnetpp.ini` lines assigning `key` for exactly `selector`.
pub fn ini_lines<'a>(ini: &'a str, selector: &str, key: &str) -> Vec<&'a str> {
    let prefix = format!("*.{selector}.{key} = ");
    ini.lines()
        .filter(|line| line.starts_with(&prefix))
        .collect()
}
