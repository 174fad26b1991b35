use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::SynthesisError;

/// Default location of `.net.xml` maps, relative to the working directory.
const DEFAULT_MAPS_DIR: &str = "./maps";
const DEFAULT_SUMO_HOME: &str = "/usr/share/sumo";
const DEFAULT_PYTHON: &str = "python3";
const DEFAULT_TRIP_TIMEOUT_SECS: u64 = 120;
const DEFAULT_NETCONVERT_TIMEOUT_SECS: u64 = 300;
const DEFAULT_SNAP_CACHE_CAPACITY: usize = 512;

pub const ENV_MAPS_DIR: &str = "SUMO_MAPS_DIR";
pub const ENV_SUMO_HOME: &str = "SUMO_HOME";
pub const ENV_PYTHON: &str = "SYNTH_PYTHON";
pub const ENV_TRIP_TIMEOUT_SECS: &str = "SYNTH_TRIP_TIMEOUT_SECS";

/// Long-lived engine settings: where maps live and how external tools run.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub maps_dir: PathBuf,
    pub sumo_home: PathBuf,
    /// Interpreter used to run the SUMO python tools.
    pub python: String,
    /// Wall-clock limit for the background trip generator.
    pub trip_timeout: Duration,
    pub netconvert_timeout: Duration,
    /// Entries in the per-call snap cache.
    pub snap_cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            maps_dir: PathBuf::from(DEFAULT_MAPS_DIR),
            sumo_home: PathBuf::from(DEFAULT_SUMO_HOME),
            python: DEFAULT_PYTHON.to_string(),
            trip_timeout: Duration::from_secs(DEFAULT_TRIP_TIMEOUT_SECS),
            netconvert_timeout: Duration::from_secs(DEFAULT_NETCONVERT_TIMEOUT_SECS),
            snap_cache_capacity: DEFAULT_SNAP_CACHE_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `SUMO_MAPS_DIR`, `SUMO_HOME`, `SYNTH_PYTHON` and
    /// `SYNTH_TRIP_TIMEOUT_SECS` when set.
    pub fn from_env() -> Result<Self, SynthesisError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, SynthesisError> {
        let mut config = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(dir) = non_empty(ENV_MAPS_DIR) {
            config.maps_dir = PathBuf::from(dir);
        }
        if let Some(home) = non_empty(ENV_SUMO_HOME) {
            config.sumo_home = PathBuf::from(home);
        }
        if let Some(python) = non_empty(ENV_PYTHON) {
            config.python = python;
        }
        if let Some(raw) = non_empty(ENV_TRIP_TIMEOUT_SECS) {
            let secs = raw.trim().parse::<u64>().map_err(|_| {
                SynthesisError::configuration(format!(
                    "{ENV_TRIP_TIMEOUT_SECS} must be a whole number of seconds, got '{raw}'"
                ))
            })?;
            config.trip_timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    pub fn with_maps_dir(mut self, maps_dir: impl Into<PathBuf>) -> Self {
        self.maps_dir = maps_dir.into();
        self
    }

    pub fn with_sumo_home(mut self, sumo_home: impl Into<PathBuf>) -> Self {
        self.sumo_home = sumo_home.into();
        self
    }

    pub fn with_python(mut self, python: impl Into<String>) -> Self {
        self.python = python.into();
        self
    }

    pub fn with_trip_timeout(mut self, timeout: Duration) -> Self {
        self.trip_timeout = timeout;
        self
    }

    pub fn with_netconvert_timeout(mut self, timeout: Duration) -> Self {
        self.netconvert_timeout = timeout;
        self
    }

    pub fn with_snap_cache_capacity(mut self, capacity: usize) -> Self {
        self.snap_cache_capacity = capacity;
        self
    }

    /// Path of a map inside the maps directory.
    pub fn map_path(&self, map: &str) -> PathBuf {
        self.maps_dir.join(map)
    }

    pub fn random_trips_script(&self) -> PathBuf {
        self.sumo_home.join("tools").join("randomTrips.py")
    }

    pub fn netconvert_binary(&self) -> PathBuf {
        self.sumo_home.join("bin").join("netconvert")
    }
}

/// Resolves a program name on `PATH`, or accepts an existing explicit path.
pub(crate) fn locate_program(program: &str) -> Result<PathBuf, SynthesisError> {
    let as_path = Path::new(program);
    if as_path.components().count() > 1 {
        return if as_path.is_file() {
            Ok(as_path.to_path_buf())
        } else {
            Err(SynthesisError::configuration(format!(
                "{program} does not exist"
            )))
        };
    }
    which::which(program)
        .map_err(|err| SynthesisError::configuration(format!("{program} not found on PATH: {err}")))
}
