//! Background traffic generation.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use tracing::{error, info};

use crate::config::{locate_program, EngineConfig};
use crate::error::SynthesisError;
use crate::process::run_with_timeout;

const TOOL_NAME: &str = "randomTrips.py";

/// Input of one background traffic generation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TripRequest<'a> {
    pub network: &'a Path,
    pub duration_s: u32,
    /// Seconds between generated departures.
    pub period_s: f64,
    pub seed: u64,
}

/// Seconds between departures so that `vehicles` trips fit in `duration_s`.
pub fn trip_period(duration_s: u32, vehicles: u32) -> f64 {
    f64::from(duration_s) / f64::from(vehicles.max(1))
}

/// Produces a route file with procedurally generated trips.
pub trait TripGenerator {
    /// Checked before any work when a request asks for background traffic.
    fn ensure_available(&self) -> Result<(), SynthesisError> {
        Ok(())
    }

    fn generate(&self, request: &TripRequest<'_>) -> Result<String, SynthesisError>;
}

/// Runs SUMO's `randomTrips.py` in a scratch directory.
#[derive(Debug, Clone)]
pub struct RandomTripsGenerator {
    python: PathBuf,
    script: PathBuf,
    timeout: Duration,
}

impl RandomTripsGenerator {
    pub fn new(python: impl Into<PathBuf>, script: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            python: python.into(),
            script: script.into(),
            timeout,
        }
    }

    /// Locates the interpreter and script named by `config`.
    pub fn from_config(config: &EngineConfig) -> Result<Self, SynthesisError> {
        let python = locate_program(&config.python)?;
        let script = config.random_trips_script();
        if !script.is_file() {
            return Err(SynthesisError::configuration(format!(
                "{} not found; check SUMO_HOME ({})",
                script.display(),
                config.sumo_home.display()
            )));
        }
        Ok(Self::new(python, script, config.trip_timeout))
    }

    fn command(&self, request: &TripRequest<'_>, output: &Path) -> Command {
        let mut command = Command::new(&self.python);
        command
            .arg(&self.script)
            .arg("-n")
            .arg(request.network)
            .arg("-e")
            .arg(request.duration_s.to_string())
            .arg("-p")
            .arg(request.period_s.to_string())
            .arg("-o")
            .arg(output)
            .arg("--seed")
            .arg(request.seed.to_string())
            .arg("--validate");
        command
    }
}

impl TripGenerator for RandomTripsGenerator {
    fn generate(&self, request: &TripRequest<'_>) -> Result<String, SynthesisError> {
        // Removed on every exit path when dropped.
        let scratch = tempfile::Builder::new().prefix("synth-trips-").tempdir()?;
        let output = scratch.path().join("random.rou.xml");

        info!(
            network = %request.network.display(),
            period_s = request.period_s,
            seed = request.seed,
            "generating background trips"
        );
        let mut command = self.command(request, &output);
        command.current_dir(scratch.path());
        let result = run_with_timeout(command, TOOL_NAME, self.timeout, scratch.path())?;

        if !result.status.success() {
            error!(status = %result.status, stderr = %result.stderr, "trip generator failed");
            return Err(SynthesisError::ToolFailed {
                tool: TOOL_NAME.to_string(),
                status: result.status.to_string(),
                diagnostic: result.stderr,
            });
        }

        match std::fs::read_to_string(&output) {
            Ok(routes) if !routes.trim().is_empty() => Ok(routes),
            _ => Err(SynthesisError::ToolProducedNothing {
                tool: TOOL_NAME.to_string(),
            }),
        }
    }
}

/// Generator for hosts without SUMO tools. Any request for background
/// traffic fails with a configuration error.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledTripGenerator;

impl TripGenerator for DisabledTripGenerator {
    fn ensure_available(&self) -> Result<(), SynthesisError> {
        Err(SynthesisError::configuration(
            "background traffic requested but trip generation is disabled",
        ))
    }

    fn generate(&self, _request: &TripRequest<'_>) -> Result<String, SynthesisError> {
        self.ensure_available().map(|()| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_never_divides_by_zero() {
        assert_eq!(trip_period(120, 0), 120.0);
        assert_eq!(trip_period(120, 1), 120.0);
        assert_eq!(trip_period(120, 5), 24.0);
    }

    #[test]
    fn disabled_generator_refuses_requests() {
        let request = TripRequest {
            network: Path::new("grid.net.xml"),
            duration_s: 60,
            period_s: 6.0,
            seed: 1,
        };
        let err = DisabledTripGenerator
            .generate(&request)
            .expect_err("disabled");
        assert_eq!(err.kind(), crate::error::ErrorKind::ConfigurationError);
        let err = DisabledTripGenerator
            .ensure_available()
            .expect_err("disabled");
        assert_eq!(err.kind(), crate::error::ErrorKind::ConfigurationError);
    }

    #[test]
    fn command_line_matches_random_trips_interface() {
        let generator = RandomTripsGenerator::new(
            "/usr/bin/python3",
            "/opt/sumo/tools/randomTrips.py",
            Duration::from_secs(5),
        );
        let request = TripRequest {
            network: Path::new("/maps/city.net.xml"),
            duration_s: 100,
            period_s: 12.5,
            seed: 9,
        };
        let command = generator.command(&request, Path::new("/tmp/out.rou.xml"));
        let args: Vec<_> = command
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            [
                "/opt/sumo/tools/randomTrips.py",
                "-n",
                "/maps/city.net.xml",
                "-e",
                "100",
                "-p",
                "12.5",
                "-o",
                "/tmp/out.rou.xml",
                "--seed",
                "9",
                "--validate",
            ]
        );
    }

    #[test]
    fn missing_script_is_a_configuration_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = EngineConfig::default()
            .with_sumo_home(dir.path())
            .with_python("sh");
        let err = RandomTripsGenerator::from_config(&config).expect_err("no script");
        assert_eq!(err.kind(), crate::error::ErrorKind::ConfigurationError);
    }

    #[cfg(unix)]
    mod fake_tool {
        use super::*;

        /// Writes a shell stand-in for randomTrips.py that copies its `-o`
        /// argument handling, then behaves as `body` says.
        fn fake_script(dir: &Path, body: &str) -> PathBuf {
            let script = dir.join("randomTrips.sh");
            let text = format!(
                "out=''\nwhile [ $# -gt 0 ]; do\n  if [ \"$1\" = '-o' ]; then out=\"$2\"; fi\n  shift\ndone\n{body}\n"
            );
            std::fs::write(&script, text).expect("write fake tool");
            script
        }

        fn request(network: &Path) -> TripRequest<'_> {
            TripRequest {
                network,
                duration_s: 60,
                period_s: 6.0,
                seed: 3,
            }
        }

        #[test]
        fn returns_generated_route_file() {
            let dir = tempfile::tempdir().expect("tempdir");
            let script = fake_script(
                dir.path(),
                r#"printf '<routes><trip id="0" depart="0.00" from="a" to="b"/></routes>\n' > "$out""#,
            );
            let generator = RandomTripsGenerator::new("sh", script, Duration::from_secs(10));
            let routes = generator
                .generate(&request(Path::new("grid.net.xml")))
                .expect("generation should succeed");
            assert!(routes.contains(r#"<trip id="0""#));
        }

        #[test]
        fn nonzero_exit_keeps_diagnostic() {
            let dir = tempfile::tempdir().expect("tempdir");
            let script = fake_script(dir.path(), "echo 'Error: no valid edges' >&2\nexit 1");
            let generator = RandomTripsGenerator::new("sh", script, Duration::from_secs(10));
            let err = generator
                .generate(&request(Path::new("grid.net.xml")))
                .expect_err("generation should fail");
            match err {
                SynthesisError::ToolFailed { diagnostic, .. } => {
                    assert_eq!(diagnostic, "Error: no valid edges")
                }
                other => panic!("unexpected error {other:?}"),
            }
        }

        #[test]
        fn silent_success_without_output_is_reported() {
            let dir = tempfile::tempdir().expect("tempdir");
            let script = fake_script(dir.path(), "exit 0");
            let generator = RandomTripsGenerator::new("sh", script, Duration::from_secs(10));
            let err = generator
                .generate(&request(Path::new("grid.net.xml")))
                .expect_err("generation should fail");
            assert!(matches!(err, SynthesisError::ToolProducedNothing { .. }));
        }
    }
}
