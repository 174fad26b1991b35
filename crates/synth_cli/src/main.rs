use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use synth_core::engine::{ScenarioEngine, SynthesisFailure};
use synth_core::maps::{list_maps, BoundingBox};
use synth_core::network::SumoNetLoader;
use synth_core::request::GeoPoint;
use synth_core::trips::DisabledTripGenerator;
use synth_core::{normalize_request, EngineConfig, ErrorKind, SimulationRequest, SynthesisError};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "cosim-synth",
    about = "Synthesize co-simulation scenario bundles from JSON requests"
)]
struct Cli {
    /// Directory holding `.net.xml` maps (overrides SUMO_MAPS_DIR)
    #[arg(long, global = true)]
    maps_dir: Option<PathBuf>,
    /// SUMO installation root (overrides SUMO_HOME)
    #[arg(long, global = true)]
    sumo_home: Option<PathBuf>,
    /// Python interpreter for SUMO tools (overrides SYNTH_PYTHON)
    #[arg(long, global = true)]
    python: Option<String>,
    /// Background trip generation timeout in seconds
    #[arg(long, global = true)]
    trip_timeout_secs: Option<u64>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a scenario archive from a request file
    Synth {
        /// JSON request file
        request: PathBuf,
        /// Directory receiving `<name>.zip`
        #[arg(long, default_value = ".")]
        out: PathBuf,
        /// Run without SUMO tools; requests with background traffic fail
        #[arg(long)]
        no_background: bool,
    },
    /// List maps available in the maps directory
    Maps,
    /// Print the bounding box of a square area around a point
    Bbox {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        #[arg(long, default_value_t = 2.0)]
        size_km: f64,
    },
    /// Download and convert a map around a named place
    #[cfg(feature = "map-fetch")]
    FetchMap {
        place: String,
        #[arg(long, default_value_t = 2.0)]
        size_km: f64,
    },
}

fn engine_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = EngineConfig::from_env().context("reading engine configuration")?;
    if let Some(dir) = &cli.maps_dir {
        config = config.with_maps_dir(dir);
    }
    if let Some(home) = &cli.sumo_home {
        config = config.with_sumo_home(home);
    }
    if let Some(python) = &cli.python {
        config = config.with_python(python);
    }
    if let Some(secs) = cli.trip_timeout_secs {
        config = config.with_trip_timeout(Duration::from_secs(secs));
    }
    Ok(config)
}

fn read_request(path: &Path) -> Result<SimulationRequest> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading request {}", path.display()))?;
    let request: SimulationRequest = serde_json::from_str(&raw)
        .with_context(|| format!("parsing request {}", path.display()))?;
    normalize_request(request).context("validating request")
}

fn synth(config: EngineConfig, request_path: &Path, out: &Path, no_background: bool) -> Result<()> {
    let request = read_request(request_path)?;
    let engine = if no_background {
        ScenarioEngine::new(
            config,
            Box::new(SumoNetLoader),
            Box::new(DisabledTripGenerator),
        )
    } else {
        ScenarioEngine::from_config(config).context("preparing synthesis engine")?
    };

    let bundle = match engine.synthesize(&request) {
        Ok(bundle) => bundle,
        Err(failure) => {
            for skipped in &failure.skipped {
                warn!(?skipped, "route skipped before failure");
            }
            return Err(failure.into());
        }
    };
    for skipped in bundle.skipped_routes() {
        warn!(?skipped, "route skipped");
    }

    let path = bundle
        .write_archive(out)
        .with_context(|| format!("writing archive into {}", out.display()))?;
    info!(archive = %path.display(), vehicles = bundle.summary.vehicle_count, "scenario ready");
    println!("{}", serde_json::to_string_pretty(&bundle.summary)?);
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let config = engine_config(&cli)?;
    match &cli.command {
        Commands::Synth {
            request,
            out,
            no_background,
        } => synth(config, request, out, *no_background),
        Commands::Maps => {
            for map in list_maps(&config.maps_dir)
                .with_context(|| format!("listing {}", config.maps_dir.display()))?
            {
                println!("{map}");
            }
            Ok(())
        }
        Commands::Bbox { lat, lng, size_km } => {
            let bbox = BoundingBox::around(GeoPoint::new(*lat, *lng), *size_km);
            println!("{}", bbox.to_overpass());
            Ok(())
        }
        #[cfg(feature = "map-fetch")]
        Commands::FetchMap { place, size_km } => {
            use synth_core::maps::fetch::MapFetcher;
            use synth_core::maps::NetConverter;

            let converter = NetConverter::from_config(&config).context("locating netconvert")?;
            let fetcher = MapFetcher::new().context("building HTTP client")?;
            let path = fetcher
                .generate_map(&converter, &config.maps_dir, place, *size_km)
                .with_context(|| format!("generating map for '{place}'"))?;
            println!("{}", path.display());
            Ok(())
        }
    }
}

/// Exit status per failure class; usage errors are handled by clap.
fn exit_code(err: &anyhow::Error) -> u8 {
    let kind = err
        .downcast_ref::<SynthesisFailure>()
        .map(SynthesisFailure::kind)
        .or_else(|| {
            err.downcast_ref::<SynthesisError>()
                .map(SynthesisError::kind)
        });
    match kind {
        Some(ErrorKind::AssetMissing) => 3,
        Some(ErrorKind::GeoResolutionFailure) => 4,
        Some(ErrorKind::ExternalToolFailure) => 5,
        Some(ErrorKind::ConfigurationError) => 6,
        Some(ErrorKind::Internal) | None => 1,
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}
