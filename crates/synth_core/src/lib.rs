pub mod allocator;
pub mod config;
pub mod emit;
pub mod engine;
pub mod error;
pub mod maps;
pub mod network;
pub mod packager;
mod process;
pub mod projector;
pub mod request;
pub mod snapper;
#[cfg(feature = "test-helpers")]
pub mod test_helpers;
pub mod trips;

pub use config::EngineConfig;
pub use engine::{ScenarioBundle, ScenarioEngine, SynthesisFailure};
pub use error::{ErrorKind, SynthesisError};
pub use request::{normalize_request, SimulationRequest};
