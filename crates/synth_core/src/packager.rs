//! Scenario naming and archive assembly.

use std::io::{Cursor, Write};
use std::path::Path;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::info;
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::engine::ResolutionSummary;
use crate::error::SynthesisError;
use crate::request::SimulationRequest;

pub const METADATA_FILE: &str = "metadata.json";
const ARCHIVE_ROOT: &str = "simulations";
const FALLBACK_NAME: &str = "scenario";
const RESERVED_PREFIX: &str = "s_";

/// NED keywords, which cannot name a package or a network.
const NED_KEYWORDS: &[&str] = &[
    "allowunconnected",
    "bool",
    "channel",
    "channelinterface",
    "connections",
    "const",
    "default",
    "double",
    "extends",
    "false",
    "for",
    "gates",
    "if",
    "import",
    "index",
    "inout",
    "input",
    "int",
    "like",
    "module",
    "moduleinterface",
    "network",
    "object",
    "output",
    "package",
    "parameters",
    "property",
    "simple",
    "sizeof",
    "string",
    "submodules",
    "this",
    "true",
    "typename",
    "types",
    "volatile",
    "xml",
    "xmldoc",
];

/// Turns a free-form scenario name into a simulator identifier.
///
/// Runs of characters other than ASCII letters and digits become one `_` and
/// leading and trailing `_` are dropped. The result is never empty. A name
/// starting with a digit or equal to a NED keyword gets an `s_` prefix.
pub fn sanitize(raw: &str) -> String {
    let mut name = String::with_capacity(raw.len());
    let mut pending_separator = false;
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !name.is_empty() {
                name.push('_');
            }
            pending_separator = false;
            name.push(ch);
        } else {
            pending_separator = true;
        }
    }

    if name.is_empty() {
        return FALLBACK_NAME.to_string();
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) || NED_KEYWORDS.contains(&name.as_str()) {
        name.insert_str(0, RESERVED_PREFIX);
    }
    name
}

/// Every name derived from the sanitized scenario name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioLayout {
    name: String,
}

impl ScenarioLayout {
    pub fn from_name(raw: &str) -> Self {
        Self {
            name: sanitize(raw),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Folder inside the archive holding every scenario file.
    pub fn root_dir(&self) -> String {
        format!("{ARCHIVE_ROOT}/{}", self.name)
    }

    /// Topology package.
    pub fn package(&self) -> String {
        format!("{ARCHIVE_ROOT}.{}", self.name)
    }

    /// Fully qualified network referenced by the configuration.
    pub fn network_ref(&self) -> String {
        format!("{}.{}", self.package(), self.name)
    }

    pub fn entry_path(&self, file: &str) -> String {
        format!("{}/{file}", self.root_dir())
    }

    pub fn archive_file_name(&self) -> String {
        format!("{}.zip", self.name)
    }
}

/// A generated file, relative to the scenario folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifact {
    pub path: String,
    pub content: Vec<u8>,
}

impl GeneratedArtifact {
    pub fn text(path: impl Into<String>, content: String) -> Self {
        Self {
            path: path.into(),
            content: content.into_bytes(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }
}

#[derive(Debug, Serialize)]
struct ScenarioMetadata<'a> {
    generated_at: &'a str,
    request_fingerprint: String,
    request: &'a SimulationRequest,
    resolution: &'a ResolutionSummary,
}

/// SHA-256 over the canonical JSON form of the request.
pub fn request_fingerprint(request: &SimulationRequest) -> Result<String, SynthesisError> {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(request)?);
    Ok(format!("{:x}", hasher.finalize()))
}

/// `metadata.json`: the request as received plus what resolution made of it.
/// `generated_at` is the only field that changes between identical runs.
pub fn metadata_artifact(
    request: &SimulationRequest,
    resolution: &ResolutionSummary,
    generated_at: &str,
) -> Result<GeneratedArtifact, SynthesisError> {
    let metadata = ScenarioMetadata {
        generated_at,
        request_fingerprint: request_fingerprint(request)?,
        request,
        resolution,
    };
    let mut json = serde_json::to_string_pretty(&metadata)?;
    json.push('\n');
    Ok(GeneratedArtifact::text(METADATA_FILE, json))
}

/// Writes `artifacts` and the map asset into one zip under the layout's root
/// folder. A missing map aborts before anything is written.
pub fn package(
    layout: &ScenarioLayout,
    artifacts: &[GeneratedArtifact],
    map_source: &Path,
    map_file: &str,
) -> Result<Vec<u8>, SynthesisError> {
    if !map_source.is_file() {
        return Err(SynthesisError::MapNotFound {
            path: map_source.to_path_buf(),
        });
    }
    if artifacts.iter().any(|artifact| artifact.path == map_file) {
        return Err(SynthesisError::DuplicateEntry {
            path: layout.entry_path(map_file),
        });
    }
    let map_bytes = std::fs::read(map_source)?;

    // Fixed timestamp: identical input yields identical archives.
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    for artifact in artifacts {
        writer.start_file(layout.entry_path(&artifact.path), options)?;
        writer.write_all(&artifact.content)?;
    }
    writer.start_file(layout.entry_path(map_file), options)?;
    writer.write_all(&map_bytes)?;

    let bytes = writer.finish()?.into_inner();
    info!(
        scenario = layout.name(),
        entries = artifacts.len() + 1,
        bytes = bytes.len(),
        "packaged scenario archive"
    );
    Ok(bytes)
}
