//! Merges two independently sliced toolpaths of a pause-and-swap dual-material
//! print into one, layer by layer.
//!
//! The second toolpath gets calibration offsets and an extrusion scale applied,
//! then its layers are interleaved with the first toolpath's layers starting at
//! a configurable layer, with swap travel, dwell, fan and retraction commands
//! injected around each second-toolpath layer. The result replaces the second
//! toolpath's file, keeping that file's header.

use std::path::Path;

use tracing::{info, warn};

pub mod config;
pub mod error;
pub mod gcode;
pub mod interleave;
pub mod offset;
pub mod output;
pub mod segment;

pub use config::{InterleaveConfig, InterleavePolicy};
pub use error::{ConfigError, ConfigWarning, InterleaveError, Result};
pub use interleave::{interleave, InterleaveEngine, RetractionState, StartPosition};
pub use offset::AxisOffsets;
pub use segment::{segment, Layer, ToolpathDocument, DEFAULT_LAYER_MARKER};

/// Installs a fmt subscriber on stderr. `RUST_LOG` overrides the default `info` level.
pub fn init_logging() -> std::result::Result<(), tracing_subscriber::util::TryInitError> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
}

/// What a run did, for the caller to report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub layers1: usize,
    pub layers2: usize,
    pub preamble_lines: usize,
    pub merged_lines: usize,
}

/// Logs the effective configuration, including every defaulted value.
pub fn log_config(config: &InterleaveConfig, target: &Path) {
    for warning in &config.warnings {
        warn!("{}", warning);
    }
    let p = &config.policy;
    info!("Currently sliced G-code path: {}", target.display());
    info!("G-code1 path: {}", config.gcode1_path.display());
    info!("Offsets: X={} Y={} Z={}", p.offsets.x, p.offsets.y, p.offsets.z);
    info!("Fan control: {}", if p.fan_control { "On" } else { "Off" });
    info!("Interleaving starts from layer: {}", p.start_layer);
    match p.rest1_position {
        Some((x, y)) => info!("Rest1 position (before Model 2 layer): X={} Y={}, {} s", x, y, p.rest1_time),
        None => info!("Rest1 position (before Model 2 layer): not specified or invalid"),
    }
    match p.rest2_position {
        Some((x, y)) => info!("Rest2 position (after Model 2 layer): X={} Y={}, {} s", x, y, p.rest2_time),
        None => info!("Rest2 position (after Model 2 layer): not specified or invalid"),
    }
    info!("Extrusion multiplier for Model 2: {}", p.extrusion_multiplier);
    info!("Retraction length: {} mm", p.retraction_length);
}

/// Reads both toolpaths, merges them and writes `preamble + merged` to `output`.
///
/// `target` is the second toolpath; `output` is usually the same path. Nothing
/// is written unless both inputs were read successfully.
pub fn process_files(config: &InterleaveConfig, target: &Path, output: &Path, layer_marker: &str) -> Result<RunSummary> {
    let first = segment::read_document(&config.gcode1_path, layer_marker)?;
    let second = segment::read_document(target, layer_marker)?;
    info!(
        layers1 = first.layer_count(),
        layers2 = second.layer_count(),
        "read toolpaths"
    );

    let policy = &config.policy;
    let layers2_offset = offset::transform_layers(&second.layers, &policy.offsets, policy.extrusion_multiplier);
    let merged = interleave(&first.layers, &layers2_offset, policy);

    output::write_output(output, &second.preamble, &merged)?;

    Ok(RunSummary {
        layers1: first.layer_count(),
        layers2: second.layer_count(),
        preamble_lines: second.preamble.len(),
        merged_lines: merged.len(),
    })
}
