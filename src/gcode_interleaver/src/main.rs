use anyhow::Context;
use clap::Parser;
use gcode_interleaver_lib as gi;
use std::path::PathBuf;
use tracing::info;

/// Interleave the layers of two sliced toolpaths for a pause-and-swap dual-material print.
///
/// The second toolpath (TARGET) is offset, merged with G-code1 and written back over TARGET.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Comma-separated key:value pairs, e.g.
    /// "G-code1:first.gcode,X_offset:0.5,fan_control:on,start_layer:2,rest1_position:10_200,rest1_time:3,extrusion_multiplier:0.95,retraction:0.8,rest2_position:10_200,rest2_time:5"
    config: String,

    /// Toolpath that is read, merged and overwritten.
    target: PathBuf,

    /// Prepended verbatim to the G-code1 value to form its path.
    #[arg(long, default_value = "")]
    gcode1_prefix: String,

    /// Lines starting with this begin a new layer.
    #[arg(long, default_value = gi::DEFAULT_LAYER_MARKER)]
    layer_marker: String,

    /// Write the merged toolpath here instead of overwriting TARGET.
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    gi::init_logging().context("failed to initialize logging")?;
    info!("gcode_interleaver starting");

    let config = gi::InterleaveConfig::parse(&args.config, &args.gcode1_prefix)?;
    gi::log_config(&config, &args.target);

    // output and target can be the same file; both inputs are fully read before it's touched
    let output = args.output.as_deref().unwrap_or(&args.target);
    let summary = gi::process_files(&config, &args.target, output, &args.layer_marker)
        .with_context(|| format!("failed to interleave into {}", output.display()))?;

    info!(
        layers1 = summary.layers1,
        layers2 = summary.layers2,
        "successfully interleaved layers into {}",
        output.display()
    );
    Ok(())
}
