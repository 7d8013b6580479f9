use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use antenna_rf::{Analysis, AnalysisConfig, ImageFormat};

/// Computes receiver gain and impedance per angle from a folder of S2P
/// measurements and plots the broadside S-parameters and emission pattern.
#[derive(Parser, Debug)]
#[command(name = "antenna-analyzer", version, about)]
struct Args {
    /// Folder of <angle>.S2P measurement files
    data_folder: Option<PathBuf>,

    /// JSON configuration file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Transmit antenna gain (dB, or linear with --linear)
    #[arg(long, allow_hyphen_values = true)]
    tx_gain: Option<f64>,

    /// Report gain as a linear ratio instead of dBi
    #[arg(long)]
    linear: bool,

    /// Antenna separation in meters
    #[arg(long)]
    distance: Option<f64>,

    /// Directory for the generated plots
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Image format: png or svg
    #[arg(long)]
    format: Option<ImageFormat>,

    /// Reference impedance in ohms
    #[arg(long)]
    z0: Option<f64>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn into_config(self) -> anyhow::Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::from_json_file(path)
                .with_context(|| format!("loading configuration from {}", path.display()))?,
            None => AnalysisConfig::default(),
        };
        if let Some(folder) = self.data_folder {
            config.data_folder = folder;
        }
        if let Some(tx_gain) = self.tx_gain {
            config.tx_gain_db = tx_gain;
        }
        if self.linear {
            config.linear_gain = true;
        }
        if let Some(distance) = self.distance {
            config.antenna_distance = distance;
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        if let Some(format) = self.format {
            config.image_format = format;
        }
        if let Some(z0) = self.z0 {
            config.reference_impedance = z0;
        }
        Ok(config)
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    let config = args.into_config()?;
    info!(?config, "starting analysis");

    let analysis = Analysis::run(&config)
        .with_context(|| format!("analysing {}", config.data_folder.display()))?;
    let (broadside, emissions) = analysis.report().context("writing plots")?;
    info!(broadside = %broadside.display(), emissions = %emissions.display(), "done");
    Ok(())
}
