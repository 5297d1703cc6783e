//! Command-line argument parsing for the `pano-splat` binary.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// `pano-splat` command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug)]
#[command(
    name = "pano-splat",
    about = "Reconstruct a splat scene from a photo or a 360° panorama"
)]
pub struct CliArgs {
    /// Input image. `*.360.jpg`, `*.360.jpeg` and `*.360.png` run the panorama pipeline.
    pub input: PathBuf,

    /// Per-face overscan field of view in degrees.
    #[arg(long)]
    pub fov: Option<f64>,

    /// Reconstruction tool command.
    #[arg(long)]
    pub reconstruct_cli: Option<String>,

    /// Merge tool command.
    #[arg(long)]
    pub merge_cli: Option<String>,

    /// Job root directory.
    #[arg(long)]
    pub job_root: Option<PathBuf>,

    /// Seed for the alignment/normalization subsampling.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(fov) = args.fov {
            self.pipeline.overscan_fov_deg = fov;
        }
        if let Some(ref cli) = args.reconstruct_cli {
            self.tools.reconstruct_cli = Some(cli.clone());
        }
        if let Some(ref cli) = args.merge_cli {
            self.tools.merge_cli = Some(cli.clone());
        }
        if let Some(ref root) = args.job_root {
            self.storage.job_root = Some(root.clone());
        }
        if let Some(seed) = args.seed {
            self.pipeline.sample_seed = Some(seed);
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
