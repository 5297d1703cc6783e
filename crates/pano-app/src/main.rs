//! `pano-splat` - reconstruct a splat scene from a photo or a 360° panorama.
//!
//! Loads `config.ron`, applies CLI overrides, runs one job through the
//! pipeline and reports where its outputs landed.
//!
//! Run with: `cargo run -p pano-app -- room.360.jpg`

mod platform;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use pano_config::{CliArgs, Config};
use pano_pipeline::{
    CliMergeTool, CliReconstructionTool, JobRoot, JobRunner, JobState, MergeCoordinator,
    MergeTool, PipelineSettings,
};
use tracing::{error, info, warn};

use crate::platform::PlatformDirs;

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let platform = match PlatformDirs::resolve_and_create() {
        Ok(dirs) => Some(dirs),
        Err(e) => {
            eprintln!("Platform directories unavailable: {e}");
            None
        }
    };

    let config_dir = args
        .config
        .clone()
        .or_else(|| platform.as_ref().map(|p| p.config_dir.clone()));
    let mut config = match config_dir {
        Some(dir) => match Config::load_or_create(&dir) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config from {}: {e}", dir.display());
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };
    config.apply_cli_overrides(&args);
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {e}");
        return ExitCode::FAILURE;
    }

    let log_dir = platform.as_ref().map(|p| p.log_dir.clone());
    pano_log::init_logging(log_dir.as_deref(), cfg!(debug_assertions), Some(&config));

    info!("pano-splat {}", env!("CARGO_PKG_VERSION"));
    info!(
        "Overscan FOV: {:.1}° | seed: {:?}",
        config.pipeline.overscan_fov_deg, config.pipeline.sample_seed
    );

    let root = JobRoot::new(match (&config.storage.job_root, &platform) {
        (Some(root), _) => root.clone(),
        (None, Some(platform)) => platform.default_job_root(),
        (None, None) => config.storage.resolved_job_root(),
    });
    if config.storage.clear_on_startup
        && let Err(e) = root.clear()
    {
        error!("Failed to clear job root {}: {e}", root.path().display());
        return ExitCode::FAILURE;
    }
    info!("Job root: {}", root.path().display());

    let reconstruct = CliReconstructionTool::resolve(
        args.reconstruct_cli.as_deref(),
        config.tools.reconstruct_cli.as_deref(),
    );
    info!("Reconstruction tool: {}", reconstruct.cli());
    let merge = CliMergeTool::resolve(config.tools.merge_cli.as_deref());
    match &merge {
        Some(tool) => info!("Merge tool: {}", tool.cli()),
        None => info!("No merge tool found; 360 scenes will be served as layers"),
    }

    let coordinator = MergeCoordinator::new(
        PipelineSettings::from(&config.pipeline),
        Arc::new(reconstruct),
        merge.map(|tool| Arc::new(tool) as Arc<dyn MergeTool>),
    );
    let runner = JobRunner::new(root, coordinator);

    let job_id = match runner.submit(&args.input).and_then(|handle| handle.join()) {
        Ok(id) => id,
        Err(e) => {
            error!("Could not run job for {}: {e}", args.input.display());
            return ExitCode::FAILURE;
        }
    };

    let root = runner.root();
    let Some(status) = root.read_status(&job_id) else {
        error!("Job {job_id} left no readable status");
        return ExitCode::FAILURE;
    };
    match status.status {
        JobState::Done => {
            info!("Job {job_id}: {}", status.message);
            info!("Outputs in {}", root.job_dir(&job_id).display());
            ExitCode::SUCCESS
        }
        state => {
            error!("Job {job_id} ended {state:?}: {}", status.message);
            if let Some(logs) = root.read_logs(&job_id)
                && !logs.stderr.trim().is_empty()
            {
                warn!("Tool stderr:\n{}", logs.stderr.trim_end());
            }
            ExitCode::FAILURE
        }
    }
}
