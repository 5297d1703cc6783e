//! Single-image jobs: one reconstruction, no stitching.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::coordinator::file_stem;
use crate::storage::{JobLog, SCENE_PLY_NAME};
use crate::tools::ReconstructionTool;
use crate::PipelineError;

/// Reconstruct `input` into `{stem}.ply` inside `job_dir` and copy it to
/// `scene.ply`. Returns the reconstructed file.
pub fn run_single_image(
    tool: &dyn ReconstructionTool,
    input: &Path,
    job_dir: &Path,
    log: &JobLog,
) -> Result<PathBuf, PipelineError> {
    let output = job_dir.join(format!("{}.ply", file_stem(input)));
    tool.reconstruct(input, &output, job_dir, log)?;

    let scene = job_dir.join(SCENE_PLY_NAME);
    if scene != output {
        std::fs::copy(&output, &scene).map_err(|e| PipelineError::io(&scene, e))?;
    }
    info!("Reconstructed {} into {}", input.display(), output.display());
    Ok(output)
}
