//! Job pipeline for turning uploaded photos into splat scenes.
//!
//! 360 panoramas (`*.360.jpg|jpeg|png`) are split into six cube faces,
//! reconstructed face by face with an external tool, stitched into one frame
//! and optionally merged. Other images go straight through the
//! reconstruction tool. Jobs run on worker threads and report progress
//! through a status record in their job directory.

mod coordinator;
mod error;
mod metadata;
mod runner;
mod single;
mod storage;
mod tools;


pub use coordinator::{MergeCoordinator, PipelineSettings};
pub use error::{ErrorKind, PipelineError};
pub use metadata::{FaceDescriptor, METADATA_VERSION, Mode360Metadata, SceneMetadata};
pub use runner::{JobHandle, JobRunner, is_360_filename};
pub use single::run_single_image;
pub use storage::{
    JobLog, JobLogs, JobRoot, JobState, JobStatus, METADATA_FILE_NAME, SCENE_PLY_NAME,
    STATUS_FILE_NAME, STDERR_LOG_NAME, STDOUT_LOG_NAME,
};
pub use tools::{
    CliMergeTool, CliReconstructionTool, DEFAULT_MERGE_CLI, DEFAULT_RECONSTRUCT_CLI,
    MERGE_CLI_ENV, MergeTool, RECONSTRUCT_CLI_ENV, ReconstructionTool, find_on_path,
    resolve_merge_cli, resolve_reconstruct_cli,
};
