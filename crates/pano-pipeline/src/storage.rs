//! On-disk job storage.
//!
//! Every job lives in `{root}/{job_id}/`:
//!
//! | file | contents |
//! |---|---|
//! | `{upload}` | copied input image |
//! | `status.json` | `{ "status": "pending" \| "running" \| "done" \| "error", "message": "..." }` |
//! | `stdout.log` / `stderr.log` | progress lines and external tool output |
//! | `face_{i}.jpg`, `face_{i}.ply` | 360 jobs: face images and clouds |
//! | `metadata.json` | 360 jobs: scene metadata |
//! | `scene.ply` | single-image jobs: reconstructed cloud |

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::PipelineError;

pub const STATUS_FILE_NAME: &str = "status.json";
pub const METADATA_FILE_NAME: &str = "metadata.json";
pub const STDOUT_LOG_NAME: &str = "stdout.log";
pub const STDERR_LOG_NAME: &str = "stderr.log";
pub const SCENE_PLY_NAME: &str = "scene.ply";
const KEEP_FILE_NAME: &str = ".gitkeep";

/// Lifecycle state of a job.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    #[default]
    Pending,
    Running,
    Done,
    Error,
}

/// Persisted status record of a job.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobStatus {
    pub status: JobState,
    pub message: String,
}

impl JobStatus {
    pub fn new(status: JobState, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// Captured log text of a job.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JobLogs {
    pub stdout: String,
    pub stderr: String,
}

/// Append-only log streams of one job.
#[derive(Clone, Debug)]
pub struct JobLog {
    stdout: PathBuf,
    stderr: PathBuf,
}

impl JobLog {
    pub fn new(stdout: PathBuf, stderr: PathBuf) -> Self {
        Self { stdout, stderr }
    }

    /// Log streams stored directly in `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(STDOUT_LOG_NAME), dir.join(STDERR_LOG_NAME))
    }

    pub fn stdout_path(&self) -> &Path {
        &self.stdout
    }

    pub fn stderr_path(&self) -> &Path {
        &self.stderr
    }

    /// Open the stdout stream for appending, creating it if needed.
    pub fn open_stdout(&self) -> Result<fs::File, PipelineError> {
        open_append(&self.stdout)
    }

    /// Open the stderr stream for appending, creating it if needed.
    pub fn open_stderr(&self) -> Result<fs::File, PipelineError> {
        open_append(&self.stderr)
    }

    /// Append one line to the stdout stream.
    pub fn line(&self, text: &str) -> Result<(), PipelineError> {
        let mut file = self.open_stdout()?;
        writeln!(file, "{text}").map_err(|e| PipelineError::io(&self.stdout, e))
    }
}

fn open_append(path: &Path) -> Result<fs::File, PipelineError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| PipelineError::io(path, e))
}

/// Root directory holding every job directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobRoot {
    root: PathBuf,
}

impl JobRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Create the root if it does not exist.
    pub fn ensure(&self) -> Result<&Path, PipelineError> {
        fs::create_dir_all(&self.root).map_err(|e| PipelineError::io(&self.root, e))?;
        Ok(&self.root)
    }

    /// Delete every job and recreate an empty root holding only `.gitkeep`.
    pub fn clear(&self) -> Result<(), PipelineError> {
        if self.root.exists() {
            fs::remove_dir_all(&self.root).map_err(|e| PipelineError::io(&self.root, e))?;
        }
        self.ensure()?;
        let keep = self.root.join(KEEP_FILE_NAME);
        fs::write(&keep, "").map_err(|e| PipelineError::io(keep, e))
    }

    /// Job directory path, not created.
    pub fn job_dir(&self, job_id: &str) -> PathBuf {
        self.root.join(job_id)
    }

    pub fn ensure_job_dir(&self, job_id: &str) -> Result<PathBuf, PipelineError> {
        let dir = self.job_dir(job_id);
        fs::create_dir_all(&dir).map_err(|e| PipelineError::io(&dir, e))?;
        Ok(dir)
    }

    /// Where an uploaded input named `filename` is stored. Creates the job directory.
    pub fn input_image_path(&self, job_id: &str, filename: &str) -> Result<PathBuf, PipelineError> {
        Ok(self.ensure_job_dir(job_id)?.join(filename))
    }

    pub fn scene_ply_path(&self, job_id: &str) -> PathBuf {
        self.job_dir(job_id).join(SCENE_PLY_NAME)
    }

    pub fn metadata_path(&self, job_id: &str) -> PathBuf {
        self.job_dir(job_id).join(METADATA_FILE_NAME)
    }

    pub fn status_path(&self, job_id: &str) -> PathBuf {
        self.job_dir(job_id).join(STATUS_FILE_NAME)
    }

    pub fn stdout_log_path(&self, job_id: &str) -> PathBuf {
        self.job_dir(job_id).join(STDOUT_LOG_NAME)
    }

    pub fn stderr_log_path(&self, job_id: &str) -> PathBuf {
        self.job_dir(job_id).join(STDERR_LOG_NAME)
    }

    pub fn job_log(&self, job_id: &str) -> JobLog {
        JobLog::in_dir(&self.job_dir(job_id))
    }

    pub fn write_status(&self, job_id: &str, status: &JobStatus) -> Result<(), PipelineError> {
        self.ensure_job_dir(job_id)?;
        let path = self.status_path(job_id);
        let json = serde_json::to_string_pretty(status)?;
        fs::write(&path, json).map_err(|e| PipelineError::io(path, e))
    }

    /// Read a job's status. Missing or malformed records yield `None`.
    pub fn read_status(&self, job_id: &str) -> Option<JobStatus> {
        let path = self.status_path(job_id);
        let text = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&text) {
            Ok(status) => Some(status),
            Err(e) => {
                warn!("Malformed status record {}: {e}", path.display());
                None
            }
        }
    }

    /// Read a job's log streams. `None` if the job has no stdout log.
    pub fn read_logs(&self, job_id: &str) -> Option<JobLogs> {
        let stdout = fs::read_to_string(self.stdout_log_path(job_id)).ok()?;
        let stderr = fs::read_to_string(self.stderr_log_path(job_id)).unwrap_or_default();
        Some(JobLogs { stdout, stderr })
    }
}
