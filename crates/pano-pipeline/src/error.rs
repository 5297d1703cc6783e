//! Pipeline error types and their user-facing categories.

use std::path::PathBuf;

use pano_config::ConfigError;
use pano_cubemap::ProjectionError;
use pano_stitch::StitchError;

/// Broad failure category reported for a job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad image dimensions or out-of-range settings.
    Validation,
    /// Missing or unreadable input, point-cloud, or job file.
    Input,
    /// An external tool was missing, failed, or produced no output.
    ExternalTool,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Projection(#[from] ProjectionError),

    #[error(transparent)]
    Stitch(#[from] StitchError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The tool binary could not be started.
    #[error("{tool} CLI not found: tried '{cli}'. Set {env_var} to an absolute path.")]
    ToolLaunch {
        tool: &'static str,
        cli: String,
        env_var: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// The tool exited unsuccessfully. `None` if it was killed by a signal.
    #[error("{tool} exited with code {}", .code.map_or_else(|| "none".to_string(), |c| c.to_string()))]
    ToolFailed { tool: &'static str, code: Option<i32> },

    /// The tool succeeded but did not write its output file.
    #[error("{tool} finished but output {} not found", path.display())]
    ToolOutputMissing { tool: &'static str, path: PathBuf },

    /// A job file could not be read, written, or copied.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode scene metadata: {0}")]
    Metadata(#[from] serde_json::Error),

    /// The worker thread for a job could not be started.
    #[error("failed to start job thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// The worker thread for a job panicked.
    #[error("job thread for {0} panicked")]
    ThreadPanic(String),
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Projection(e) if e.is_validation() => ErrorKind::Validation,
            PipelineError::Projection(_) => ErrorKind::Input,
            PipelineError::Stitch(StitchError::Ply { .. }) => ErrorKind::Input,
            PipelineError::Stitch(_) | PipelineError::Config(_) => ErrorKind::Validation,
            PipelineError::ToolLaunch { .. }
            | PipelineError::ToolFailed { .. }
            | PipelineError::ToolOutputMissing { .. } => ErrorKind::ExternalTool,
            PipelineError::Io { .. }
            | PipelineError::Metadata(_)
            | PipelineError::Spawn(_)
            | PipelineError::ThreadPanic(_) => ErrorKind::Input,
        }
    }
}
