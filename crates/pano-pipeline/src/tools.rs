//! External reconstruction and merge tools.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, info, warn};

use crate::storage::JobLog;
use crate::PipelineError;

/// Environment variable overriding the reconstruction CLI.
pub const RECONSTRUCT_CLI_ENV: &str = "ML_SHARP_CLI";

/// Reconstruction CLI used when nothing else is configured.
pub const DEFAULT_RECONSTRUCT_CLI: &str = "sharp";

/// Environment variable overriding the merge CLI.
pub const MERGE_CLI_ENV: &str = "SPLAT_MERGE_CLI";

/// Merge CLI looked up on `PATH` when nothing else is configured.
pub const DEFAULT_MERGE_CLI: &str = "splat-transform";

const RECONSTRUCT_TOOL_NAME: &str = "ml-sharp";

/// Turns one image into one point-cloud file.
pub trait ReconstructionTool: Send + Sync {
    /// Reconstruct `input` into `output`, running inside `workdir` and
    /// appending tool output to `log`. Succeeds only if `output` exists.
    fn reconstruct(
        &self,
        input: &Path,
        output: &Path,
        workdir: &Path,
        log: &JobLog,
    ) -> Result<(), PipelineError>;
}

/// Combines several point-cloud files into one.
pub trait MergeTool: Send + Sync {
    /// Merge `inputs` into `output`. Returns `false` on any failure; the
    /// caller falls back to serving the inputs as layers.
    fn merge(&self, inputs: &[PathBuf], output: &Path, log: &JobLog) -> bool;
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Pick the reconstruction CLI: explicit override, then `env`, then config,
/// then [`DEFAULT_RECONSTRUCT_CLI`].
pub fn resolve_reconstruct_cli(
    explicit: Option<&str>,
    env: Option<String>,
    configured: Option<&str>,
) -> String {
    explicit
        .map(str::to_string)
        .or(env)
        .or_else(|| configured.map(str::to_string))
        .unwrap_or_else(|| DEFAULT_RECONSTRUCT_CLI.to_string())
}

/// Pick the merge CLI: `env`, then config, then [`DEFAULT_MERGE_CLI`] if it
/// is found on `path_var`. `None` means no merge tool is available.
pub fn resolve_merge_cli(
    env: Option<String>,
    configured: Option<&str>,
    path_var: Option<std::ffi::OsString>,
) -> Option<String> {
    env.or_else(|| configured.map(str::to_string)).or_else(|| {
        find_on_path(DEFAULT_MERGE_CLI, path_var?)
            .map(|p| p.to_string_lossy().into_owned())
    })
}

/// First file named `name` in the directories of a `PATH`-style list.
pub fn find_on_path(name: &str, path_var: std::ffi::OsString) -> Option<PathBuf> {
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// Reconstruction tool driven through its command line:
/// `<cli> --input <image> --output <ply>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CliReconstructionTool {
    cli: String,
}

impl CliReconstructionTool {
    pub fn new(cli: impl Into<String>) -> Self {
        Self { cli: cli.into() }
    }

    /// Resolve the CLI from an explicit override, `ML_SHARP_CLI`, and config.
    pub fn resolve(explicit: Option<&str>, configured: Option<&str>) -> Self {
        Self::new(resolve_reconstruct_cli(
            explicit,
            env_value(RECONSTRUCT_CLI_ENV),
            configured,
        ))
    }

    pub fn cli(&self) -> &str {
        &self.cli
    }
}

impl ReconstructionTool for CliReconstructionTool {
    fn reconstruct(
        &self,
        input: &Path,
        output: &Path,
        workdir: &Path,
        log: &JobLog,
    ) -> Result<(), PipelineError> {
        debug!("Running {} on {}", self.cli, input.display());
        let status = Command::new(&self.cli)
            .arg("--input")
            .arg(input)
            .arg("--output")
            .arg(output)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log.open_stdout()?))
            .stderr(Stdio::from(log.open_stderr()?))
            .status()
            .map_err(|source| PipelineError::ToolLaunch {
                tool: RECONSTRUCT_TOOL_NAME,
                cli: self.cli.clone(),
                env_var: RECONSTRUCT_CLI_ENV,
                source,
            })?;

        if !status.success() {
            return Err(PipelineError::ToolFailed {
                tool: RECONSTRUCT_TOOL_NAME,
                code: status.code(),
            });
        }
        if !output.exists() {
            return Err(PipelineError::ToolOutputMissing {
                tool: RECONSTRUCT_TOOL_NAME,
                path: output.to_path_buf(),
            });
        }
        Ok(())
    }
}

/// Merge tool driven through its command line: `<cli> -w <in>... <out>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CliMergeTool {
    cli: String,
}

impl CliMergeTool {
    pub fn new(cli: impl Into<String>) -> Self {
        Self { cli: cli.into() }
    }

    /// Resolve from `SPLAT_MERGE_CLI`, config, or `PATH`. `None` if no merge
    /// tool is available.
    pub fn resolve(configured: Option<&str>) -> Option<Self> {
        resolve_merge_cli(
            env_value(MERGE_CLI_ENV),
            configured,
            std::env::var_os("PATH"),
        )
        .map(Self::new)
    }

    pub fn cli(&self) -> &str {
        &self.cli
    }
}

impl MergeTool for CliMergeTool {
    fn merge(&self, inputs: &[PathBuf], output: &Path, log: &JobLog) -> bool {
        let (stdout, stderr) = match (log.open_stdout(), log.open_stderr()) {
            (Ok(out), Ok(err)) => (out, err),
            (Err(e), _) | (_, Err(e)) => {
                warn!("Cannot open job logs for merge: {e}");
                return false;
            }
        };
        let status = Command::new(&self.cli)
            .arg("-w")
            .args(inputs)
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .status();
        match status {
            Ok(status) if status.success() && output.exists() => {
                info!("Merged {} layers into {}", inputs.len(), output.display());
                true
            }
            Ok(status) => {
                warn!("Merge tool {} failed ({status}) or wrote no output", self.cli);
                false
            }
            Err(e) => {
                warn!("Merge tool {} could not be started: {e}", self.cli);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconstruct_resolution_order() {
        let env = || Some("/env/sharp".to_string());
        assert_eq!(
            resolve_reconstruct_cli(Some("/explicit"), env(), Some("/config")),
            "/explicit"
        );
        assert_eq!(resolve_reconstruct_cli(None, env(), Some("/config")), "/env/sharp");
        assert_eq!(resolve_reconstruct_cli(None, None, Some("/config")), "/config");
        assert_eq!(resolve_reconstruct_cli(None, None, None), "sharp");
    }

    #[test]
    fn test_merge_resolution_order() {
        assert_eq!(
            resolve_merge_cli(Some("/env/merge".into()), Some("/config"), None),
            Some("/env/merge".to_string())
        );
        assert_eq!(
            resolve_merge_cli(None, Some("/config"), None),
            Some("/config".to_string())
        );
        assert_eq!(resolve_merge_cli(None, None, None), None);
    }

    #[test]
    fn test_merge_found_on_path() {
        let dir = tempfile::tempdir().unwrap();
        let empty = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DEFAULT_MERGE_CLI), "").unwrap();
        let path_var = std::env::join_paths([empty.path(), dir.path()]).unwrap();

        let found = resolve_merge_cli(None, None, Some(path_var)).unwrap();
        assert_eq!(PathBuf::from(found), dir.path().join(DEFAULT_MERGE_CLI));

        let only_empty = std::env::join_paths([empty.path()]).unwrap();
        assert_eq!(resolve_merge_cli(None, None, Some(only_empty)), None);
    }

    #[test]
    fn test_missing_reconstruct_binary_is_launch_error() {
        let dir = tempfile::tempdir().unwrap();
        let log = JobLog::in_dir(dir.path());
        let tool = CliReconstructionTool::new("pano-splat-test-no-such-binary");
        let err = tool
            .reconstruct(
                &dir.path().join("face_0.jpg"),
                &dir.path().join("face_0.ply"),
                dir.path(),
                &log,
            )
            .unwrap_err();
        assert!(matches!(err, PipelineError::ToolLaunch { .. }), "{err}");
        assert_eq!(err.kind(), crate::ErrorKind::ExternalTool);
        assert!(err.to_string().contains("ML_SHARP_CLI"));
    }

    #[test]
    fn test_missing_merge_binary_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let log = JobLog::in_dir(dir.path());
        let tool = CliMergeTool::new("pano-splat-test-no-such-merge");
        assert!(!tool.merge(&[dir.path().join("a.ply")], &dir.path().join("out.ply"), &log));
    }
}
