//! Platform directory resolution.
//!
//! Config, data and log locations follow OS conventions (XDG on Linux, Known
//! Folders on Windows, Library on macOS). Jobs live under the data directory
//! unless the config names another job root.

use std::path::{Path, PathBuf};
use std::{fmt, io};

/// Errors that can occur during platform operations.
#[derive(Debug)]
pub enum PlatformError {
    /// The OS did not provide a configuration directory.
    NoConfigDir,
    /// Directory creation failed.
    Io(io::Error),
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoConfigDir => write!(f, "could not determine OS configuration directory"),
            Self::Io(e) => write!(f, "platform I/O error: {e}"),
        }
    }
}

impl std::error::Error for PlatformError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for PlatformError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// OS-specific directories of the `pano-splat` application.
#[derive(Debug, Clone)]
pub struct PlatformDirs {
    /// Holds `config.ron`.
    pub config_dir: PathBuf,
    /// Persistent data. The default job root is `<data_dir>/jobs`.
    pub data_dir: PathBuf,
    /// JSON log files written by debug builds.
    pub log_dir: PathBuf,
}

const APP_NAME: &str = "pano-splat";

impl PlatformDirs {
    /// Resolve platform-specific directories without creating them on disk.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::NoConfigDir`] if the OS does not expose a
    /// configuration directory.
    pub fn resolve() -> Result<Self, PlatformError> {
        let config_base = dirs::config_dir().ok_or(PlatformError::NoConfigDir)?;
        let app_config = config_base.join(APP_NAME);

        let data_dir = dirs::data_dir()
            .map(|d| d.join(APP_NAME))
            .unwrap_or_else(|| app_config.join("data"));

        Ok(Self {
            config_dir: app_config.join("config"),
            data_dir,
            log_dir: app_config.join("logs"),
        })
    }

    /// Resolve directories and create them on disk.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] if resolution or directory creation fails.
    pub fn resolve_and_create() -> Result<Self, PlatformError> {
        let dirs = Self::resolve()?;
        dirs.create_dirs()?;
        Ok(dirs)
    }

    /// Resolve directories rooted under a custom base path.
    pub fn resolve_with_root(root: &Path) -> Self {
        let app_dir = root.join(APP_NAME);
        Self {
            config_dir: app_dir.join("config"),
            data_dir: app_dir.join("data"),
            log_dir: app_dir.join("logs"),
        }
    }

    /// Job root used when neither the CLI nor the config name one.
    pub fn default_job_root(&self) -> PathBuf {
        self.data_dir.join("jobs")
    }

    /// Create all directories on disk.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Io`] if any directory cannot be created.
    pub fn create_dirs(&self) -> Result<(), PlatformError> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(&self.log_dir)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_dirs_resolve() {
        let dirs = PlatformDirs::resolve().expect("PlatformDirs::resolve() failed");
        assert!(dirs.config_dir.is_absolute(), "config_dir is not absolute");
        assert!(dirs.data_dir.is_absolute(), "data_dir is not absolute");
        assert!(dirs.log_dir.is_absolute(), "log_dir is not absolute");
        assert!(dirs.config_dir.ends_with("pano-splat/config"));
    }

    #[test]
    fn test_directory_creation() {
        let tmp = tempfile::tempdir().unwrap();
        let dirs = PlatformDirs::resolve_with_root(tmp.path());
        dirs.create_dirs().expect("create_dirs failed for temp root");

        assert!(dirs.config_dir.is_dir(), "config_dir was not created");
        assert!(dirs.data_dir.is_dir(), "data_dir was not created");
        assert!(dirs.log_dir.is_dir(), "log_dir was not created");
    }

    #[test]
    fn test_debug_log_file_lands_in_created_log_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let dirs = PlatformDirs::resolve_with_root(tmp.path());
        dirs.create_dirs().unwrap();

        pano_log::init_logging(Some(&dirs.log_dir), true, None);
        tracing::info!("platform test");
        assert!(dirs.log_dir.join(pano_log::LOG_FILE_NAME).is_file());
    }

    #[test]
    fn test_default_job_root_is_under_data_dir() {
        let dirs = PlatformDirs::resolve_with_root(Path::new("/srv"));
        assert_eq!(
            dirs.default_job_root(),
            PathBuf::from("/srv/pano-splat/data/jobs")
        );
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            PlatformError::NoConfigDir.to_string(),
            "could not determine OS configuration directory"
        );
        let io = PlatformError::from(io::Error::other("denied"));
        assert_eq!(io.to_string(), "platform I/O error: denied");
    }
}
