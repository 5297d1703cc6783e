//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Application directory name used under the OS data directory.
const APP_NAME: &str = "pano-splat";

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Stitching pipeline settings.
    pub pipeline: PipelineConfig,
    /// External tool settings.
    pub tools: ToolsConfig,
    /// Job storage settings.
    pub storage: StorageConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Stitching pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Requested per-face field of view in degrees. Clamped to \[100, 110\]
    /// before projection.
    pub overscan_fov_deg: f64,
    /// JPEG quality for generated face images (1 - 100).
    pub jpeg_quality: u8,
    /// Cap on overlap candidates per side of an alignment pair.
    pub overlap_max_samples: usize,
    /// Cap on points per face when computing the global bounding box.
    pub normalize_max_samples: usize,
    /// Lower bound for the per-face depth scale correction.
    pub min_scale: f64,
    /// Upper bound for the per-face depth scale correction.
    pub max_scale: f64,
    /// Seed for subsampling. `None` draws from OS entropy.
    pub sample_seed: Option<u64>,
}

/// External tool configuration.
///
/// Environment variables (`ML_SHARP_CLI`, `SPLAT_MERGE_CLI`) take precedence
/// over these values when set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ToolsConfig {
    /// Reconstruction tool command.
    pub reconstruct_cli: Option<String>,
    /// Merge tool command.
    pub merge_cli: Option<String>,
}

/// Job storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory holding one subdirectory per job. `None` resolves to
    /// the OS data directory.
    pub job_root: Option<PathBuf>,
    /// Wipe the job root when the process starts.
    pub clear_on_startup: bool,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

// --- Default implementations ---

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            overscan_fov_deg: 105.0,
            jpeg_quality: 95,
            overlap_max_samples: 50_000,
            normalize_max_samples: 200_000,
            min_scale: 0.5,
            max_scale: 2.0,
            sample_seed: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            job_root: None,
            clear_on_startup: true,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl StorageConfig {
    /// The configured job root, or `<data_dir>/pano-splat/jobs`.
    ///
    /// Falls back to a relative `.data` directory when the OS exposes no data
    /// directory.
    pub fn resolved_job_root(&self) -> PathBuf {
        match &self.job_root {
            Some(root) => root.clone(),
            None => dirs::data_dir()
                .map(|d| d.join(APP_NAME).join("jobs"))
                .unwrap_or_else(|| PathBuf::from(".data")),
        }
    }
}

// --- Validation ---

impl Config {
    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.pipeline;
        if !(p.overscan_fov_deg > 0.0 && p.overscan_fov_deg < 180.0) {
            return Err(ConfigError::Invalid {
                field: "pipeline.overscan_fov_deg",
                reason: format!("{} is not in (0, 180)", p.overscan_fov_deg),
            });
        }
        if !(1..=100).contains(&p.jpeg_quality) {
            return Err(ConfigError::Invalid {
                field: "pipeline.jpeg_quality",
                reason: format!("{} is not in 1..=100", p.jpeg_quality),
            });
        }
        if p.overlap_max_samples == 0 {
            return Err(ConfigError::Invalid {
                field: "pipeline.overlap_max_samples",
                reason: "must be greater than zero".to_string(),
            });
        }
        if p.normalize_max_samples == 0 {
            return Err(ConfigError::Invalid {
                field: "pipeline.normalize_max_samples",
                reason: "must be greater than zero".to_string(),
            });
        }
        if !(p.min_scale > 0.0 && p.min_scale <= p.max_scale && p.max_scale.is_finite()) {
            return Err(ConfigError::Invalid {
                field: "pipeline.min_scale",
                reason: format!(
                    "scale range [{}, {}] must be positive and ordered",
                    p.min_scale, p.max_scale
                ),
            });
        }
        Ok(())
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Re-read `config.ron`: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join("config.ron");
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(ron_str.contains("overscan_fov_deg: 105.0"));
        assert!(ron_str.contains("overlap_max_samples: 50000"));
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.tools.merge_cli = Some("splat-transform".to_string());
        config.pipeline.sample_seed = Some(7);
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_section_uses_default() {
        let ron_str = "(pipeline: (overscan_fov_deg: 100.0))";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.pipeline.overscan_fov_deg, 100.0);
        assert_eq!(config.pipeline.jpeg_quality, 95);
        assert_eq!(config.storage, StorageConfig::default());
    }

    #[test]
    fn test_extra_field_ignored() {
        let result: Result<Config, _> = ron::from_str("(future_setting: true)");
        assert!(result.is_ok());
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_fov() {
        let mut config = Config::default();
        config.pipeline.overscan_fov_deg = 180.0;
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "pipeline.overscan_fov_deg",
                ..
            }
        ));
    }

    #[test]
    fn test_validate_rejects_inverted_scale_range() {
        let mut config = Config::default();
        config.pipeline.min_scale = 3.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_sample_caps() {
        let mut config = Config::default();
        config.pipeline.overlap_max_samples = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_explicit_job_root_wins() {
        let storage = StorageConfig {
            job_root: Some(PathBuf::from("/tmp/jobs")),
            clear_on_startup: false,
        };
        assert_eq!(storage.resolved_job_root(), PathBuf::from("/tmp/jobs"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.pipeline.overscan_fov_deg = 108.0;
        config.tools.reconstruct_cli = Some("/opt/sharp/bin/sharp".to_string());

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_or_create_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join("config.ron").exists());
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.debug.log_level = "debug".to_string();
        modified.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert_eq!(result.unwrap().debug.log_level, "debug");
    }

    #[test]
    fn test_reload_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        assert!(config.reload(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let result: Result<Config, _> = ron::from_str("{{not valid}}");
        assert!(result.is_err());
    }
}
