//! Configuration system for the panorama splat pipeline.
//!
//! Provides runtime-configurable settings that persist to disk as RON files.
//! Supports CLI overrides via clap, reload detection, range validation, and
//! forward/backward compatible serialization.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{Config, DebugConfig, PipelineConfig, StorageConfig, ToolsConfig};
pub use error::ConfigError;
