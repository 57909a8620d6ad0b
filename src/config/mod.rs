//! Configuration for the stardust ETL run.

mod vars;

pub use vars::interpolate;

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::error::ConfigError;
use crate::error::{ReadFileSnafu, YamlParseSnafu};

/// Configuration for the two input datasets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Root of the song-catalog JSON tree (supports S3, GCS, local).
    pub song_data: String,
    /// Root of the activity-log JSON tree (supports S3, GCS, local).
    pub log_data: String,
    /// Storage options for input storage (credentials, region, etc.)
    #[serde(default)]
    pub storage_options: HashMap<String, String>,
}

/// Configuration for the output warehouse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Root of the output table tree (supports S3, GCS, local).
    pub path: String,
    /// Parquet compression codec.
    #[serde(default)]
    pub compression: ParquetCompression,
    /// Storage options for output storage (credentials, region, etc.)
    #[serde(default)]
    pub storage_options: HashMap<String, String>,
}

/// Parquet compression codec.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParquetCompression {
    #[default]
    Snappy,
    Zstd,
    Uncompressed,
}

impl ParquetCompression {
    /// Codec name in the form the engine's Parquet writer options expect.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParquetCompression::Snappy => "snappy",
            ParquetCompression::Zstd => "zstd(3)",
            ParquetCompression::Uncompressed => "uncompressed",
        }
    }
}

/// Tuning knobs passed through to the query engine session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Target partition count for engine parallelism. 0 = engine default.
    #[serde(default)]
    pub target_partitions: usize,
    /// Number of records per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            target_partitions: 0,
            batch_size: default_batch_size(),
        }
    }
}

fn default_batch_size() -> usize {
    8192
}

/// Main configuration for stardust.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Input configuration.
    pub input: InputConfig,
    /// Output configuration.
    pub output: OutputConfig,
    /// Engine configuration.
    #[serde(default)]
    pub engine: EngineConfig,
}

impl Config {
    /// Load configuration from a file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).context(ReadFileSnafu)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        // Interpolate environment variables so credentials stay out of the file
        let interpolated = interpolate(contents)?;

        let config: Config = serde_yaml::from_str(&interpolated).context(YamlParseSnafu)?;
        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration, failing fast on missing locations.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input.song_data.is_empty() {
            return Err(ConfigError::EmptySongDataPath);
        }
        if self.input.log_data.is_empty() {
            return Err(ConfigError::EmptyLogDataPath);
        }
        if self.output.path.is_empty() {
            return Err(ConfigError::EmptyOutputPath);
        }
        if self.engine.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        Ok(())
    }
}
