//! Error types for the stardust batch ETL.

use snafu::prelude::*;

use datafusion::error::DataFusionError;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[snafu(display("Failed to read configuration file"))]
    ReadFile { source: std::io::Error },

    /// Environment variable interpolation failed.
    #[snafu(display("Environment variable interpolation failed:\n{message}"))]
    EnvInterpolation { message: String },

    /// Failed to parse YAML configuration.
    #[snafu(display("Failed to parse YAML configuration"))]
    YamlParse { source: serde_yaml::Error },

    /// Song data path is empty.
    #[snafu(display("input.song_data cannot be empty"))]
    EmptySongDataPath,

    /// Log data path is empty.
    #[snafu(display("input.log_data cannot be empty"))]
    EmptyLogDataPath,

    /// Output path is empty.
    #[snafu(display("output.path cannot be empty"))]
    EmptyOutputPath,

    /// Engine batch size is zero.
    #[snafu(display("engine.batch_size must be greater than zero"))]
    ZeroBatchSize,
}

/// Errors that can occur during storage operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StorageError {
    /// Invalid storage URL format.
    #[snafu(display("Invalid storage URL: {url}"))]
    InvalidUrl { url: String },

    /// Object store operation failed.
    #[snafu(display("Storage operation failed: {source}"))]
    ObjectStore { source: object_store::Error },

    /// IO error during storage operations.
    #[snafu(display("IO error: {source}"))]
    Io { source: std::io::Error },

    /// S3 configuration error.
    #[snafu(display("S3 configuration error: {source}"))]
    S3Config { source: object_store::Error },

    /// GCS configuration error.
    #[snafu(display("GCS configuration error: {source}"))]
    GcsConfig { source: object_store::Error },
}

impl StorageError {
    /// Check if this error represents a "not found" condition.
    pub fn is_not_found(&self) -> bool {
        match self {
            StorageError::ObjectStore { source } => {
                matches!(source, object_store::Error::NotFound { .. })
            }
            _ => false,
        }
    }
}

/// Top-level errors for the ETL run.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum EtlError {
    /// Configuration error.
    #[snafu(display("Configuration error: {source}"))]
    Config { source: ConfigError },

    /// Storage error.
    #[snafu(display("Storage error: {source}"))]
    Storage { source: StorageError },

    /// Query engine error.
    #[snafu(display("Query engine error: {source}"))]
    Engine { source: DataFusionError },
}

impl From<ConfigError> for EtlError {
    fn from(source: ConfigError) -> Self {
        EtlError::Config { source }
    }
}

impl From<StorageError> for EtlError {
    fn from(source: StorageError) -> Self {
        EtlError::Storage { source }
    }
}

impl From<DataFusionError> for EtlError {
    fn from(source: DataFusionError) -> Self {
        EtlError::Engine { source }
    }
}
