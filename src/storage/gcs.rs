//! GCS storage backend implementation.

use std::sync::Arc;

use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::path::Path;
use object_store::{ObjectStore, RetryConfig};
use snafu::prelude::*;

use crate::error::{GcsConfigSnafu, StorageError};

use super::{BackendConfig, StorageOptions, StorageProvider};

/// GCS storage configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcsConfig {
    pub bucket: String,
    pub key: Option<Path>,
}

impl StorageProvider {
    pub(super) fn construct_gcs(
        config: GcsConfig,
        options: StorageOptions,
    ) -> Result<Self, StorageError> {
        let mut builder = GoogleCloudStorageBuilder::from_env().with_bucket_name(&config.bucket);

        for (key, value) in &options {
            builder = builder.with_config(key.parse().context(GcsConfigSnafu)?, value.clone());
        }

        builder = builder.with_retry(RetryConfig::default());

        let canonical_url = match &config.key {
            Some(key) => format!("gs://{}/{}", config.bucket, key),
            None => format!("gs://{}", config.bucket),
        };

        let object_store: Arc<dyn ObjectStore> =
            Arc::new(builder.build().context(GcsConfigSnafu)?);

        Ok(Self {
            config: BackendConfig::Gcs(config),
            object_store,
            canonical_url,
        })
    }
}
