//! S3 storage backend implementation.

use std::sync::Arc;

use object_store::aws::AmazonS3Builder;
use object_store::path::Path;
use object_store::{ObjectStore, RetryConfig};
use snafu::prelude::*;

use crate::error::{S3ConfigSnafu, StorageError};

use super::{BackendConfig, StorageOptions, StorageProvider};

/// S3 storage configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Config {
    pub bucket: String,
    pub key: Option<Path>,
}

impl StorageProvider {
    pub(super) fn construct_s3(
        config: S3Config,
        options: StorageOptions,
    ) -> Result<Self, StorageError> {
        let mut builder = AmazonS3Builder::from_env().with_bucket_name(&config.bucket);

        for (key, value) in &options {
            builder = builder.with_config(key.parse().context(S3ConfigSnafu)?, value.clone());
        }

        builder = builder.with_retry(RetryConfig::default());

        let canonical_url = match &config.key {
            Some(key) => format!("s3://{}/{}", config.bucket, key),
            None => format!("s3://{}", config.bucket),
        };

        let object_store: Arc<dyn ObjectStore> =
            Arc::new(builder.build().context(S3ConfigSnafu)?);

        Ok(Self {
            config: BackendConfig::S3(config),
            object_store,
            canonical_url,
        })
    }
}
