//! Multi-backend storage abstraction.
//!
//! Provides a unified interface for the object stores the pipeline reads
//! from and writes to (S3, GCS, local filesystem). The engine does the bulk
//! I/O itself; this layer exists to construct the concrete stores, hand
//! them to the engine, and purge output prefixes for overwrite semantics.

mod gcs;
mod local;
mod s3;
mod url_parser;

pub use gcs::GcsConfig;
pub use local::LocalConfig;
pub use s3::S3Config;
pub use url_parser::{BackendConfig, StorageOptions};

use std::sync::Arc;

use futures::TryStreamExt;
use object_store::path::Path;
use object_store::{ObjectMeta, ObjectStore};
use snafu::prelude::*;
use tracing::debug;

use crate::error::{ObjectStoreSnafu, StorageError};

/// A reference-counted storage provider.
pub type StorageProviderRef = Arc<StorageProvider>;

/// Storage provider that abstracts over different storage backends.
#[derive(Clone)]
pub struct StorageProvider {
    pub(crate) config: BackendConfig,
    pub(crate) object_store: Arc<dyn ObjectStore>,
    pub(crate) canonical_url: String,
}

impl std::fmt::Debug for StorageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StorageProvider<{}>", self.canonical_url)
    }
}

impl StorageProvider {
    /// Create a storage provider for the given URL with storage options.
    pub async fn for_url_with_options(
        url: &str,
        options: StorageOptions,
    ) -> Result<Self, StorageError> {
        let config = BackendConfig::parse_url(url)?;

        match config {
            BackendConfig::S3(config) => Self::construct_s3(config, options),
            BackendConfig::Gcs(config) => Self::construct_gcs(config, options),
            BackendConfig::Local(config) => Self::construct_local(config).await,
        }
    }

    /// The underlying object store.
    pub fn object_store(&self) -> Arc<dyn ObjectStore> {
        Arc::clone(&self.object_store)
    }

    /// The backend configuration.
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Absolute URL of the location this provider points at.
    pub fn canonical_url(&self) -> &str {
        &self.canonical_url
    }

    /// The scheme://authority URL the engine should register this provider's
    /// store under, or `None` for backends the engine resolves natively.
    pub fn register_url(&self) -> Option<String> {
        self.config.register_url()
    }

    /// Qualify a path with the configured key prefix.
    fn qualify_path(&self, path: &Path) -> Path {
        match self.config.key() {
            Some(prefix) => prefix.parts().chain(path.parts()).collect(),
            None => path.clone(),
        }
    }

    /// Delete every object under a prefix relative to this provider's root.
    ///
    /// This is the overwrite primitive: purging a table's prefix before the
    /// engine writes new partitions makes each run idempotent.
    pub async fn purge_prefix(&self, prefix: &str) -> Result<usize, StorageError> {
        let full_prefix = self.qualify_path(&Path::from(prefix));

        let objects: Vec<ObjectMeta> = match self
            .object_store
            .list(Some(&full_prefix))
            .try_collect()
            .await
        {
            Ok(objects) => objects,
            // Nothing to purge on the first run
            Err(object_store::Error::NotFound { .. }) => Vec::new(),
            Err(source) => return Err(StorageError::ObjectStore { source }),
        };

        for object in &objects {
            self.object_store
                .delete(&object.location)
                .await
                .context(ObjectStoreSnafu)?;
        }

        if !objects.is_empty() {
            debug!(
                prefix = %full_prefix,
                objects = objects.len(),
                "Purged output prefix"
            );
        }

        Ok(objects.len())
    }
}
