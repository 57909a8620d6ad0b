//! Local filesystem storage backend implementation.

use std::sync::Arc;

use object_store::local::LocalFileSystem;
use object_store::ObjectStore;
use snafu::prelude::*;

use crate::error::{IoSnafu, ObjectStoreSnafu, StorageError};

use super::{BackendConfig, StorageProvider};

/// Local filesystem configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalConfig {
    pub path: String,
}

impl StorageProvider {
    pub(super) async fn construct_local(config: LocalConfig) -> Result<Self, StorageError> {
        tokio::fs::create_dir_all(&config.path)
            .await
            .context(IoSnafu)?;

        // Canonicalize so the engine-facing URL is stable regardless of how
        // the path was written in the config.
        let canonical_path = tokio::fs::canonicalize(&config.path)
            .await
            .context(IoSnafu)?;

        let object_store: Arc<dyn ObjectStore> = Arc::new(
            LocalFileSystem::new_with_prefix(&canonical_path).context(ObjectStoreSnafu)?,
        );

        let canonical_url = format!("file://{}", canonical_path.display());

        Ok(Self {
            config: BackendConfig::Local(LocalConfig {
                path: canonical_path.display().to_string(),
            }),
            object_store,
            canonical_url,
        })
    }
}
