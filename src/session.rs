//! Engine session bootstrap.
//!
//! Builds the single DataFusion session used for the whole run and registers
//! the object stores for the input and output roots on it. The session is
//! constructed once in the entry point and passed by reference into each
//! transform stage; there is no implicit global handle.

use datafusion::execution::context::SessionContext;
use datafusion::prelude::SessionConfig;
use url::Url;

use crate::config::Config;
use crate::error::{EtlError, StorageError};
use crate::storage::{StorageProvider, StorageProviderRef};

/// The engine session plus the resolved dataset locations for one run.
pub struct EtlSession {
    ctx: SessionContext,
    output: StorageProviderRef,
    song_data_url: String,
    log_data_url: String,
    output_root: String,
}

impl EtlSession {
    /// Build the session: one engine context, all stores registered.
    pub async fn new(config: &Config) -> Result<Self, EtlError> {
        let mut session_config = SessionConfig::new().with_batch_size(config.engine.batch_size);
        if config.engine.target_partitions > 0 {
            session_config = session_config.with_target_partitions(config.engine.target_partitions);
        }
        let ctx = SessionContext::new_with_config(session_config);

        let song_data = StorageProvider::for_url_with_options(
            &config.input.song_data,
            config.input.storage_options.clone(),
        )
        .await?;
        register_store(&ctx, &song_data)?;

        let log_data = StorageProvider::for_url_with_options(
            &config.input.log_data,
            config.input.storage_options.clone(),
        )
        .await?;
        register_store(&ctx, &log_data)?;

        let output = StorageProvider::for_url_with_options(
            &config.output.path,
            config.output.storage_options.clone(),
        )
        .await?;
        register_store(&ctx, &output)?;

        let song_data_url = dir_url(song_data.canonical_url());
        let log_data_url = dir_url(log_data.canonical_url());
        let output_root = dir_url(output.canonical_url());

        Ok(Self {
            ctx,
            output: std::sync::Arc::new(output),
            song_data_url,
            log_data_url,
            output_root,
        })
    }

    /// The engine handle.
    pub fn ctx(&self) -> &SessionContext {
        &self.ctx
    }

    /// Absolute URL of the song-catalog root, `/`-terminated.
    pub fn song_data_url(&self) -> &str {
        &self.song_data_url
    }

    /// Absolute URL of the activity-log root, `/`-terminated.
    pub fn log_data_url(&self) -> &str {
        &self.log_data_url
    }

    /// Absolute directory URL for one output table, `/`-terminated.
    pub fn output_url(&self, table: &str) -> String {
        format!("{}{}/", self.output_root, table)
    }

    /// Purge an output table's prefix so the coming write fully replaces it.
    pub async fn overwrite_table(&self, table: &str) -> Result<usize, StorageError> {
        self.output.purge_prefix(table).await
    }
}

/// Register a provider's store on the context under its base URL.
///
/// Local filesystem paths resolve through the engine's built-in store and
/// need no registration.
fn register_store(ctx: &SessionContext, provider: &StorageProvider) -> Result<(), StorageError> {
    if let Some(base) = provider.register_url() {
        let url = Url::parse(&base).map_err(|_| StorageError::InvalidUrl { url: base.clone() })?;
        ctx.register_object_store(&url, provider.object_store());
    }
    Ok(())
}

/// Normalize a location URL to a `/`-terminated directory URL.
fn dir_url(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EngineConfig, InputConfig, OutputConfig};
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn local_config(root: &std::path::Path) -> Config {
        Config {
            input: InputConfig {
                song_data: root.join("song_data").display().to_string(),
                log_data: root.join("log_data").display().to_string(),
                storage_options: HashMap::new(),
            },
            output: OutputConfig {
                path: root.join("warehouse").display().to_string(),
                compression: Default::default(),
                storage_options: HashMap::new(),
            },
            engine: EngineConfig::default(),
        }
    }

    #[tokio::test]
    async fn test_session_resolves_directory_urls() {
        let temp_dir = TempDir::new().unwrap();
        let session = EtlSession::new(&local_config(temp_dir.path())).await.unwrap();

        assert!(session.song_data_url().starts_with("file:///"));
        assert!(session.song_data_url().ends_with("/song_data/"));
        assert!(session.log_data_url().ends_with("/log_data/"));
        assert!(session.output_url("songs").ends_with("/warehouse/songs/"));
    }

    #[tokio::test]
    async fn test_overwrite_table_purges_only_that_table() {
        let temp_dir = TempDir::new().unwrap();
        let session = EtlSession::new(&local_config(temp_dir.path())).await.unwrap();

        let warehouse = temp_dir.path().join("warehouse");
        std::fs::create_dir_all(warehouse.join("songs")).unwrap();
        std::fs::create_dir_all(warehouse.join("users")).unwrap();
        std::fs::write(warehouse.join("songs/a.parquet"), b"x").unwrap();
        std::fs::write(warehouse.join("users/b.parquet"), b"x").unwrap();

        let deleted = session.overwrite_table("songs").await.unwrap();

        assert_eq!(deleted, 1);
        assert!(!warehouse.join("songs/a.parquet").exists());
        assert!(warehouse.join("users/b.parquet").exists());
    }
}
