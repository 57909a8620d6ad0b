//! URL parsing for storage backends.
//!
//! Extracts backend configuration from S3, GCS, and local filesystem URLs.

use std::collections::HashMap;
use std::sync::OnceLock;

use object_store::path::Path;
use regex::Regex;

use crate::error::{InvalidUrlSnafu, StorageError};

use super::{GcsConfig, LocalConfig, S3Config};

const S3_URL: &str = r"^[sS]3[aA]?://(?P<bucket>[a-z0-9\-\.]+)(/(?P<key>.*))?$";
const GCS_URL: &str = r"^[gG][sS]://(?P<bucket>[a-z0-9\-\._]+)(/(?P<key>.*))?$";
const FILE_URI: &str = r"^file://(?P<path>/.*)$";
const FILE_PATH: &str = r"^(?P<path>/.*)$";

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
enum Backend {
    S3,
    Gcs,
    Local,
}

fn matchers() -> &'static Vec<(Backend, Regex)> {
    static MATCHERS: OnceLock<Vec<(Backend, Regex)>> = OnceLock::new();
    MATCHERS.get_or_init(|| {
        vec![
            (Backend::S3, Regex::new(S3_URL).unwrap()),
            (Backend::Gcs, Regex::new(GCS_URL).unwrap()),
            (Backend::Local, Regex::new(FILE_URI).unwrap()),
            (Backend::Local, Regex::new(FILE_PATH).unwrap()),
        ]
    })
}

/// Backend configuration enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    S3(S3Config),
    Gcs(GcsConfig),
    Local(LocalConfig),
}

impl BackendConfig {
    /// Parse a URL into a backend configuration.
    pub fn parse_url(url: &str) -> Result<Self, StorageError> {
        for (backend, regex) in matchers() {
            if let Some(matches) = regex.captures(url) {
                return Ok(match backend {
                    Backend::S3 => Self::parse_s3(&matches),
                    Backend::Gcs => Self::parse_gcs(&matches),
                    Backend::Local => Self::parse_local(&matches),
                });
            }
        }

        InvalidUrlSnafu {
            url: url.to_string(),
        }
        .fail()
    }

    fn parse_s3(matches: &regex::Captures) -> Self {
        BackendConfig::S3(S3Config {
            bucket: matches["bucket"].to_string(),
            key: key_from(matches),
        })
    }

    fn parse_gcs(matches: &regex::Captures) -> Self {
        BackendConfig::Gcs(GcsConfig {
            bucket: matches["bucket"].to_string(),
            key: key_from(matches),
        })
    }

    fn parse_local(matches: &regex::Captures) -> Self {
        BackendConfig::Local(LocalConfig {
            path: matches["path"].to_string(),
        })
    }

    /// The key prefix within the bucket, if any.
    pub fn key(&self) -> Option<&Path> {
        match self {
            BackendConfig::S3(config) => config.key.as_ref(),
            BackendConfig::Gcs(config) => config.key.as_ref(),
            BackendConfig::Local(_) => None,
        }
    }

    /// The scheme://authority URL the engine resolves this backend's paths
    /// against. Local paths use the engine's built-in filesystem store.
    pub fn register_url(&self) -> Option<String> {
        match self {
            BackendConfig::S3(config) => Some(format!("s3://{}", config.bucket)),
            BackendConfig::Gcs(config) => Some(format!("gs://{}", config.bucket)),
            BackendConfig::Local(_) => None,
        }
    }
}

fn key_from(matches: &regex::Captures) -> Option<Path> {
    matches
        .name("key")
        .map(|m| m.as_str())
        .filter(|key| !key.is_empty())
        .map(|key| key.trim_end_matches('/').into())
}

/// Storage options passed through to the backend builders.
pub type StorageOptions = HashMap<String, String>;
