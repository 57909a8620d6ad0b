//! stardust: batch ETL from raw song-play JSON to a star-schema warehouse.
//!
//! This crate reads two JSON-lines datasets (song catalog, user-activity
//! event logs) from object storage, reshapes them into five Parquet tables
//! (songs, artists, users, time, songplays) and writes them back
//! hive-partitioned for analytic queries. All heavy lifting is delegated to
//! DataFusion; this crate contributes the transformations, the session and
//! storage wiring, and overwrite semantics for idempotent reruns.
//!
//! # Example
//!
//! ```ignore
//! use stardust::{pipeline, Config, EtlSession, EtlError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), EtlError> {
//!     let config = Config::from_file("etl.yaml")?;
//!     let session = EtlSession::new(&config).await?;
//!     let stats = pipeline::run(&session, &config).await?;
//!     println!("Wrote {} songplays", stats.songplays);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod pipeline;
pub mod schema;
pub mod session;
pub mod storage;

// Re-export main types
pub use config::Config;
pub use error::EtlError;
pub use pipeline::{run, RunStats};
pub use session::EtlSession;
pub use storage::{StorageProvider, StorageProviderRef};
