//! The batch transformation pipeline.
//!
//! Two sequential stages: the song-catalog transform (songs, artists) and
//! the activity-log transform (users, time, songplays). Every table write
//! purges its output prefix first, so a run fully replaces its outputs and
//! reruns are idempotent.

mod events;
mod songs;

pub use events::process_log_data;
pub use songs::{process_song_data, SongCatalog};

use datafusion::arrow::array::{RecordBatch, UInt64Array};
use datafusion::config::TableParquetOptions;
use datafusion::dataframe::DataFrameWriteOptions;
use datafusion::error::DataFusionError;
use datafusion::functions_window::expr_fn::row_number;
use datafusion::logical_expr::{ExprFunctionExt, SortExpr};
use datafusion::prelude::{ident, lit, DataFrame, Expr};
use tracing::info;

use crate::config::{Config, ParquetCompression};
use crate::error::EtlError;
use crate::session::EtlSession;

/// Statistics about a pipeline run: rows written per output table.
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    pub songs: u64,
    pub artists: u64,
    pub users: u64,
    pub time: u64,
    pub songplays: u64,
}

/// Run the full pipeline: song-catalog stage, then activity-log stage.
pub async fn run(session: &EtlSession, config: &Config) -> Result<RunStats, EtlError> {
    let catalog = songs::process_song_data(session, config).await?;
    let log_stats = events::process_log_data(session, config, catalog.mapping).await?;

    Ok(RunStats {
        songs: catalog.songs_rows,
        artists: catalog.artists_rows,
        users: log_stats.users,
        time: log_stats.time,
        songplays: log_stats.songplays,
    })
}

/// Write a dataframe as one output table, replacing whatever a previous run
/// left there. Returns the number of rows written.
pub(crate) async fn write_table(
    session: &EtlSession,
    df: DataFrame,
    table: &str,
    partition_by: &[&str],
    compression: ParquetCompression,
) -> Result<u64, EtlError> {
    session.overwrite_table(table).await?;

    let mut parquet_options = TableParquetOptions::default();
    parquet_options.global.compression = Some(compression.as_str().to_string());

    let write_options = DataFrameWriteOptions::new()
        .with_partition_by(partition_by.iter().map(|c| c.to_string()).collect());

    let target = session.output_url(table);
    let batches = df
        .write_parquet(&target, write_options, Some(parquet_options))
        .await?;

    let rows = rows_written(&batches);
    info!(table, rows, "Wrote table");
    Ok(rows)
}

/// Sum the row counts the engine's Parquet sink reports back.
fn rows_written(batches: &[RecordBatch]) -> u64 {
    batches
        .iter()
        .filter(|batch| batch.num_columns() > 0)
        .filter_map(|batch| batch.column(0).as_any().downcast_ref::<UInt64Array>())
        .map(|counts| counts.iter().flatten().sum::<u64>())
        .sum()
}

/// Deduplicate by key, keeping the first row per key under the given rank
/// order. The tie-break order is what makes reruns deterministic.
pub(crate) fn keep_first(
    df: DataFrame,
    partition_by: Vec<Expr>,
    order_by: Vec<SortExpr>,
) -> Result<DataFrame, DataFusionError> {
    let columns: Vec<Expr> = df
        .schema()
        .fields()
        .iter()
        .map(|field| ident(field.name().as_str()))
        .collect();

    let rank = row_number()
        .partition_by(partition_by)
        .order_by(order_by)
        .build()?
        .alias("rn");

    df.window(vec![rank])?
        .filter(ident("rn").eq(lit(1_u64)))?
        .select(columns)
}
