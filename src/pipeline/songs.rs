//! Song-catalog transform: the songs and artists dimension tables.

use datafusion::error::DataFusionError;
use datafusion::prelude::{col, DataFrame, NdJsonReadOptions};
use tracing::info;

use crate::config::Config;
use crate::error::EtlError;
use crate::pipeline::{keep_first, write_table};
use crate::schema;
use crate::session::EtlSession;

pub(crate) const SONGS_TABLE: &str = "songs";
pub(crate) const ARTISTS_TABLE: &str = "artists";

/// Outputs of the song stage that feed the log stage.
pub struct SongCatalog {
    /// Deduplicated (song_id, title, artist_id, artist_name, duration)
    /// mapping for the songplays join.
    pub mapping: DataFrame,
    pub(crate) songs_rows: u64,
    pub(crate) artists_rows: u64,
}

/// Read the raw song catalog, write the songs and artists tables, and
/// return the join mapping for the songplays fact table.
pub async fn process_song_data(
    session: &EtlSession,
    config: &Config,
) -> Result<SongCatalog, EtlError> {
    let input_schema = schema::song_data_schema();

    info!(path = session.song_data_url(), "Reading song data");
    let raw = session
        .ctx()
        .read_json(
            session.song_data_url(),
            NdJsonReadOptions::default()
                .schema(input_schema.as_ref())
                .file_extension(".json"),
        )
        .await?;

    let songs = songs_table(raw.clone())?;
    let songs_rows = write_table(
        session,
        songs,
        SONGS_TABLE,
        &["year", "artist_id"],
        config.output.compression,
    )
    .await?;

    let artists = artists_table(raw.clone())?;
    let artists_rows = write_table(
        session,
        artists,
        ARTISTS_TABLE,
        &[],
        config.output.compression,
    )
    .await?;

    let mapping = song_artist_mapping(raw)?;

    Ok(SongCatalog {
        mapping,
        songs_rows,
        artists_rows,
    })
}

/// songs: one row per song_id.
fn songs_table(raw: DataFrame) -> Result<DataFrame, DataFusionError> {
    let projected = raw.select(vec![
        col("song_id"),
        col("title"),
        col("artist_id"),
        col("year"),
        col("duration"),
    ])?;

    keep_first(
        projected,
        vec![col("song_id")],
        vec![col("title").sort(true, false), col("duration").sort(true, false)],
    )
}

/// artists: one row per artist_id, upstream artist_* columns renamed.
fn artists_table(raw: DataFrame) -> Result<DataFrame, DataFusionError> {
    let projected = raw.select(vec![
        col("artist_id"),
        col("artist_name").alias("name"),
        col("artist_location").alias("location"),
        col("artist_latitude").alias("latitude"),
        col("artist_longitude").alias("longitude"),
    ])?;

    keep_first(
        projected,
        vec![col("artist_id")],
        vec![col("name").sort(true, false), col("location").sort(true, false)],
    )
}

/// One mapping row per (title, artist_name, duration) join key, so a
/// songplay row never fans out; ties keep the lowest song_id.
fn song_artist_mapping(raw: DataFrame) -> Result<DataFrame, DataFusionError> {
    let projected = raw.select(vec![
        col("song_id"),
        col("title"),
        col("artist_id"),
        col("artist_name"),
        col("duration"),
    ])?;

    keep_first(
        projected,
        vec![col("title"), col("artist_name"), col("duration")],
        vec![col("song_id").sort(true, false)],
    )
}
