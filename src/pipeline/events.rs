//! Activity-log transform: the users and time dimension tables plus the
//! songplays fact table.

use datafusion::arrow::datatypes::{DataType, TimeUnit};
use datafusion::common::JoinType;
use datafusion::error::DataFusionError;
use datafusion::functions::expr_fn::{date_part, to_timestamp_seconds};
use datafusion::functions_window::expr_fn::row_number;
use datafusion::logical_expr::ExprFunctionExt;
use datafusion::prelude::{cast, col, ident, lit, DataFrame, Expr, NdJsonReadOptions};
use tracing::info;

use crate::config::Config;
use crate::error::EtlError;
use crate::pipeline::{keep_first, write_table};
use crate::schema;
use crate::session::EtlSession;

pub(crate) const USERS_TABLE: &str = "users";
pub(crate) const TIME_TABLE: &str = "time";
pub(crate) const SONGPLAYS_TABLE: &str = "songplays";

/// Action value marking an actual song play.
const NEXT_SONG: &str = "NextSong";

/// Rows written by the activity-log stage.
pub struct LogStats {
    pub users: u64,
    pub time: u64,
    pub songplays: u64,
}

/// Read the raw activity logs, filter to song plays, and write the users,
/// time, and songplays tables. The song mapping comes from the song stage.
pub async fn process_log_data(
    session: &EtlSession,
    config: &Config,
    mapping: DataFrame,
) -> Result<LogStats, EtlError> {
    let input_schema = schema::log_data_schema();

    info!(path = session.log_data_url(), "Reading log data");
    let raw = session
        .ctx()
        .read_json(
            session.log_data_url(),
            NdJsonReadOptions::default()
                .schema(input_schema.as_ref())
                .file_extension(".json"),
        )
        .await?;

    let events = normalize_log_columns(raw)?;
    let plays = events.filter(col("page").eq(lit(NEXT_SONG)))?;

    let users = users_table(plays.clone())?;
    let users_rows = write_table(session, users, USERS_TABLE, &[], config.output.compression).await?;

    let plays = with_event_time(plays)?;

    let time = time_table(plays.clone())?;
    let time_rows = write_table(
        session,
        time,
        TIME_TABLE,
        &["year", "month"],
        config.output.compression,
    )
    .await?;

    let songplays = songplays_table(plays, mapping)?;
    let songplays_rows = write_table(
        session,
        songplays,
        SONGPLAYS_TABLE,
        &["year", "month"],
        config.output.compression,
    )
    .await?;

    Ok(LogStats {
        users: users_rows,
        time: time_rows,
        songplays: songplays_rows,
    })
}

/// Rename the upstream camelCase columns once, right after reading, so every
/// downstream projection works in snake_case.
fn normalize_log_columns(raw: DataFrame) -> Result<DataFrame, DataFusionError> {
    raw.select(vec![
        col("artist"),
        col("auth"),
        ident("firstName").alias("first_name"),
        col("gender"),
        ident("itemInSession").alias("item_in_session"),
        ident("lastName").alias("last_name"),
        col("length"),
        col("level"),
        col("location"),
        col("method"),
        col("page"),
        col("registration"),
        ident("sessionId").alias("session_id"),
        col("song"),
        col("status"),
        col("ts"),
        ident("userAgent").alias("user_agent"),
        ident("userId").alias("user_id"),
    ])
}

/// Derive the event timestamp and its calendar parts.
///
/// `ts` is epoch milliseconds; integer division floors it to whole seconds.
fn with_event_time(df: DataFrame) -> Result<DataFrame, DataFusionError> {
    let start_time = cast(
        to_timestamp_seconds(vec![col("ts") / lit(1000_i64)]),
        DataType::Timestamp(TimeUnit::Microsecond, None),
    );

    df.with_column("start_time", start_time)?
        .with_column("hour", calendar_part("hour"))?
        .with_column("day", calendar_part("day"))?
        .with_column("week", calendar_part("week"))?
        .with_column("month", calendar_part("month"))?
        .with_column("year", calendar_part("year"))?
        // Day of week 1-7 with Sunday = 1
        .with_column("weekday", calendar_part("dow") + lit(1))
}

fn calendar_part(part: &str) -> Expr {
    cast(date_part(lit(part), col("start_time")), DataType::Int32)
}

/// users: one row per user_id; the most recent event wins so `level`
/// reflects the user's latest subscription tier.
fn users_table(plays: DataFrame) -> Result<DataFrame, DataFusionError> {
    let deduped = keep_first(plays, vec![col("user_id")], vec![col("ts").sort(false, false)])?;

    deduped.select(vec![
        col("user_id"),
        col("first_name"),
        col("last_name"),
        col("gender"),
        col("level"),
    ])
}

/// time: one row per distinct songplay timestamp.
fn time_table(plays: DataFrame) -> Result<DataFrame, DataFusionError> {
    plays
        .select(vec![
            col("start_time"),
            col("hour"),
            col("day"),
            col("week"),
            col("month"),
            col("year"),
            col("weekday"),
        ])?
        .distinct()
}

/// songplays: every filtered event, left-joined against the song mapping on
/// (song title, artist name, duration). Non-matches keep NULL foreign keys.
fn songplays_table(plays: DataFrame, mapping: DataFrame) -> Result<DataFrame, DataFusionError> {
    let joined = plays.join_on(
        mapping,
        JoinType::Left,
        [
            col("song").eq(col("title")),
            col("artist").eq(col("artist_name")),
            col("length").eq(col("duration")),
        ],
    )?;

    // Surrogate key: monotonically increasing, deterministic for a given input
    let songplay_id = row_number()
        .order_by(vec![
            col("ts").sort(true, false),
            col("session_id").sort(true, false),
            col("item_in_session").sort(true, false),
        ])
        .build()?
        .alias("songplay_id");

    joined.window(vec![songplay_id])?.select(vec![
        col("songplay_id"),
        col("start_time"),
        col("user_id"),
        col("level"),
        col("song_id"),
        col("artist_id"),
        col("session_id"),
        col("location"),
        col("user_agent"),
        col("year"),
        col("month"),
    ])
}
