//! End-to-end pipeline tests on the local filesystem backend.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use chrono::{Datelike, Timelike};
use datafusion::arrow::array::{
    Array, Int32Array, Int64Array, RecordBatch, StringArray, TimestampMicrosecondArray, UInt64Array,
};
use datafusion::arrow::compute::concat_batches;
use datafusion::prelude::{col, ParquetReadOptions, SessionContext};
use tempfile::TempDir;

use stardust::config::{Config, EngineConfig, InputConfig, OutputConfig, ParquetCompression};
use stardust::{pipeline, EtlSession, RunStats};

// 2018-11-02 01:25:34 UTC
const TS_MATCH: i64 = 1_541_121_934_796;
// 40 seconds later, same partition
const TS_MISS: i64 = 1_541_121_974_796;

fn write_song_fixtures(root: &Path) {
    let dir = root.join("song_data/A/A/A");
    fs::create_dir_all(&dir).unwrap();

    let s1 = r#"{"num_songs": 1, "artist_id": "A1", "artist_latitude": null, "artist_longitude": null, "artist_location": "San Francisco, CA", "artist_name": "Y", "song_id": "S1", "title": "X", "duration": 200.0, "year": 2000}"#;
    let s2 = r#"{"num_songs": 1, "artist_id": "A2", "artist_latitude": 35.1, "artist_longitude": -90.0, "artist_location": "Memphis, TN", "artist_name": "Nobody", "song_id": "S2", "title": "Q2", "duration": 150.0, "year": 0}"#;

    fs::write(dir.join("TRAAAAA.json"), format!("{s1}\n")).unwrap();
    // Exact duplicate of S1 in a second file; the songs table must dedupe it
    fs::write(dir.join("TRAAAAB.json"), format!("{s1}\n")).unwrap();
    fs::write(dir.join("TRABBBB.json"), format!("{s2}\n")).unwrap();
}

fn write_log_fixtures(root: &Path) {
    let dir = root.join("log_data/2018/11");
    fs::create_dir_all(&dir).unwrap();

    let play_match = format!(
        r#"{{"artist":"Y","auth":"Logged In","firstName":"A","gender":"F","itemInSession":0,"lastName":"B","length":200.0,"level":"free","location":"loc","method":"PUT","page":"NextSong","registration":1540919166796.0,"sessionId":1,"song":"X","status":200,"ts":{TS_MATCH},"userAgent":"ua","userId":"42"}}"#
    );
    let play_miss = format!(
        r#"{{"artist":"Nobody","auth":"Logged In","firstName":"A","gender":"F","itemInSession":1,"lastName":"B","length":150.0,"level":"paid","location":"loc","method":"PUT","page":"NextSong","registration":1540919166796.0,"sessionId":1,"song":"Q","status":200,"ts":{TS_MISS},"userAgent":"ua","userId":"42"}}"#
    );
    let not_a_play = format!(
        r#"{{"artist":null,"auth":"Logged In","firstName":"A","gender":"F","itemInSession":2,"lastName":"B","length":null,"level":"paid","location":"loc","method":"GET","page":"Home","registration":1540919166796.0,"sessionId":1,"song":null,"status":200,"ts":{},"userAgent":"ua","userId":"42"}}"#,
        TS_MISS + 60_000
    );

    fs::write(
        dir.join("2018-11-02-events.json"),
        format!("{play_match}\n{play_miss}\n{not_a_play}\n"),
    )
    .unwrap();
}

fn local_config(root: &Path) -> Config {
    Config {
        input: InputConfig {
            song_data: root.join("song_data").display().to_string(),
            log_data: root.join("log_data").display().to_string(),
            storage_options: HashMap::new(),
        },
        output: OutputConfig {
            path: root.join("warehouse").display().to_string(),
            compression: ParquetCompression::Snappy,
            storage_options: HashMap::new(),
        },
        engine: EngineConfig::default(),
    }
}

async fn run_pipeline(config: &Config) -> RunStats {
    let session = EtlSession::new(config).await.unwrap();
    pipeline::run(&session, config).await.unwrap()
}

/// Read every Parquet file under a table directory (partition columns live
/// in the directory names, not the files, so they are absent here).
async fn read_table(dir: &Path) -> RecordBatch {
    let ctx = SessionContext::new();
    let df = ctx
        .read_parquet(
            format!("{}/", dir.display()),
            ParquetReadOptions::default(),
        )
        .await
        .unwrap();
    let batches = df.collect().await.unwrap();
    concat_batches(&batches[0].schema(), &batches).unwrap()
}

fn str_col<'a>(batch: &'a RecordBatch, name: &str) -> &'a StringArray {
    batch
        .column_by_name(name)
        .unwrap()
        .as_any()
        .downcast_ref()
        .unwrap()
}

fn i32_value(batch: &RecordBatch, name: &str, row: usize) -> i32 {
    batch
        .column_by_name(name)
        .unwrap()
        .as_any()
        .downcast_ref::<Int32Array>()
        .unwrap()
        .value(row)
}

fn has_parquet_file(dir: &Path) -> bool {
    dir.is_dir()
        && fs::read_dir(dir).unwrap().filter_map(|e| e.ok()).any(|e| {
            e.path()
                .extension()
                .map(|ext| ext == "parquet")
                .unwrap_or(false)
        })
}

#[tokio::test]
async fn test_full_pipeline_builds_star_schema() {
    let temp_dir = TempDir::new().unwrap();
    write_song_fixtures(temp_dir.path());
    write_log_fixtures(temp_dir.path());

    let config = local_config(temp_dir.path());
    let stats = run_pipeline(&config).await;

    assert_eq!(stats.songs, 2);
    assert_eq!(stats.artists, 2);
    assert_eq!(stats.users, 1);
    assert_eq!(stats.time, 2);
    assert_eq!(stats.songplays, 2);

    let warehouse = temp_dir.path().join("warehouse");

    // songs: partitioned by (year, artist_id), duplicate S1 collapsed
    assert!(has_parquet_file(&warehouse.join("songs/year=2000/artist_id=A1")));
    assert!(has_parquet_file(&warehouse.join("songs/year=0/artist_id=A2")));
    let songs = read_table(&warehouse.join("songs")).await;
    assert_eq!(songs.num_rows(), 2);

    // artists: unpartitioned, renamed columns
    let artists = read_table(&warehouse.join("artists")).await;
    assert_eq!(artists.num_rows(), 2);
    assert!(artists.column_by_name("name").is_some());
    assert!(artists.column_by_name("location").is_some());
    assert!(artists.column_by_name("latitude").is_some());

    // users: one row for user 42; the later (paid) event wins
    let users = read_table(&warehouse.join("users")).await;
    assert_eq!(users.num_rows(), 1);
    assert_eq!(str_col(&users, "user_id").value(0), "42");
    assert_eq!(str_col(&users, "level").value(0), "paid");

    // time: one row per distinct timestamp, partitioned by (year, month)
    assert!(has_parquet_file(&warehouse.join("time/year=2018/month=11")));
    let time = read_table(&warehouse.join("time")).await;
    assert_eq!(time.num_rows(), 2);

    // Calendar parts follow standard calendar rules for the first event
    let expected = chrono::DateTime::from_timestamp(TS_MATCH / 1000, 0).unwrap();
    let time = {
        let ctx = SessionContext::new();
        let df = ctx
            .read_parquet(
                format!("{}/", warehouse.join("time").display()),
                ParquetReadOptions::default(),
            )
            .await
            .unwrap()
            .sort(vec![col("start_time").sort(true, false)])
            .unwrap();
        let batches = df.collect().await.unwrap();
        concat_batches(&batches[0].schema(), &batches).unwrap()
    };
    let start_times = time
        .column_by_name("start_time")
        .unwrap()
        .as_any()
        .downcast_ref::<TimestampMicrosecondArray>()
        .unwrap();
    assert_eq!(start_times.value(0), (TS_MATCH / 1000) * 1_000_000);
    assert_eq!(i32_value(&time, "hour", 0), expected.hour() as i32);
    assert_eq!(i32_value(&time, "day", 0), expected.day() as i32);
    assert_eq!(i32_value(&time, "week", 0), expected.iso_week().week() as i32);
    assert_eq!(
        i32_value(&time, "weekday", 0),
        expected.weekday().number_from_sunday() as i32
    );

    // songplays: both plays kept, partitioned by (year, month)
    assert!(has_parquet_file(&warehouse.join("songplays/year=2018/month=11")));
    let songplays = {
        let ctx = SessionContext::new();
        let df = ctx
            .read_parquet(
                format!("{}/", warehouse.join("songplays").display()),
                ParquetReadOptions::default(),
            )
            .await
            .unwrap()
            .sort(vec![col("songplay_id").sort(true, false)])
            .unwrap();
        let batches = df.collect().await.unwrap();
        concat_batches(&batches[0].schema(), &batches).unwrap()
    };
    assert_eq!(songplays.num_rows(), 2);

    let ids = songplays
        .column_by_name("songplay_id")
        .unwrap()
        .as_any()
        .downcast_ref::<UInt64Array>()
        .unwrap();
    assert_eq!(ids.value(0), 1);
    assert_eq!(ids.value(1), 2);

    // The exact (title, artist, duration) match carries its catalog keys
    let song_ids = str_col(&songplays, "song_id");
    let artist_ids = str_col(&songplays, "artist_id");
    assert_eq!(song_ids.value(0), "S1");
    assert_eq!(artist_ids.value(0), "A1");
    // The non-match keeps NULL foreign keys
    assert!(song_ids.is_null(1));
    assert!(artist_ids.is_null(1));

    assert_eq!(str_col(&songplays, "user_id").value(0), "42");
    assert_eq!(str_col(&songplays, "level").value(0), "free");
    assert_eq!(str_col(&songplays, "level").value(1), "paid");
    let sessions = songplays
        .column_by_name("session_id")
        .unwrap()
        .as_any()
        .downcast_ref::<Int64Array>()
        .unwrap();
    assert_eq!(sessions.value(0), 1);
}

#[tokio::test]
async fn test_rerun_overwrites_previous_outputs() {
    let temp_dir = TempDir::new().unwrap();
    write_song_fixtures(temp_dir.path());
    write_log_fixtures(temp_dir.path());

    let config = local_config(temp_dir.path());
    let first = run_pipeline(&config).await;

    // Plant a stale object where the songs table lives; the rerun must purge it
    let warehouse = temp_dir.path().join("warehouse");
    fs::write(warehouse.join("songs/stale.parquet"), b"stale").unwrap();

    let second = run_pipeline(&config).await;

    assert!(!warehouse.join("songs/stale.parquet").exists());
    assert_eq!(first.songs, second.songs);
    assert_eq!(first.artists, second.artists);
    assert_eq!(first.users, second.users);
    assert_eq!(first.time, second.time);
    assert_eq!(first.songplays, second.songplays);

    // Unchanged input produces the same relations after the rerun
    let songs = read_table(&warehouse.join("songs")).await;
    assert_eq!(songs.num_rows(), 2);
    let songplays = read_table(&warehouse.join("songplays")).await;
    assert_eq!(songplays.num_rows(), 2);
}
