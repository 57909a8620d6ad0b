//! Input schemas for the two upstream datasets.
//!
//! Field names are fixed by the upstream catalog/log format and must be
//! preserved verbatim; both datasets are read schema-on-read with every
//! field nullable, letting the engine null out missing fields per record.

use std::sync::Arc;

use datafusion::arrow::datatypes::{DataType, Field, Schema, SchemaRef};

/// Schema of raw song-catalog records.
pub fn song_data_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("num_songs", DataType::Int64, true),
        Field::new("artist_id", DataType::Utf8, true),
        Field::new("artist_latitude", DataType::Float64, true),
        Field::new("artist_longitude", DataType::Float64, true),
        Field::new("artist_location", DataType::Utf8, true),
        Field::new("artist_name", DataType::Utf8, true),
        Field::new("song_id", DataType::Utf8, true),
        Field::new("title", DataType::Utf8, true),
        Field::new("duration", DataType::Float64, true),
        Field::new("year", DataType::Int64, true),
    ]))
}

/// Schema of raw user-activity log records.
pub fn log_data_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("artist", DataType::Utf8, true),
        Field::new("auth", DataType::Utf8, true),
        Field::new("firstName", DataType::Utf8, true),
        Field::new("gender", DataType::Utf8, true),
        Field::new("itemInSession", DataType::Int64, true),
        Field::new("lastName", DataType::Utf8, true),
        Field::new("length", DataType::Float64, true),
        Field::new("level", DataType::Utf8, true),
        Field::new("location", DataType::Utf8, true),
        Field::new("method", DataType::Utf8, true),
        Field::new("page", DataType::Utf8, true),
        Field::new("registration", DataType::Float64, true),
        Field::new("sessionId", DataType::Int64, true),
        Field::new("song", DataType::Utf8, true),
        Field::new("status", DataType::Int64, true),
        Field::new("ts", DataType::Int64, true),
        Field::new("userAgent", DataType::Utf8, true),
        Field::new("userId", DataType::Utf8, true),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_song_schema_fields() {
        let schema = song_data_schema();
        assert_eq!(schema.fields().len(), 10);
        assert_eq!(schema.field_with_name("song_id").unwrap().data_type(), &DataType::Utf8);
        assert_eq!(schema.field_with_name("duration").unwrap().data_type(), &DataType::Float64);
        assert_eq!(schema.field_with_name("year").unwrap().data_type(), &DataType::Int64);
    }

    #[test]
    fn test_log_schema_preserves_upstream_names() {
        let schema = log_data_schema();
        assert_eq!(schema.fields().len(), 18);
        // Upstream camelCase names are kept verbatim at the read boundary
        for name in ["firstName", "lastName", "sessionId", "userAgent", "userId", "itemInSession"] {
            assert!(schema.field_with_name(name).is_ok(), "missing field {name}");
        }
        assert_eq!(schema.field_with_name("ts").unwrap().data_type(), &DataType::Int64);
        assert_eq!(schema.field_with_name("length").unwrap().data_type(), &DataType::Float64);
    }
}
