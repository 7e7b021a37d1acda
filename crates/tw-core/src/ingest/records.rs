//! JSON record-stream driver.
//!
//! One JSON document per record: `{"item": "...", "count": n, "timestamp": t}`
//! with `count` defaulting to 1 and `timestamp` optional (integer epoch,
//! float epoch, or a layout string). Documents that are valid JSON but the
//! wrong shape are skipped in live mode; a syntactically broken stream is
//! fatal because the decoder cannot resync past it.

use std::io::BufRead;
use std::thread;

use chrono::Utc;
use serde::Deserialize;
use tracing::debug;

use super::{observe_event_time, reached_max_lines, timestamp, IngestError, TimestampValue};
use crate::config::Config;
use crate::pipeline::Pipeline;

#[derive(Debug, Deserialize)]
struct Record {
    item: String,
    #[serde(default)]
    count: Option<i64>,
    #[serde(default)]
    timestamp: Option<TimestampValue>,
}

impl Record {
    /// Per-record increment: `count` floored at 1, as the wire format allows
    /// junk values the sketch should not see.
    fn increment(&self) -> u32 {
        self.count
            .unwrap_or(1)
            .clamp(1, i64::from(u32::MAX)) as u32
    }
}

pub(super) fn run(
    pipeline: &Pipeline,
    config: &Config,
    reader: Box<dyn BufRead + Send>,
) -> Result<(), IngestError> {
    let stream = serde_json::Deserializer::from_reader(reader).into_iter::<serde_json::Value>();
    let mut prev_event = None;
    let mut ingested = 0u64;
    for document in stream {
        pipeline.wait_if_paused();
        if reached_max_lines(config, ingested) {
            return Ok(());
        }
        let value = document?;
        let record: Record = match serde_json::from_value(value) {
            Ok(record) => record,
            Err(err) if config.replay => return Err(IngestError::RecordStream(err)),
            Err(err) => {
                debug!(error = %err, "skipping malformed record");
                continue;
            }
        };

        let event_time = record
            .timestamp
            .as_ref()
            .and_then(|value| timestamp::resolve(value, &config.timestamp_layout));
        match event_time {
            Some(event_time) => {
                observe_event_time(pipeline, config, &mut prev_event, event_time);
            }
            None if config.replay => return Err(IngestError::ReplayMissingTimestamp),
            None => {}
        }

        pipeline.ingest_with_count(&record.item, record.increment(), Utc::now());
        ingested += 1;
        if !config.replay && !config.pace.is_zero() {
            thread::sleep(config.pace);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InputFormat;
    use std::io::Cursor;

    fn config() -> Config {
        Config {
            format: InputFormat::Records,
            ..Config::default()
        }
    }

    fn pipeline() -> Pipeline {
        Pipeline::new(&Config {
            width: 65_536,
            ..Config::default()
        })
    }

    fn reader(text: &str) -> Box<dyn std::io::BufRead + Send> {
        Box::new(Cursor::new(text.as_bytes().to_vec()))
    }

    #[test]
    fn counts_default_to_one() {
        let pipeline = pipeline();
        let input = r#"{"item":"x"} {"item":"x","count":3} {"item":"y","count":0}"#;
        run(&pipeline, &config(), reader(input)).unwrap();
        assert_eq!(pipeline.count("x"), 4);
        // count 0 is floored to 1.
        assert_eq!(pipeline.count("y"), 1);
        assert!(!pipeline.data_clock_active());
    }

    #[test]
    fn timestamps_flip_the_data_clock_and_tick() {
        let pipeline = pipeline();
        let input = r#"
            {"item":"x","timestamp":0}
            {"item":"x","timestamp":0}
            {"item":"y","timestamp":5}
        "#;
        run(&pipeline, &config(), reader(input)).unwrap();
        assert!(pipeline.data_clock_active());
        assert_eq!(pipeline.count("x"), 2);
        assert_eq!(pipeline.count("y"), 1);
        // x landed five ticks before y.
        let series = pipeline.history_for("x");
        assert_eq!(series[series.len() - 6], 2);
    }

    #[test]
    fn string_timestamps_use_the_layout() {
        let pipeline = pipeline();
        let input = r#"{"item":"x","timestamp":"2024-05-01T12:00:00+00:00"}"#;
        run(&pipeline, &config(), reader(input)).unwrap();
        assert!(pipeline.data_clock_active());
        assert_eq!(pipeline.count("x"), 1);
    }

    #[test]
    fn wrong_shape_is_skipped_live_but_fatal_in_replay() {
        let pipeline = pipeline();
        let input = r#"{"not_item":1} {"item":"x"}"#;
        run(&pipeline, &config(), reader(input)).unwrap();
        assert_eq!(pipeline.count("x"), 1);

        let strict = Config {
            replay: true,
            replay_speed: 1000.0,
            ..config()
        };
        let err = run(&pipeline, &strict, reader(r#"{"not_item":1}"#)).unwrap_err();
        assert!(matches!(err, IngestError::RecordStream(_)));
    }

    #[test]
    fn missing_timestamp_is_fatal_in_replay() {
        let strict = Config {
            replay: true,
            replay_speed: 1000.0,
            ..config()
        };
        let err = run(&pipeline(), &strict, reader(r#"{"item":"x"}"#)).unwrap_err();
        assert!(matches!(err, IngestError::ReplayMissingTimestamp));
    }

    #[test]
    fn broken_stream_is_fatal() {
        let err = run(&pipeline(), &config(), reader(r#"{"item": "#)).unwrap_err();
        assert!(matches!(err, IngestError::RecordStream(_)));
    }

    #[test]
    fn float_timestamps_truncate_to_seconds() {
        let pipeline = pipeline();
        let input = r#"{"item":"x","timestamp":10.75} {"item":"x","timestamp":10.9}"#;
        run(&pipeline, &config(), reader(input)).unwrap();
        // Same second, same tick: both land in the current slot.
        let series = pipeline.history_for("x");
        assert_eq!(series[series.len() - 1], 2);
    }
}
