//! Access-log driver.
//!
//! Lines look like `item - - [timestamp] ...`: the item is the token before
//! ` - - [` (typically the client address) and the timestamp is the token
//! before the first `]`, parsed with the configured layout. Lines that do
//! not match the shape are skipped. A timestamp that fails to parse is
//! skipped too in live mode, but fatal under replay.

use std::io::BufRead;
use std::thread;

use chrono::Utc;
use tracing::debug;

use super::{observe_event_time, reached_max_lines, timestamp, IngestError};
use crate::config::Config;
use crate::pipeline::Pipeline;

/// Split a log line into (item, raw timestamp).
pub fn split_line(line: &str) -> Option<(&str, &str)> {
    let (item, rest) = line.split_once(" - - [")?;
    let (raw_ts, _) = rest.split_once(']')?;
    Some((item, raw_ts))
}

pub(super) fn run(
    pipeline: &Pipeline,
    config: &Config,
    reader: Box<dyn BufRead + Send>,
) -> Result<(), IngestError> {
    let mut prev_event = None;
    let mut ingested = 0u64;
    for line in reader.lines() {
        pipeline.wait_if_paused();
        if reached_max_lines(config, ingested) {
            return Ok(());
        }
        let line = line?;
        let Some((item, raw_ts)) = split_line(&line) else {
            debug!("skipping unparseable access-log line");
            continue;
        };

        match timestamp::parse_with_layout(raw_ts, &config.timestamp_layout) {
            Some(event_time) => {
                observe_event_time(pipeline, config, &mut prev_event, event_time);
            }
            None if config.replay => return Err(IngestError::ReplayMissingTimestamp),
            None => {}
        }

        pipeline.ingest(item, Utc::now());
        ingested += 1;
        if !config.replay && !config.pace.is_zero() {
            thread::sleep(config.pace);
        }
    }
    Ok(())
}
