//! Ingest drivers: text lines, access logs, and JSON record streams.
//!
//! Each driver reads one event at a time, honors the pause gate and the
//! `max_lines` cutoff, extracts event timestamps where the format carries
//! them, paces replay, and feeds the pipeline. Malformed lines are skipped
//! in live mode and fatal in replay mode, where losing an event would break
//! the timing reconstruction.
//!
//! None of the drivers sleep or block while holding the sketch lock; the
//! pipeline's methods each take it for one bounded operation.

pub mod access_log;
mod records;
mod text;
pub mod timestamp;

use std::fs::File;
use std::io::{BufRead, BufReader, IsTerminal};
use std::path::Path;
use std::thread;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;

use crate::clock::replay_delay;
use crate::config::{Config, InputFormat};
use crate::pipeline::Pipeline;

pub use timestamp::TimestampValue;

/// Errors surfaced by the ingest path.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Input file could not be opened.
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },

    /// No input file was given and stdin is a terminal.
    #[error("stdin is a terminal; pass --in <file> or pipe input")]
    StdinIsTty,

    /// Read failure mid-stream.
    #[error("read error: {0}")]
    Read(#[from] std::io::Error),

    /// The record stream is not valid JSON; the decoder cannot resync.
    #[error("invalid record stream: {0}")]
    RecordStream(#[from] serde_json::Error),

    /// Replay needs every event timestamped; this one was not.
    #[error("replay enabled but record has missing/invalid timestamp")]
    ReplayMissingTimestamp,
}

/// Open the configured input: a file when `path` is set, stdin otherwise.
/// A TTY stdin with no file is an error - there is nothing to observe.
pub fn open_input(path: Option<&Path>) -> Result<Box<dyn BufRead + Send>, IngestError> {
    match path {
        Some(path) => {
            let file = File::open(path).map_err(|source| IngestError::Open {
                path: path.display().to_string(),
                source,
            })?;
            Ok(Box::new(BufReader::new(file)))
        }
        None if std::io::stdin().is_terminal() => Err(IngestError::StdinIsTty),
        None => Ok(Box::new(BufReader::new(std::io::stdin()))),
    }
}

/// Run the driver selected by the config until EOF, `max_lines`, or error.
pub fn run(
    pipeline: &Pipeline,
    config: &Config,
    reader: Box<dyn BufRead + Send>,
) -> Result<(), IngestError> {
    match config.format {
        InputFormat::Text => text::run(pipeline, config, reader),
        InputFormat::AccessLog => access_log::run(pipeline, config, reader),
        InputFormat::Records => records::run(pipeline, config, reader),
    }
}

/// Shared per-event time handling for the timestamped drivers.
///
/// Activates the data clock on the first valid timestamp, paces replay from
/// the gap to the previous event, and ticks the sketch *before* the event is
/// added so it lands in the tick slot its timestamp names.
fn observe_event_time(
    pipeline: &Pipeline,
    config: &Config,
    prev_event: &mut Option<DateTime<Utc>>,
    event_time: DateTime<Utc>,
) {
    pipeline.activate_data_clock();
    if config.replay {
        if let Some(prev) = *prev_event {
            let delay = replay_delay(prev, event_time, config.replay_speed, config.replay_max_sleep);
            if !delay.is_zero() {
                thread::sleep(delay);
            }
        }
    }
    *prev_event = Some(event_time);
    pipeline.advance_time(event_time);
}

/// True when the `max_lines` cutoff has been reached.
fn reached_max_lines(config: &Config, ingested: u64) -> bool {
    if config.max_lines > 0 && ingested >= config.max_lines {
        info!(max_lines = config.max_lines, "input cutoff reached");
        return true;
    }
    false
}
