//! Plain-text driver: one line per event, the line is the item.

use std::io::BufRead;
use std::thread;

use chrono::Utc;

use super::{reached_max_lines, IngestError};
use crate::config::Config;
use crate::pipeline::Pipeline;

pub(super) fn run(
    pipeline: &Pipeline,
    config: &Config,
    reader: Box<dyn BufRead + Send>,
) -> Result<(), IngestError> {
    let mut ingested = 0u64;
    for line in reader.lines() {
        pipeline.wait_if_paused();
        if reached_max_lines(config, ingested) {
            return Ok(());
        }
        let item = line?;
        pipeline.ingest(&item, Utc::now());
        ingested += 1;
        if !config.pace.is_zero() {
            thread::sleep(config.pace);
        }
    }
    Ok(())
}
