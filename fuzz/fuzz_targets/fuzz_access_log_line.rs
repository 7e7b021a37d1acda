//! Fuzz target for access-log line splitting.
//!
//! Log lines come straight off untrusted streams; splitting must never
//! panic, whatever the bytes look like.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tw_core::ingest::access_log::split_line;

fuzz_target!(|line: &str| {
    if let Some((item, raw_ts)) = split_line(line) {
        // Both pieces must be substrings of the input.
        assert!(line.contains(item));
        assert!(line.contains(raw_ts));
    }
});
