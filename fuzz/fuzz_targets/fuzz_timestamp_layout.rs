//! Fuzz target for timestamp resolution.
//!
//! Both the timestamp text and the layout are user-controlled; parsing must
//! only ever return None, never panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tw_core::ingest::timestamp::{parse_with_layout, resolve, TimestampValue};

fuzz_target!(|input: (&str, &str)| {
    let (text, layout) = input;
    let _ = parse_with_layout(text, layout);
    let _ = resolve(&TimestampValue::Text(text.to_string()), layout);
    let _ = serde_json::from_str::<TimestampValue>(text);
});
