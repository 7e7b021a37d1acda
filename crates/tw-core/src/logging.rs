//! Structured logging for tw-core.
//!
//! Logs go to stderr so stdout stays free for piped input/output plumbing.
//! The terminal UI owns the screen while it runs; log output is mainly
//! useful before the UI starts, after it exits, and when stderr is
//! redirected to a file.
//!
//! The filter honors `TW_LOG` first, then `RUST_LOG`, and defaults to
//! `tw_core=info`.

use std::io::IsTerminal;

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the logging subsystem. Call once at startup.
pub fn init_logging() {
    let filter = std::env::var("TW_LOG")
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("tw_core=info"));

    let use_ansi = std::io::stderr().is_terminal();
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(use_ansi)
        .try_init();
}
