//! topwatch core library.
//!
//! Everything behind the `tw` binary:
//! - Configuration and semantic validation
//! - The ingest drivers (text lines, access logs, JSON record streams)
//! - The time driver (wall ticks vs. data-derived ticks, replay pacing)
//! - The incremental Top-K ranker
//! - Rolling ingest/freshness metrics
//! - The pipeline facade tying the sketch, metrics, and pause gate together
//! - The terminal UI
//!
//! The binary entry point is in `main.rs`.

pub mod clock;
pub mod config;
pub mod error;
pub mod exit_codes;
pub mod ingest;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod ranker;
pub mod refresh;
pub mod tui;

pub use config::{Config, ConfigError, InputFormat};
pub use error::{Error, Result};
pub use exit_codes::ExitCode;
pub use pipeline::Pipeline;
