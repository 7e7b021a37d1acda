//! Unified error type for tw-core.

use thiserror::Error;

/// Result type alias for tw-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error for the `tw` pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration rejected by semantic validation.
    #[error("invalid configuration: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Ingest-side failure: input open, read, or fatal parse.
    #[error(transparent)]
    Ingest(#[from] crate::ingest::IngestError),

    /// Terminal UI failure.
    #[error(transparent)]
    Tui(#[from] crate::tui::TuiError),

    /// IO error outside the ingest path.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
