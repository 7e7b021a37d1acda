//! Terminal UI for topwatch, built on ratatui.
//!
//! Left pane: the Top-K leaderboard, searchable with `/` (typed text
//! substring-filters the rows without losing their ranks). Right pane:
//! trajectory plot of the visible items over the sliding window, with the
//! selected item highlighted. Footer: runtime stats block and key hints.
//!
//! # Module structure
//!
//! - `app`: application state, terminal lifecycle, and the event loop
//! - `widgets`: leaderboard, stats footer, and window label widgets
//! - `theme`: styling
//!
//! The UI is a collaborator of the core: everything it knows arrives through
//! the published Top-K view and the pipeline's read operations
//! (`history_for`, `latest_tick`, metrics snapshots, the pause gate).

mod app;
mod theme;
mod widgets;

pub use app::App;
pub use theme::Theme;

use thiserror::Error;

/// Errors that can occur in the TUI.
#[derive(Error, Debug)]
pub enum TuiError {
    /// Terminal setup, draw, or restore failure.
    #[error("terminal error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for TUI operations.
pub type TuiResult<T> = Result<T, TuiError>;
