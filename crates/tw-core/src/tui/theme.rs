//! Color scheme for the TUI.

use ratatui::style::{Color, Modifier, Style};

/// Styles used across the widgets.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Selected leaderboard row and highlighted plot line.
    pub selected: Style,
    /// De-emphasized plot lines and chrome.
    pub dim: Style,
    /// Pane borders and labels.
    pub border: Style,
    /// Stats footer text.
    pub stats: Style,
    /// Key hint line.
    pub help: Style,
    /// Fatal-error banner.
    pub error: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            selected: Style::default()
                .fg(Color::Red)
                .add_modifier(Modifier::BOLD),
            dim: Style::default().fg(Color::DarkGray),
            border: Style::default().fg(Color::DarkGray),
            stats: Style::default().fg(Color::Red),
            help: Style::default().fg(Color::DarkGray),
            error: Style::default()
                .fg(Color::Red)
                .add_modifier(Modifier::BOLD),
        }
    }
}

impl Theme {
    /// Plot line color for the selected vs. background series.
    pub fn series_style(&self, selected: bool) -> Style {
        if selected {
            self.selected
        } else {
            self.dim
        }
    }
}
