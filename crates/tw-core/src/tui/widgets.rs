//! Leaderboard, stats footer, and window label widgets.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Widget};
use tw_sketch::TopItem;

use super::theme::Theme;
use crate::metrics::MetricsSnapshot;

// ---------------------------------------------------------------------------
// Leaderboard
// ---------------------------------------------------------------------------

/// Ranked item list for the left pane.
///
/// Rows carry their rank in the full Top-K view, so a filtered view still
/// shows each item's true position.
pub struct Leaderboard<'a> {
    entries: &'a [(usize, TopItem)],
    selected: usize,
    theme: &'a Theme,
}

impl<'a> Leaderboard<'a> {
    pub fn new(entries: &'a [(usize, TopItem)], selected: usize, theme: &'a Theme) -> Self {
        Self {
            entries,
            selected,
            theme,
        }
    }

    /// Rows as (rank-prefixed label, count suffix), widest-rank aligned.
    fn rows(&self) -> Vec<(String, String)> {
        let max_rank = self
            .entries
            .iter()
            .map(|(rank, _)| rank + 1)
            .max()
            .unwrap_or(1);
        let rank_width = 1 + max_rank.ilog10() as usize;
        self.entries
            .iter()
            .map(|(rank, entry)| {
                (
                    format!("#{:<rank_width$} {}", rank + 1, entry.item),
                    format!("{}", entry.count),
                )
            })
            .collect()
    }

    /// First visible row, keeping the selection on screen.
    fn scroll_offset(&self, visible_rows: usize) -> usize {
        if visible_rows == 0 || self.entries.len() <= visible_rows {
            return 0;
        }
        let selected = self.selected.min(self.entries.len().saturating_sub(1));
        let last_start = self.entries.len() - visible_rows;
        selected.saturating_sub(visible_rows / 2).min(last_start)
    }
}

impl Widget for Leaderboard<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < 4 || area.height < 1 {
            return;
        }
        let rows = self.rows();
        let offset = self.scroll_offset(area.height as usize);
        for (row, (label, count)) in rows.iter().enumerate().skip(offset).take(area.height as usize)
        {
            let y = area.y + (row - offset) as u16;
            let style = if row == self.selected {
                self.theme.selected
            } else {
                ratatui::style::Style::default()
            };
            let count_x = area
                .right()
                .saturating_sub(count.len() as u16 + 1)
                .max(area.x);
            buf.set_stringn(area.x, y, label, (count_x - area.x) as usize, style);
            buf.set_stringn(count_x, y, count, count.len(), style);
        }
    }
}

// ---------------------------------------------------------------------------
// Stats footer
// ---------------------------------------------------------------------------

/// Runtime stats block for the footer.
pub struct StatsFooter<'a> {
    snapshot: &'a MetricsSnapshot,
    paused: bool,
    top: Option<&'a TopItem>,
    tracked: Option<&'a TopItem>,
    track_enabled: bool,
    theme: &'a Theme,
}

impl<'a> StatsFooter<'a> {
    pub fn new(snapshot: &'a MetricsSnapshot, theme: &'a Theme) -> Self {
        Self {
            snapshot,
            paused: false,
            top: None,
            tracked: None,
            track_enabled: false,
            theme,
        }
    }

    pub fn paused(mut self, paused: bool) -> Self {
        self.paused = paused;
        self
    }

    pub fn top(mut self, top: Option<&'a TopItem>) -> Self {
        self.top = top;
        self
    }

    pub fn tracked(mut self, enabled: bool, tracked: Option<&'a TopItem>) -> Self {
        self.track_enabled = enabled;
        self.tracked = tracked;
        self
    }

    /// Number of terminal rows the footer occupies.
    pub const HEIGHT: u16 = 7;

    fn lines(&self) -> Vec<String> {
        let title = if self.paused {
            "PERF STATS (PAUSED)"
        } else {
            "PERF STATS (RUNNING)"
        };
        let freshness = if self.snapshot.records == 0 {
            "n/a".to_string()
        } else if self.paused {
            "paused".to_string()
        } else {
            format_metric_duration(self.snapshot.ingest_lag)
        };
        let top = match self.top {
            Some(entry) => format!("{} ({})", entry.item, entry.count),
            None => "-".to_string(),
        };
        let tracked = if !self.track_enabled {
            "off".to_string()
        } else {
            match self.tracked {
                Some(entry) => format!("{} ({})", entry.item, entry.count),
                None => "-".to_string(),
            }
        };
        vec![
            title.to_string(),
            format!("records: {}", self.snapshot.records),
            format!("ingest rate: {} rec/s", self.snapshot.ingest_rps),
            format!(
                "pipeline lag p95: {}",
                format_metric_duration(self.snapshot.rank_lag_p95)
            ),
            format!("data freshness lag: {}", freshness),
            format!("top-1: {}", top),
            format!("track: {}", tracked),
        ]
    }
}

impl Widget for StatsFooter<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let text: Vec<Line> = self
            .lines()
            .into_iter()
            .map(|line| Line::styled(line, self.theme.stats))
            .collect();
        Paragraph::new(text).render(area, buf);
    }
}

fn format_metric_duration(d: Duration) -> String {
    format!("{:.3}ms", d.as_secs_f64() * 1e3)
}

// ---------------------------------------------------------------------------
// Window labels
// ---------------------------------------------------------------------------

/// Label line under the plot: window start, LIN/LOG indicator, window end.
pub fn window_labels<'a>(
    latest_tick: Option<DateTime<Utc>>,
    window: Duration,
    width: u16,
    log_scale: bool,
    theme: &Theme,
) -> Line<'a> {
    let (lin_style, log_style) = if log_scale {
        (theme.border, theme.selected)
    } else {
        (theme.selected, theme.border)
    };
    let scale = vec![
        Span::styled("LIN", lin_style),
        Span::raw(" "),
        Span::styled("LOG", log_style),
    ];

    let Some(latest) = latest_tick else {
        return Line::from(scale);
    };
    let start = latest - window;
    let mut left = start.to_rfc3339_opts(SecondsFormat::Secs, true);
    let mut right = latest.to_rfc3339_opts(SecondsFormat::Secs, true);
    // Fall back to short timestamps when the pane is narrow.
    if (left.len() + right.len() + 11) as u16 > width {
        left = start.format("%H:%M:%S").to_string();
        right = latest.format("%H:%M:%S").to_string();
    }
    if (left.len() + right.len() + 11) as u16 > width {
        return Line::from(scale);
    }

    let gap_total = width as usize - (left.len() + right.len() + 7);
    let gap_left = gap_total / 2;
    let gap_right = gap_total - gap_left;
    let mut spans = vec![
        Span::styled(left, theme.border),
        Span::raw(" ".repeat(gap_left)),
    ];
    spans.extend(scale);
    spans.push(Span::raw(" ".repeat(gap_right)));
    spans.push(Span::styled(right, theme.border));
    Line::from(spans)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
