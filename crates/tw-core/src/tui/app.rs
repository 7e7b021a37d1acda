//! Application state, terminal lifecycle, and the event loop.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use parking_lot::Mutex;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::symbols::Marker;
use ratatui::text::Line;
use ratatui::widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph};
use ratatui::{Frame, Terminal};
use tracing::info;
use tw_sketch::TopItem;

use super::theme::Theme;
use super::widgets::{window_labels, Leaderboard, StatsFooter};
use super::TuiResult;
use crate::config::Config;
use crate::pipeline::Pipeline;
use crate::refresh::TopKView;

const HELP_LINE: &str = "q quit  p pause  t/space track  s log/lin  \u{2191}/\u{2193} select";
const HELP_LINE_SEARCH: &str =
    "q quit  p pause  t/space track  s log/lin  / filter  \u{2191}/\u{2193} select";

/// The interactive viewer. Owns the terminal for the duration of `run`.
pub struct App {
    pipeline: Arc<Pipeline>,
    view: Arc<TopKView>,
    /// Fatal ingest error, set by the ingest thread.
    failure: Arc<Mutex<Option<String>>>,
    theme: Theme,

    frame_interval: Duration,
    view_split: u16,
    stats_enabled: bool,
    search_enabled: bool,
    alt_screen: bool,
    window: Duration,

    track: bool,
    log_scale: bool,
    selected: usize,
    /// Item the selection follows while tracking.
    selected_item: Option<String>,
    /// Filter input is capturing keystrokes.
    filtering: bool,
    /// Case-insensitive substring the leaderboard is filtered on.
    filter: String,
}

impl App {
    pub fn new(
        pipeline: Arc<Pipeline>,
        view: Arc<TopKView>,
        failure: Arc<Mutex<Option<String>>>,
        config: &Config,
    ) -> Self {
        Self {
            pipeline,
            view,
            failure,
            theme: Theme::default(),
            frame_interval: Duration::from_secs(1) / config.plot_fps.max(1),
            view_split: config.view_split,
            stats_enabled: config.stats_enabled,
            search_enabled: config.search_enabled,
            alt_screen: config.alt_screen,
            window: config.window,
            track: config.track_selected,
            log_scale: config.log_scale,
            selected: 0,
            selected_item: None,
            filtering: false,
            filter: String::new(),
        }
    }

    /// Run the UI until the user quits. Restores the terminal on the way out.
    pub fn run(mut self) -> TuiResult<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if self.alt_screen {
            execute!(stdout, EnterAlternateScreen)?;
        }
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        if self.alt_screen {
            execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        }
        terminal.show_cursor()?;
        info!("ui closed");
        result
    }

    fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> TuiResult<()> {
        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if event::poll(self.frame_interval)? {
                match event::read()? {
                    Event::Key(key) if key.kind != KeyEventKind::Release => {
                        if self.handle_key(key) {
                            return Ok(());
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    /// Handle one key press; returns true to quit.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if self.filtering {
            match key.code {
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    return true
                }
                KeyCode::Esc => {
                    self.filtering = false;
                    self.filter.clear();
                }
                KeyCode::Enter => self.filtering = false,
                KeyCode::Backspace => {
                    self.filter.pop();
                }
                KeyCode::Char(c) => self.filter.push(c),
                _ => {}
            }
            return false;
        }
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,
            // Esc clears an applied filter first; with none active it quits.
            KeyCode::Esc if !self.filter.is_empty() => self.filter.clear(),
            KeyCode::Esc => return true,
            KeyCode::Char('/') if self.search_enabled => {
                self.filtering = true;
                self.filter.clear();
            }
            KeyCode::Char('p') => {
                let paused = self.pipeline.toggle_pause();
                info!(paused, "pause toggled");
            }
            KeyCode::Char('t') | KeyCode::Char(' ') => self.track = !self.track,
            KeyCode::Char('s') => self.log_scale = !self.log_scale,
            KeyCode::Up => self.move_selection(-1),
            KeyCode::Down => self.move_selection(1),
            _ => {}
        }
        false
    }

    /// The filtered leaderboard view: (rank in the full Top-K, entry).
    fn visible_entries(&self, items: &[TopItem]) -> Vec<(usize, TopItem)> {
        if self.filter.is_empty() {
            return items.iter().cloned().enumerate().collect();
        }
        let needle = self.filter.to_lowercase();
        items
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.item.to_lowercase().contains(&needle))
            .map(|(rank, entry)| (rank, entry.clone()))
            .collect()
    }

    fn move_selection(&mut self, delta: isize) {
        let items = self.view.current();
        let visible = self.visible_entries(&items);
        if visible.is_empty() {
            return;
        }
        let len = visible.len() as isize;
        let at = (self.selected as isize + delta).rem_euclid(len) as usize;
        self.selected = at;
        self.selected_item = Some(visible[at].1.item.clone());
    }

    /// Clamp the selection to the visible entries; in track mode, follow the
    /// remembered item to its new position.
    fn sync_selection(&mut self, visible: &[(usize, TopItem)]) {
        if visible.is_empty() {
            self.selected = 0;
            return;
        }
        if self.track {
            if let Some(tracked) = &self.selected_item {
                if let Some(at) = visible.iter().position(|(_, entry)| &entry.item == tracked) {
                    self.selected = at;
                    return;
                }
            }
        }
        self.selected = self.selected.min(visible.len() - 1);
    }

    /// Bottom-line text: the filter input while typing, key hints otherwise.
    fn help_text(&self) -> String {
        let hints = if self.search_enabled {
            HELP_LINE_SEARCH
        } else {
            HELP_LINE
        };
        if self.filtering {
            format!("filter: {}_  (enter apply, esc clear)", self.filter)
        } else if !self.filter.is_empty() {
            format!("filter: {}  \u{2502}  {}", self.filter, hints)
        } else {
            hints.to_string()
        }
    }

    fn draw(&mut self, frame: &mut Frame) {
        let items = self.view.current();
        let visible = self.visible_entries(&items);
        self.sync_selection(&visible);

        let failure = self.failure.lock().clone();
        let error_height = u16::from(failure.is_some());
        let stats_height = if self.stats_enabled {
            StatsFooter::HEIGHT
        } else {
            0
        };
        let [main, error_area, stats_area, help_area] = Layout::vertical([
            Constraint::Min(1),
            Constraint::Length(error_height),
            Constraint::Length(stats_height),
            Constraint::Length(1),
        ])
        .areas(frame.area());
        let [left, right] = Layout::horizontal([
            Constraint::Percentage(self.view_split),
            Constraint::Min(1),
        ])
        .areas(main);

        frame.render_widget(Leaderboard::new(&visible, self.selected, &self.theme), left);
        self.draw_plot(frame, right, &visible);

        if let Some(message) = failure {
            frame.render_widget(
                Paragraph::new(Line::styled(format!("ERROR: {message}"), self.theme.error)),
                error_area,
            );
        }
        if self.stats_enabled {
            let tracked = visible.get(self.selected).map(|(_, entry)| entry);
            self.draw_stats(frame, stats_area, items.first(), tracked);
        }
        frame.render_widget(
            Paragraph::new(Line::styled(self.help_text(), self.theme.help)),
            help_area,
        );
    }

    fn draw_plot(&self, frame: &mut Frame, area: Rect, entries: &[(usize, TopItem)]) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        if inner.height < 2 || inner.width < 2 {
            return;
        }
        let [plot_area, labels_area] =
            Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(inner);

        let history_len = self.pipeline.history_len();
        let mut y_max = 1.0f64;
        let series: Vec<(bool, Vec<(f64, f64)>)> = entries
            .iter()
            .enumerate()
            .map(|(at, (_, entry))| {
                let points: Vec<(f64, f64)> = self
                    .pipeline
                    .history_for(&entry.item)
                    .into_iter()
                    .enumerate()
                    .map(|(x, count)| {
                        let mut value = f64::from(count);
                        if self.log_scale {
                            value = value.max(1.0).ln();
                        }
                        y_max = y_max.max(value);
                        (x as f64, value)
                    })
                    .collect();
                (at == self.selected, points)
            })
            .collect();

        // Selected series last, so it draws on top of the dim ones.
        let mut datasets: Vec<Dataset> = Vec::with_capacity(series.len());
        for (is_selected, points) in series.iter().filter(|(sel, _)| !sel) {
            datasets.push(
                Dataset::default()
                    .marker(Marker::Braille)
                    .graph_type(GraphType::Line)
                    .style(self.theme.series_style(*is_selected))
                    .data(points),
            );
        }
        if let Some((is_selected, points)) = series.iter().find(|(sel, _)| *sel) {
            datasets.push(
                Dataset::default()
                    .marker(Marker::Braille)
                    .graph_type(GraphType::Line)
                    .style(self.theme.series_style(*is_selected))
                    .data(points),
            );
        }

        let chart = Chart::new(datasets)
            .x_axis(Axis::default().bounds([0.0, history_len.saturating_sub(1) as f64]))
            .y_axis(Axis::default().bounds([0.0, y_max]));
        frame.render_widget(chart, plot_area);

        let labels = window_labels(
            self.pipeline.latest_tick(),
            self.window,
            labels_area.width,
            self.log_scale,
            &self.theme,
        );
        frame.render_widget(Paragraph::new(labels), labels_area);
    }

    fn draw_stats(
        &self,
        frame: &mut Frame,
        area: Rect,
        top: Option<&TopItem>,
        tracked: Option<&TopItem>,
    ) {
        let snapshot = self.pipeline.metrics().snapshot(chrono::Utc::now());
        let footer = StatsFooter::new(&snapshot, &self.theme)
            .paused(self.pipeline.is_paused())
            .top(top)
            .tracked(self.track, tracked);
        frame.render_widget(footer, area);
    }
}
