//! Runtime configuration and semantic validation.
//!
//! The CLI layer fills in a [`Config`]; [`Config::validate`] checks that the
//! values are not just well-typed but semantically coherent (window divisible
//! by tick, replay only on timestamped inputs, and so on). Validation
//! failures are fatal at startup and map to the args-error exit code.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// How the input stream is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputFormat {
    /// One line per event; the line is the item. No timestamps.
    #[default]
    Text,
    /// Access-log lines: `item - - [timestamp] ...`.
    AccessLog,
    /// JSON records `{item, count?, timestamp?}`, one document per record.
    Records,
}

/// Errors produced by semantic validation.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("k must be >= 1")]
    KTooSmall,

    #[error("width must be >= 1")]
    WidthTooSmall,

    #[error("depth must be >= 1")]
    DepthTooSmall,

    #[error("decay must be in [0, 1] (got {value})")]
    DecayOutOfRange { value: f64 },

    #[error("decay LUT size must be >= 1")]
    DecayLutTooSmall,

    #[error("tick must be > 0")]
    TickZero,

    #[error("window must be > 0")]
    WindowZero,

    #[error("window must be >= tick")]
    WindowShorterThanTick,

    #[error("window must be a multiple of tick (got window={window:?} tick={tick:?})")]
    WindowNotMultipleOfTick { window: Duration, tick: Duration },

    #[error("replay speed must be > 0 (got {value})")]
    ReplaySpeedNonPositive { value: f64 },

    #[error("replay requires --access-log or --records input")]
    ReplayNeedsTimestamps,

    #[error("choose only one input format: --access-log or --records")]
    ConflictingFormats,

    #[error("plot fps must be >= 1")]
    PlotFpsTooSmall,

    #[error("items fps must be >= 1")]
    ItemsFpsTooSmall,

    #[error("invalid duration {input:?}: expected forms like 500ms, 10s, 1m, 2h")]
    InvalidDuration { input: String },
}

/// Full runtime configuration for a `tw` run.
#[derive(Debug, Clone)]
pub struct Config {
    // Sketch
    pub k: usize,
    pub width: usize,
    pub depth: usize,
    pub decay: f64,
    pub decay_lut_size: usize,
    pub tick: Duration,
    pub window: Duration,

    // Input
    pub input_path: Option<PathBuf>,
    pub format: InputFormat,
    pub timestamp_layout: String,
    pub max_lines: u64,
    pub pace: Duration,
    pub replay: bool,
    pub replay_speed: f64,
    /// Per-record replay sleep cap; zero means uncapped.
    pub replay_max_sleep: Duration,

    // Ranker
    /// Interval between full Top-K refreshes; zero means full every refresh.
    pub full_refresh: Duration,
    /// Items refreshed per partial pass; zero means auto budget.
    pub partial_size: usize,

    // Metrics
    pub stats_enabled: bool,
    pub stats_window: usize,

    // Render
    pub plot_fps: u32,
    pub items_fps: u32,
    /// Count-only refresh rate; zero disables the extra pass.
    pub item_counts_fps: u32,
    /// Leaderboard search/filtering (`/` in the UI).
    pub search_enabled: bool,
    pub track_selected: bool,
    pub log_scale: bool,
    /// Leaderboard share of the screen width, percent.
    pub view_split: u16,
    pub alt_screen: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            k: 50,
            width: 3000,
            depth: 3,
            decay: 0.9,
            decay_lut_size: 8192,
            tick: Duration::from_secs(1),
            window: Duration::from_secs(10),

            input_path: None,
            format: InputFormat::Text,
            timestamp_layout: "%+".to_string(),
            max_lines: 0,
            pace: Duration::ZERO,
            replay: false,
            replay_speed: 1.0,
            replay_max_sleep: Duration::ZERO,

            full_refresh: Duration::from_secs(2),
            partial_size: 0,

            stats_enabled: true,
            stats_window: 256,

            plot_fps: 20,
            items_fps: 1,
            item_counts_fps: 5,
            search_enabled: true,
            track_selected: false,
            log_scale: false,
            view_split: 50,
            alt_screen: true,
        }
    }
}

impl Config {
    /// Check semantic coherence. Call before building the pipeline.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.k < 1 {
            return Err(ConfigError::KTooSmall);
        }
        if self.width < 1 {
            return Err(ConfigError::WidthTooSmall);
        }
        if self.depth < 1 {
            return Err(ConfigError::DepthTooSmall);
        }
        if !(0.0..=1.0).contains(&self.decay) {
            return Err(ConfigError::DecayOutOfRange { value: self.decay });
        }
        if self.decay_lut_size < 1 {
            return Err(ConfigError::DecayLutTooSmall);
        }
        if self.tick.is_zero() {
            return Err(ConfigError::TickZero);
        }
        if self.window.is_zero() {
            return Err(ConfigError::WindowZero);
        }
        if self.window < self.tick {
            return Err(ConfigError::WindowShorterThanTick);
        }
        if self.window.as_nanos() % self.tick.as_nanos() != 0 {
            return Err(ConfigError::WindowNotMultipleOfTick {
                window: self.window,
                tick: self.tick,
            });
        }
        if self.replay_speed <= 0.0 || !self.replay_speed.is_finite() {
            return Err(ConfigError::ReplaySpeedNonPositive {
                value: self.replay_speed,
            });
        }
        if self.replay && self.format == InputFormat::Text {
            return Err(ConfigError::ReplayNeedsTimestamps);
        }
        if self.plot_fps < 1 {
            return Err(ConfigError::PlotFpsTooSmall);
        }
        if self.items_fps < 1 {
            return Err(ConfigError::ItemsFpsTooSmall);
        }
        Ok(())
    }

    /// Clamp presentation knobs into usable ranges.
    pub fn normalize(&mut self) {
        self.view_split = self.view_split.clamp(20, 80);
        if self.stats_window < 16 {
            self.stats_window = 16;
        }
    }

    /// Ring slots per bucket: window / tick. Valid only after `validate`.
    pub fn history_len(&self) -> usize {
        (self.window.as_nanos() / self.tick.as_nanos()) as usize
    }
}

/// Parse durations like `500ms`, `10s`, `1m`, `2h`. A bare `0` is allowed.
pub fn parse_duration(input: &str) -> Result<Duration, ConfigError> {
    let trimmed = input.trim();
    let invalid = || ConfigError::InvalidDuration {
        input: input.to_string(),
    };
    if trimmed.is_empty() {
        return Err(invalid());
    }
    if trimmed == "0" {
        return Ok(Duration::ZERO);
    }
    let (value, secs_per_unit, millis) = if let Some(v) = trimmed.strip_suffix("ms") {
        (v, 0u64, true)
    } else if let Some(v) = trimmed.strip_suffix('s') {
        (v, 1, false)
    } else if let Some(v) = trimmed.strip_suffix('m') {
        (v, 60, false)
    } else if let Some(v) = trimmed.strip_suffix('h') {
        (v, 3600, false)
    } else {
        return Err(invalid());
    };
    let n: u64 = value.parse().map_err(|_| invalid())?;
    if millis {
        return Ok(Duration::from_millis(n));
    }
    n.checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(Config::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_non_multiple_window() {
        let config = Config {
            window: Duration::from_secs(10),
            tick: Duration::from_secs(3),
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::WindowNotMultipleOfTick { .. })
        ));
    }

    #[test]
    fn rejects_window_shorter_than_tick() {
        let config = Config {
            window: Duration::from_secs(1),
            tick: Duration::from_secs(2),
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::WindowShorterThanTick));
    }

    #[test]
    fn rejects_replay_without_timestamped_input() {
        let config = Config {
            replay: true,
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ReplayNeedsTimestamps));

        let replayable = Config {
            replay: true,
            format: InputFormat::AccessLog,
            ..Config::default()
        };
        assert_eq!(replayable.validate(), Ok(()));
    }

    #[test]
    fn rejects_out_of_range_scalars() {
        for (mutate, expected) in [
            (
                Box::new(|c: &mut Config| c.k = 0) as Box<dyn Fn(&mut Config)>,
                ConfigError::KTooSmall,
            ),
            (Box::new(|c: &mut Config| c.width = 0), ConfigError::WidthTooSmall),
            (Box::new(|c: &mut Config| c.depth = 0), ConfigError::DepthTooSmall),
            (
                Box::new(|c: &mut Config| c.decay = 1.5),
                ConfigError::DecayOutOfRange { value: 1.5 },
            ),
            (
                Box::new(|c: &mut Config| c.decay_lut_size = 0),
                ConfigError::DecayLutTooSmall,
            ),
            (
                Box::new(|c: &mut Config| c.replay_speed = 0.0),
                ConfigError::ReplaySpeedNonPositive { value: 0.0 },
            ),
            (Box::new(|c: &mut Config| c.plot_fps = 0), ConfigError::PlotFpsTooSmall),
            (Box::new(|c: &mut Config| c.items_fps = 0), ConfigError::ItemsFpsTooSmall),
        ] {
            let mut config = Config::default();
            mutate(&mut config);
            assert_eq!(config.validate(), Err(expected));
        }
    }

    #[test]
    fn normalize_clamps_presentation_knobs() {
        let mut config = Config {
            view_split: 5,
            stats_window: 4,
            ..Config::default()
        };
        config.normalize();
        assert_eq!(config.view_split, 20);
        assert_eq!(config.stats_window, 16);

        let mut wide = Config {
            view_split: 95,
            ..Config::default()
        };
        wide.normalize();
        assert_eq!(wide.view_split, 80);
    }

    #[test]
    fn history_len_is_window_over_tick() {
        let config = Config {
            window: Duration::from_secs(60),
            tick: Duration::from_millis(500),
            ..Config::default()
        };
        assert_eq!(config.history_len(), 120);
    }

    #[test]
    fn parses_duration_forms() {
        assert_eq!(parse_duration("500ms"), Ok(Duration::from_millis(500)));
        assert_eq!(parse_duration("10s"), Ok(Duration::from_secs(10)));
        assert_eq!(parse_duration("1m"), Ok(Duration::from_secs(60)));
        assert_eq!(parse_duration("2h"), Ok(Duration::from_secs(7200)));
        assert_eq!(parse_duration("0"), Ok(Duration::ZERO));
        assert_eq!(parse_duration(" 3s "), Ok(Duration::from_secs(3)));
        assert!(parse_duration("").is_err());
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("-5s").is_err());
        assert!(parse_duration("tens").is_err());
    }
}
