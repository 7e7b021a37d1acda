//! tw - live Top-K viewer for event streams.
//!
//! Pipes a text stream, access log, or JSON record stream into the
//! sliding-window Top-K sketch and shows the leaderboard, per-item
//! trajectories, and runtime stats in a terminal UI.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use parking_lot::Mutex;
use tracing::{error, info};

use tw_core::clock::spawn_wall_ticker;
use tw_core::config::{parse_duration, Config, ConfigError, InputFormat};
use tw_core::error::Error;
use tw_core::exit_codes::ExitCode;
use tw_core::ingest::{self, IngestError};
use tw_core::logging::init_logging;
use tw_core::pipeline::Pipeline;
use tw_core::refresh::{spawn_refresher, RefreshSettings, TopKView};
use tw_core::tui::App;

/// Live Top-K viewer for event streams.
#[derive(Parser, Debug)]
#[command(name = "tw", version, about, long_about = None)]
struct Cli {
    /// Track the top K items
    #[arg(short = 'k', long = "k", default_value_t = 50)]
    k: usize,

    /// Sketch width (buckets per row)
    #[arg(long, default_value_t = 3000)]
    width: usize,

    /// Sketch depth (independent hash rows)
    #[arg(long, default_value_t = 3)]
    depth: usize,

    /// Sliding window size
    #[arg(long, default_value = "10s", value_parser = duration_arg)]
    window: Duration,

    /// Sliding window tick size (time bucket precision)
    #[arg(long, default_value = "1s", value_parser = duration_arg)]
    tick: Duration,

    /// Counter decay probability on collisions
    #[arg(long, default_value_t = 0.9)]
    decay: f64,

    /// Decay look-up table size
    #[arg(long = "decay-lut-size", default_value_t = 8192)]
    decay_lut_size: usize,

    /// Read input from this file instead of stdin
    #[arg(long = "in", value_name = "FILE")]
    input: Option<PathBuf>,

    /// Stop after this many records (0 = unlimited)
    #[arg(long = "max-lines", default_value_t = 0)]
    max_lines: u64,

    /// Sleep between input records (e.g. 5ms, 50ms)
    #[arg(long, default_value = "0", value_parser = duration_arg)]
    pace: Duration,

    /// Replay timestamped input in (scaled) real time
    /// (requires --access-log or --records)
    #[arg(long)]
    replay: bool,

    /// Replay speed factor (1 = real time, 2 = twice as fast)
    #[arg(long = "replay-speed", default_value_t = 1.0)]
    replay_speed: f64,

    /// Cap per-record replay sleep (0 = no cap)
    #[arg(long = "replay-max-sleep", default_value = "0", value_parser = duration_arg)]
    replay_max_sleep: Duration,

    /// Parse access-log lines into {item, timestamp} records (item = client address)
    #[arg(long = "access-log")]
    access_log: bool,

    /// Read JSON records {item, [count], [timestamp]} instead of text lines
    #[arg(long)]
    records: bool,

    /// Layout for string timestamp values (strftime)
    #[arg(long = "timestamp-layout", default_value = "%+")]
    timestamp_layout: String,

    /// How often to do a full Top-K refresh (0 = every refresh)
    #[arg(long = "full-refresh", default_value = "2s", value_parser = duration_arg)]
    full_refresh: Duration,

    /// Items to partially refresh per pass (0 = auto, about half of K)
    #[arg(long = "partial-size", default_value_t = 0)]
    partial_size: usize,

    /// Hide the runtime stats footer
    #[arg(long = "no-stats")]
    no_stats: bool,

    /// Recent samples kept per metric
    #[arg(long = "stats-window", default_value_t = 256)]
    stats_window: usize,

    /// Plot refresh rate (frames per second)
    #[arg(long = "plot-fps", default_value_t = 20)]
    plot_fps: u32,

    /// Leaderboard refresh rate (frames per second)
    #[arg(long = "items-fps", default_value_t = 1)]
    items_fps: u32,

    /// Count-only refresh rate (frames per second; 0 disables)
    #[arg(long = "item-counts-fps", default_value_t = 5)]
    item_counts_fps: u32,

    /// Disable search/filtering in the leaderboard
    #[arg(long = "no-search")]
    no_search: bool,

    /// Keep the selected item focused as ranks change
    #[arg(long = "track-selected")]
    track_selected: bool,

    /// Use a logarithmic Y axis (default: linear)
    #[arg(long = "log-scale")]
    log_scale: bool,

    /// Split the view at this % of the screen width [20, 80]
    #[arg(long = "view-split", default_value_t = 50)]
    view_split: u16,

    /// Disable the terminal alternate screen buffer
    #[arg(long = "no-alt-screen")]
    no_alt_screen: bool,
}

fn duration_arg(raw: &str) -> Result<Duration, String> {
    parse_duration(raw).map_err(|err| err.to_string())
}

impl Cli {
    fn into_config(self) -> Result<Config, ConfigError> {
        let format = match (self.access_log, self.records) {
            (true, true) => return Err(ConfigError::ConflictingFormats),
            (true, false) => InputFormat::AccessLog,
            (false, true) => InputFormat::Records,
            (false, false) => InputFormat::Text,
        };
        Ok(Config {
            k: self.k,
            width: self.width,
            depth: self.depth,
            decay: self.decay,
            decay_lut_size: self.decay_lut_size,
            tick: self.tick,
            window: self.window,
            input_path: self.input,
            format,
            timestamp_layout: self.timestamp_layout,
            max_lines: self.max_lines,
            pace: self.pace,
            replay: self.replay,
            replay_speed: self.replay_speed,
            replay_max_sleep: self.replay_max_sleep,
            full_refresh: self.full_refresh,
            partial_size: self.partial_size,
            stats_enabled: !self.no_stats,
            stats_window: self.stats_window,
            plot_fps: self.plot_fps,
            items_fps: self.items_fps,
            item_counts_fps: self.item_counts_fps,
            search_enabled: !self.no_search,
            track_selected: self.track_selected,
            log_scale: self.log_scale,
            view_split: self.view_split,
            alt_screen: !self.no_alt_screen,
        })
    }
}

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("tw: {err}");
            exit_code_for(&err)
        }
    };
    std::process::exit(code.as_i32());
}

fn exit_code_for(err: &Error) -> ExitCode {
    match err {
        Error::Config(_) => ExitCode::ArgsError,
        Error::Ingest(IngestError::Open { .. } | IngestError::StdinIsTty) => ExitCode::InputError,
        Error::Ingest(_) => ExitCode::IngestError,
        Error::Tui(_) | Error::Io(_) => ExitCode::IoError,
    }
}

fn run() -> Result<ExitCode, Error> {
    let cli = Cli::parse();
    let mut config = cli.into_config()?;
    config.validate()?;
    config.normalize();

    init_logging();
    info!(
        k = config.k,
        width = config.width,
        depth = config.depth,
        window = ?config.window,
        tick = ?config.tick,
        "starting"
    );

    let reader = ingest::open_input(config.input_path.as_deref())?;

    let pipeline = Arc::new(Pipeline::new(&config));
    let view = Arc::new(TopKView::new());
    let failure: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
    let shutdown = Arc::new(AtomicBool::new(false));

    // Ingest runs detached: it may be blocked on a read at shutdown, and the
    // process exit reclaims it. In-flight events may be dropped.
    {
        let pipeline = pipeline.clone();
        let config = config.clone();
        let failure = failure.clone();
        std::thread::Builder::new()
            .name("tw-ingest".to_string())
            .spawn(move || match ingest::run(&pipeline, &config, reader) {
                Ok(()) => info!("ingest finished"),
                Err(err) => {
                    error!(error = %err, "ingest failed");
                    *failure.lock() = Some(err.to_string());
                }
            })?;
    }

    let ticker = spawn_wall_ticker(pipeline.clone(), config.tick, shutdown.clone())?;
    let refresher = spawn_refresher(
        pipeline.clone(),
        view.clone(),
        RefreshSettings::from_config(&config),
        shutdown.clone(),
    )?;

    let app = App::new(pipeline, view, failure.clone(), &config);
    let ui_result = app.run();

    shutdown.store(true, Ordering::Relaxed);
    let _ = ticker.join();
    let _ = refresher.join();

    ui_result?;
    if let Some(message) = failure.lock().as_ref() {
        eprintln!("tw: ingest error: {message}");
        return Ok(ExitCode::IngestError);
    }
    Ok(ExitCode::Clean)
}
