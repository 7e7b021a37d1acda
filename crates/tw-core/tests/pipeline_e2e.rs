//! End-to-end pipeline scenarios: ingest through ranker output.

use std::collections::HashSet;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tw_core::clock::spawn_wall_ticker;
use tw_core::config::{Config, InputFormat};
use tw_core::ingest;
use tw_core::pipeline::Pipeline;
use tw_core::ranker::IncrementalRanker;
use tw_sketch::hash::bucket_index;

fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
}

fn reader(text: &str) -> Box<dyn std::io::BufRead + Send> {
    Box::new(Cursor::new(text.as_bytes().to_vec()))
}

/// Items that share no bucket in any sketch row, so counts are exact.
fn disjoint_items(config: &Config, want: usize) -> Vec<String> {
    let mut chosen = Vec::with_capacity(want);
    let mut used: HashSet<(usize, usize)> = HashSet::new();
    let mut serial = 0u32;
    while chosen.len() < want {
        let candidate = format!("host-{serial:04}.example");
        serial += 1;
        let cells: Vec<(usize, usize)> = (0..config.depth)
            .map(|row| (row, bucket_index(candidate.as_bytes(), row, config.width)))
            .collect();
        if cells.iter().all(|cell| !used.contains(cell)) {
            used.extend(cells);
            chosen.push(candidate);
        }
    }
    chosen
}

fn ranked(pipeline: &Pipeline, k: usize) -> Vec<(String, u32)> {
    let mut ranker = IncrementalRanker::new(k, Duration::ZERO, 0);
    let (items, did_full) = ranker.refresh(
        Utc::now(),
        0,
        || pipeline.sorted_items(),
        |slice| pipeline.update_counts(slice),
    );
    assert!(did_full);
    items.into_iter().map(|i| (i.item, i.count)).collect()
}

#[test]
fn ranker_reports_exact_frequencies() {
    let config = Config {
        k: 3,
        width: 65_536,
        ..Config::default()
    };
    let items = disjoint_items(&config, 3);
    let pipeline = Pipeline::new(&config);

    for _ in 0..100 {
        pipeline.ingest(&items[0], Utc::now());
    }
    for _ in 0..50 {
        pipeline.ingest(&items[1], Utc::now());
    }
    for _ in 0..10 {
        pipeline.ingest(&items[2], Utc::now());
    }

    let output = ranked(&pipeline, 3);
    assert_eq!(
        output,
        vec![
            (items[0].clone(), 100),
            (items[1].clone(), 50),
            (items[2].clone(), 10),
        ]
    );
}

#[test]
fn full_window_expiry_empties_the_ranking() {
    let config = Config {
        k: 3,
        width: 65_536,
        ..Config::default()
    };
    let items = disjoint_items(&config, 3);
    let pipeline = Pipeline::new(&config);
    for (at, n) in [(0, 100u32), (1, 50), (2, 10)] {
        pipeline.ingest_with_count(&items[at], n, Utc::now());
    }

    // Window is 10 ticks of 1s: advancing 10s expires everything.
    pipeline.advance_time(at(1_000));
    pipeline.advance_time(at(1_010));

    for item in &items {
        assert_eq!(pipeline.count(item), 0);
    }
    assert!(ranked(&pipeline, 3).is_empty());
}

#[test]
fn record_stream_counts_by_event_time() {
    let config = Config {
        k: 2,
        width: 65_536,
        format: InputFormat::Records,
        ..Config::default()
    };
    let pipeline = Pipeline::new(&config);
    let input = r#"
        {"item":"x","timestamp":0}
        {"item":"x","timestamp":0}
        {"item":"y","timestamp":5}
    "#;
    ingest::run(&pipeline, &config, reader(input)).unwrap();

    assert!(pipeline.data_clock_active());
    assert_eq!(pipeline.count("x"), 2);
    assert_eq!(pipeline.count("y"), 1);

    // Advancing to t=12s pushes both event times out of the 10s window.
    pipeline.advance_time(at(12));
    assert_eq!(pipeline.count("x"), 0);
    assert_eq!(pipeline.count("y"), 0);
    assert!(ranked(&pipeline, 2).is_empty());
}

#[test]
fn replay_paces_ingest_by_event_gaps() {
    let config = Config {
        format: InputFormat::Records,
        replay: true,
        replay_speed: 10.0,
        ..Config::default()
    };
    let pipeline = Pipeline::new(&config);
    // Two seconds of event time at 10x: about 200ms of wall time.
    let input = r#"{"item":"x","timestamp":0} {"item":"x","timestamp":2}"#;
    let started = Instant::now();
    ingest::run(&pipeline, &config, reader(input)).unwrap();
    assert!(started.elapsed() >= Duration::from_millis(190));
    assert_eq!(pipeline.count("x"), 2);
}

#[test]
fn replay_sleep_cap_bounds_the_delay() {
    let config = Config {
        format: InputFormat::Records,
        replay: true,
        replay_speed: 10.0,
        replay_max_sleep: Duration::from_millis(20),
        ..Config::default()
    };
    let pipeline = Pipeline::new(&config);
    let input = r#"{"item":"x","timestamp":0} {"item":"x","timestamp":60}"#;
    let started = Instant::now();
    ingest::run(&pipeline, &config, reader(input)).unwrap();
    // Uncapped this would sleep 6s; the cap brings it to 20ms.
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(pipeline.count("x"), 2);
}

#[test]
fn thousand_distinct_items_yield_k_grounded_results() {
    let config = Config {
        k: 5,
        ..Config::default()
    };
    let pipeline = Pipeline::new(&config);
    let mut ingested = HashSet::new();
    for i in 0..1000 {
        let item = format!("item-{i:04}");
        pipeline.ingest(&item, Utc::now());
        ingested.insert(item);
    }

    let output = ranked(&pipeline, 5);
    assert_eq!(output.len(), 5);
    for (item, count) in &output {
        assert!(ingested.contains(item), "unknown item {item}");
        assert_eq!(*count, 1);
    }
    // Sorted by the tie-break: item ascending among equal counts.
    for pair in output.windows(2) {
        assert!(pair[0].0 < pair[1].0);
    }
}

#[test]
fn file_input_feeds_the_text_driver() {
    use std::io::Write;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "alpha\nalpha\nbeta").unwrap();
    file.flush().unwrap();

    let config = Config {
        width: 65_536,
        input_path: Some(file.path().to_path_buf()),
        ..Config::default()
    };
    let pipeline = Pipeline::new(&config);
    let reader = ingest::open_input(config.input_path.as_deref()).unwrap();
    ingest::run(&pipeline, &config, reader).unwrap();
    assert_eq!(pipeline.count("alpha"), 2);
    assert_eq!(pipeline.count("beta"), 1);
}

#[test]
fn missing_input_file_is_an_open_error() {
    let missing = std::path::Path::new("/nonexistent/topwatch-input");
    let err = match ingest::open_input(Some(missing)) {
        Err(e) => e,
        Ok(_) => panic!("expected an error opening a missing input file"),
    };
    assert!(err.to_string().contains("failed to open"));
}

#[test]
fn wall_ticker_advances_until_data_clock_takes_over() {
    let config = Config {
        width: 256,
        tick: Duration::from_millis(20),
        window: Duration::from_millis(200),
        ..Config::default()
    };
    let pipeline = Arc::new(Pipeline::new(&config));
    let shutdown = Arc::new(AtomicBool::new(false));
    let ticker = spawn_wall_ticker(pipeline.clone(), config.tick, shutdown.clone()).unwrap();

    // Wall mode: the ticker seeds and advances the clock by itself.
    let deadline = Instant::now() + Duration::from_secs(2);
    while pipeline.latest_tick().is_none() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    assert!(pipeline.latest_tick().is_some(), "wall ticker never ticked");

    // Data mode: the ticker stands down; the tick stays where data left it.
    pipeline.activate_data_clock();
    let origin = at(500);
    pipeline.advance_time(origin);
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(pipeline.latest_tick(), Some(origin));

    shutdown.store(true, Ordering::Relaxed);
    ticker.join().unwrap();
}
