use std::io::Write;
use std::time::Duration;

use common::{BarHandler, PipelineEvent};
use engine::{CsvReplayFeed, EngineConfig, FeedDriver, Pipeline};

fn write_bars(rows: &[(&str, u32, f64)]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "symbol,timestamp,open,high,low,close,volume").unwrap();
    for (symbol, day, close) in rows {
        writeln!(
            file,
            "{symbol},2024-02-{day:02}T00:00:00Z,{close},{},{},{close},400000",
            close + 1.0,
            close - 1.0
        )
        .unwrap();
    }
    file.flush().unwrap();
    file
}

fn pipeline() -> Pipeline<Vec<PipelineEvent>> {
    Pipeline::new(&EngineConfig::default(), Vec::new()).unwrap()
}

#[tokio::test]
async fn replays_every_cycle_after_warmup() {
    let file = write_bars(&[
        ("TSLA", 1, 200.0),
        ("MSFT", 1, 400.0),
        ("TSLA", 2, 201.0),
        ("MSFT", 2, 401.0),
        ("TSLA", 3, 202.0),
        ("NVDA", 3, 900.0),
        ("MSFT", 4, 402.0),
    ]);
    let feed = CsvReplayFeed::from_path(file.path()).unwrap();
    assert_eq!(feed.remaining(), 4);

    let (driver, _handle) = FeedDriver::new(Duration::from_millis(1), 2);
    let mut p = pipeline();
    let summary = driver.run(feed, &mut p).await.unwrap();

    assert_eq!(summary.history_bars, 4);
    assert_eq!(summary.cycles, 2);
    assert_eq!(summary.bars, 2);
    assert_eq!(summary.skipped, 1, "NVDA is outside the universe");
    assert!(!summary.stopped);

    assert_eq!(p.cache().len("TSLA"), 3);
    assert_eq!(p.cache().len("MSFT"), 3);
    let screens = p
        .sink()
        .iter()
        .filter(|e| matches!(e, PipelineEvent::Screen(_)))
        .count();
    assert_eq!(screens, 2);
}

#[tokio::test]
async fn stop_before_start_runs_nothing() {
    let file = write_bars(&[("TSLA", 1, 200.0), ("TSLA", 2, 201.0)]);
    let feed = CsvReplayFeed::from_path(file.path()).unwrap();

    let (driver, handle) = FeedDriver::new(Duration::from_millis(1), 0);
    handle.stop();
    let mut p = pipeline();
    let summary = driver.run(feed, &mut p).await.unwrap();

    assert!(summary.stopped);
    assert_eq!(summary.cycles, 0);
    assert!(p.cache().is_empty());
}

#[tokio::test]
async fn stop_mid_run_ends_the_feed() {
    let rows: Vec<(&str, u32, f64)> = (1..=28).map(|d| ("MSFT", d, 300.0 + d as f64)).collect();
    let file = write_bars(&rows);
    let feed = CsvReplayFeed::from_path(file.path()).unwrap();

    let (driver, handle) = FeedDriver::new(Duration::from_millis(50), 0);
    let stopper = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(120)).await;
        handle.stop();
    });

    let mut p = pipeline();
    let summary = driver.run(feed, &mut p).await.unwrap();
    stopper.await.unwrap();

    assert!(summary.stopped);
    assert!(summary.cycles < 28);
    assert_eq!(p.cache().len("MSFT"), summary.cycles);
}

#[test]
fn missing_file_is_an_io_error() {
    let err = CsvReplayFeed::from_path("/nonexistent/bars.csv").unwrap_err();
    assert!(matches!(err, common::Error::Io(_)));
}

#[test]
fn history_for_unknown_symbol_is_rejected() {
    let mut p = pipeline();
    assert!(p.on_history("NVDA", &[]).is_err());
}
