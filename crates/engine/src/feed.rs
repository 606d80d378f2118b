use std::collections::{BTreeMap, VecDeque};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use common::{Bar, BarHandler, Result};

use crate::pipeline::{dispatch_cycle, CycleReport};

/// One row of a bar file: `symbol,timestamp,open,high,low,close,volume`.
#[derive(Debug, Deserialize)]
struct BarRecord {
    symbol: String,
    timestamp: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

/// All bars that closed at the same instant.
#[derive(Debug, Clone, PartialEq)]
pub struct Cycle {
    pub timestamp: DateTime<Utc>,
    pub bars: Vec<(String, Bar)>,
}

/// Replays a CSV file of bars as time-ordered cycles.
///
/// Rows may appear in any order in the file; within one timestamp they keep
/// their file order.
#[derive(Debug, Clone, Default)]
pub struct CsvReplayFeed {
    cycles: VecDeque<Cycle>,
}

impl CsvReplayFeed {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut grouped: BTreeMap<DateTime<Utc>, Vec<(String, Bar)>> = BTreeMap::new();
        let mut rows = 0usize;
        for record in rdr.deserialize::<BarRecord>() {
            let r = record?;
            grouped.entry(r.timestamp).or_default().push((
                r.symbol,
                Bar {
                    timestamp: r.timestamp,
                    open: r.open,
                    high: r.high,
                    low: r.low,
                    close: r.close,
                    volume: r.volume,
                },
            ));
            rows += 1;
        }

        let cycles: VecDeque<Cycle> = grouped
            .into_iter()
            .map(|(timestamp, bars)| Cycle { timestamp, bars })
            .collect();
        info!(rows = rows, cycles = cycles.len(), "Bar file loaded");
        Ok(Self { cycles })
    }

    pub fn next_cycle(&mut self) -> Option<Cycle> {
        self.cycles.pop_front()
    }

    /// Cycles not yet handed out.
    pub fn remaining(&self) -> usize {
        self.cycles.len()
    }

    /// Remove the first `n` cycles and regroup them per symbol, oldest first.
    pub fn take_history(&mut self, n: usize) -> BTreeMap<String, Vec<Bar>> {
        let mut history: BTreeMap<String, Vec<Bar>> = BTreeMap::new();
        for _ in 0..n {
            let Some(cycle) = self.cycles.pop_front() else {
                break;
            };
            for (symbol, bar) in cycle.bars {
                history.entry(symbol).or_default().push(bar);
            }
        }
        history
    }
}

/// Totals over one feed run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedSummary {
    pub history_bars: usize,
    pub cycles: usize,
    pub bars: usize,
    pub entries: usize,
    pub exits: usize,
    pub skipped: usize,
    /// True when the run ended on a stop request rather than end of data.
    pub stopped: bool,
}

impl FeedSummary {
    fn absorb(&mut self, report: &CycleReport) {
        self.cycles += 1;
        self.bars += report.processed;
        self.entries += report.entries;
        self.exits += report.exits;
        self.skipped += report.skipped.len();
    }
}

/// Cloneable handle used to stop a running [`FeedDriver`].
#[derive(Clone)]
pub struct FeedHandle {
    stop_tx: Arc<watch::Sender<bool>>,
}

impl FeedHandle {
    pub fn stop(&self) {
        info!("Feed stop requested");
        self.stop_tx.send_replace(true);
    }
}

/// Paces cycles from a replay feed into a [`BarHandler`].
pub struct FeedDriver {
    poll_interval: Duration,
    warmup_cycles: usize,
    stop_rx: watch::Receiver<bool>,
}

impl FeedDriver {
    pub fn new(poll_interval: Duration, warmup_cycles: usize) -> (Self, FeedHandle) {
        let (stop_tx, stop_rx) = watch::channel(false);
        let driver = FeedDriver {
            poll_interval,
            warmup_cycles,
            stop_rx,
        };
        let handle = FeedHandle {
            stop_tx: Arc::new(stop_tx),
        };
        (driver, handle)
    }

    /// Preload the warm-up cycles, then dispatch one cycle per tick until the
    /// feed runs dry or a stop is requested.
    pub async fn run<H: BarHandler + ?Sized>(
        mut self,
        mut feed: CsvReplayFeed,
        handler: &mut H,
    ) -> Result<FeedSummary> {
        let mut summary = FeedSummary::default();

        for (symbol, bars) in feed.take_history(self.warmup_cycles) {
            match handler.on_history(&symbol, &bars) {
                Ok(stored) => summary.history_bars += stored,
                Err(e) if e.is_recoverable() => {
                    warn!(symbol = %symbol, error = %e, "History skipped");
                    summary.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        let mut ticker = tokio::time::interval(self.poll_interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut stop_open = true;

        info!(
            cycles = feed.remaining(),
            poll_ms = self.poll_interval.as_millis() as u64,
            "Feed started"
        );

        loop {
            if *self.stop_rx.borrow() {
                summary.stopped = true;
                break;
            }
            if feed.remaining() == 0 {
                break;
            }

            if stop_open {
                tokio::select! {
                    _ = ticker.tick() => {}
                    changed = self.stop_rx.changed() => {
                        if changed.is_err() {
                            // All handles dropped.
                            stop_open = false;
                        }
                        continue;
                    }
                }
            } else {
                ticker.tick().await;
            }

            let Some(cycle) = feed.next_cycle() else {
                break;
            };
            let report = dispatch_cycle(handler, &cycle.bars)?;
            debug!(
                at = %cycle.timestamp,
                bars = report.processed,
                entries = report.entries,
                exits = report.exits,
                "Cycle done"
            );
            summary.absorb(&report);
        }

        info!(
            cycles = summary.cycles,
            bars = summary.bars,
            entries = summary.entries,
            exits = summary.exits,
            skipped = summary.skipped,
            stopped = summary.stopped,
            "Feed finished"
        );
        Ok(summary)
    }
}
