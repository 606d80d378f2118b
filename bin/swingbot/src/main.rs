use std::fs::File;
use std::io::BufWriter;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use common::{Config, EventSink};
use engine::{CsvReplayFeed, EngineConfig, FeedDriver, JsonLinesSink, Pipeline, TracingSink};

#[tokio::main]
async fn main() -> common::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env()?;
    let engine_cfg = EngineConfig::load(&cfg.config_path)?;
    info!(
        config = %cfg.config_path.display(),
        bars = %cfg.bars_path.display(),
        symbols = ?engine_cfg.universe.symbols,
        "Swingbot starting"
    );

    // ── Event sink ────────────────────────────────────────────────────────────
    let sink: Box<dyn EventSink> = match &cfg.events_path {
        Some(path) => {
            info!(path = %path.display(), "Writing events as JSON lines");
            Box::new(JsonLinesSink::new(BufWriter::new(File::create(path)?)))
        }
        None => Box::new(TracingSink),
    };

    // ── Pipeline + feed ───────────────────────────────────────────────────────
    let mut pipeline = Pipeline::new(&engine_cfg, sink)?;
    let feed = CsvReplayFeed::from_path(&cfg.bars_path)?;
    let (driver, handle) = FeedDriver::new(cfg.poll_interval, cfg.warmup_cycles);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received. Stopping feed.");
                handle.stop();
            }
            Err(e) => warn!(error = %e, "Cannot listen for Ctrl-C"),
        }
    });

    let summary = driver.run(feed, &mut pipeline).await?;
    pipeline.sink_mut().flush()?;

    // ── Report ────────────────────────────────────────────────────────────────
    let portfolio = pipeline.portfolio();
    for trade in portfolio.closed_trades() {
        info!(
            symbol = %trade.symbol,
            qty = trade.quantity,
            entry = trade.entry_price,
            exit = trade.exit_price,
            pnl = trade.pnl,
            pnl_pct = trade.pnl_pct,
            reason = %trade.reason,
            "Closed trade"
        );
    }
    for position in portfolio.positions() {
        info!(
            symbol = %position.symbol,
            qty = position.quantity,
            entry = position.entry_price,
            stop = position.stop_price,
            "Open position"
        );
    }
    info!(
        cycles = summary.cycles,
        entries = summary.entries,
        exits = summary.exits,
        cash = portfolio.cash(),
        equity = portfolio.equity(),
        realized_pnl = portfolio.realized_pnl(),
        "Swingbot finished"
    );
    Ok(())
}
