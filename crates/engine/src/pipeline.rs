use std::collections::BTreeSet;

use tracing::{debug, error, info, warn};

use common::{
    Bar, BarHandler, BarOutcome, DataError, EventSink, Order, PipelineEvent, Result,
};
use portfolio::PortfolioState;
use risk::{ExitMonitor, RiskSizer};
use strategy::{BreakoutScreener, SignalGenerator};

use crate::cache::RollingBarCache;
use crate::config::EngineConfig;

/// The decision core: cache → screen → signal → size/execute → check exits.
///
/// Owns the bar cache and the portfolio; the stateless components are
/// configured once at construction. Every decision is reported to the sink.
pub struct Pipeline<S: EventSink> {
    universe: BTreeSet<String>,
    cache: RollingBarCache,
    screener: BreakoutScreener,
    signals: SignalGenerator,
    sizer: RiskSizer,
    exits: ExitMonitor,
    portfolio: PortfolioState,
    sink: S,
}

/// Tally of one dispatched cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    /// Bars that went through the pipeline without a recoverable error.
    pub processed: usize,
    pub entries: usize,
    pub exits: usize,
    /// One message per skipped symbol or skipped entry.
    pub skipped: Vec<String>,
}

impl<S: EventSink> Pipeline<S> {
    pub fn new(cfg: &EngineConfig, sink: S) -> Result<Self> {
        cfg.validate()?;
        info!(
            symbols = ?cfg.universe.symbols,
            capacity = cfg.cache.capacity,
            equity = cfg.universe.initial_equity,
            "Pipeline initialized"
        );
        Ok(Self {
            universe: cfg.universe.symbols.iter().cloned().collect(),
            cache: RollingBarCache::new(cfg.cache.capacity),
            screener: BreakoutScreener::new(cfg.screener.clone()),
            signals: SignalGenerator::new(cfg.signal.clone()),
            sizer: RiskSizer::new(cfg.risk.clone()),
            exits: ExitMonitor::new(cfg.exit.clone()),
            portfolio: PortfolioState::new(cfg.universe.initial_equity),
            sink,
        })
    }

    pub fn portfolio(&self) -> &PortfolioState {
        &self.portfolio
    }

    pub fn cache(&self) -> &RollingBarCache {
        &self.cache
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn universe(&self) -> impl Iterator<Item = &str> {
        self.universe.iter().map(String::as_str)
    }

    /// Feed one batch of bars through the pipeline with the standard error policy.
    pub fn run_cycle(&mut self, batch: &[(String, Bar)]) -> Result<CycleReport> {
        dispatch_cycle(self, batch)
    }

    fn ensure_known(&self, symbol: &str) -> Result<(), DataError> {
        if self.universe.contains(symbol) {
            Ok(())
        } else {
            Err(DataError::UnknownSymbol {
                symbol: symbol.to_string(),
            })
        }
    }

    /// Screen the symbol and, when flat and triggered, size and open a position.
    fn try_enter(&mut self, symbol: &str) -> Result<Option<Order>> {
        let window = self.cache.bars(symbol).unwrap_or_default();

        let screen = self.screener.screen(symbol, window);
        debug!(
            symbol = %symbol,
            pass = screen.pass,
            metrics = ?screen.metrics,
            "Screened"
        );
        self.sink.emit(&PipelineEvent::Screen(screen.clone()));

        if self.portfolio.has_position(symbol) {
            return Ok(None);
        }
        let Some(signal) = self.signals.evaluate(window, &screen) else {
            return Ok(None);
        };
        info!(
            symbol = %symbol,
            price = signal.trigger_price,
            range_high = signal.range_high,
            "Breakout signal"
        );
        self.sink.emit(&PipelineEvent::Signal(signal.clone()));

        let atr = self.sizer.atr(symbol, window)?;
        let sizing = self.sizer.size_affordable(
            symbol,
            self.portfolio.equity(),
            self.portfolio.cash(),
            signal.trigger_price,
            atr,
        )?;
        let order = self.portfolio.execute(&signal, &sizing)?;
        self.sink.emit(&PipelineEvent::Order(order.clone()));
        Ok(Some(order))
    }

    /// Evaluate the trailing stop of every open position.
    fn check_exits(&mut self) -> Result<Vec<Order>> {
        let mut closed = Vec::new();
        for symbol in self.portfolio.open_symbols() {
            match self.check_exit(&symbol) {
                Ok(Some(order)) => closed.push(order),
                Ok(None) => {}
                Err(e) if e.is_recoverable() => {
                    warn!(symbol = %symbol, error = %e, "Exit check skipped");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(closed)
    }

    fn check_exit(&mut self, symbol: &str) -> Result<Option<Order>> {
        let Some(position) = self.portfolio.position(symbol) else {
            return Ok(None);
        };
        let window = self.cache.bars(symbol).unwrap_or_default();
        let decision = self.exits.evaluate(position, window)?;
        let stop = self.portfolio.ratchet_stop(symbol, decision.effective_stop)?;

        let Some(exit) = decision.exit else {
            debug!(symbol = %symbol, stop = stop, sma = decision.sma, "Holding");
            return Ok(None);
        };
        // evaluate() succeeded, so the window has a current bar.
        let timestamp = window
            .last()
            .map(|b| b.timestamp)
            .ok_or_else(|| DataError::InsufficientHistory {
                symbol: symbol.to_string(),
                have: 0,
                need: 1,
            })?;

        info!(
            symbol = %symbol,
            price = exit.price,
            stop = exit.stop_price,
            reason = %exit.reason,
            "Exit triggered"
        );
        self.sink.emit(&PipelineEvent::Exit(exit.clone()));

        let (order, _) = self
            .portfolio
            .close(symbol, exit.price, timestamp, exit.reason)?;
        self.sink.emit(&PipelineEvent::Order(order.clone()));
        Ok(Some(order))
    }
}

impl<S: EventSink> BarHandler for Pipeline<S> {
    fn on_bar(&mut self, symbol: &str, bar: Bar) -> Result<BarOutcome> {
        self.ensure_known(symbol)?;
        self.cache.append(symbol, bar)?;
        self.portfolio.mark(symbol, bar.close);

        let mut outcome = BarOutcome::default();
        match self.try_enter(symbol) {
            Ok(entry) => outcome.entry = entry,
            Err(e) if e.is_recoverable() => {
                warn!(symbol = %symbol, error = %e, "Entry skipped");
                outcome.skipped = Some(e.to_string());
            }
            Err(e) => {
                error!(symbol = %symbol, error = %e, "Entry failed");
                return Err(e);
            }
        }

        outcome.exits = self.check_exits()?;
        Ok(outcome)
    }

    fn on_history(&mut self, symbol: &str, bars: &[Bar]) -> Result<usize> {
        self.ensure_known(symbol)?;
        let stored = self.cache.seed(symbol, bars)?;
        info!(symbol = %symbol, bars = stored, "History loaded");
        Ok(stored)
    }
}

/// Deliver one cycle of bars to `handler`.
///
/// Data and sizing errors skip the affected symbol for this cycle; any other
/// error stops the cycle and is returned.
pub fn dispatch_cycle<H: BarHandler + ?Sized>(
    handler: &mut H,
    batch: &[(String, Bar)],
) -> Result<CycleReport> {
    let mut report = CycleReport::default();
    for (symbol, bar) in batch {
        match handler.on_bar(symbol, *bar) {
            Ok(outcome) => {
                report.processed += 1;
                if outcome.entry.is_some() {
                    report.entries += 1;
                }
                report.exits += outcome.exits.len();
                if let Some(reason) = outcome.skipped {
                    report.skipped.push(reason);
                }
            }
            Err(e) if e.is_recoverable() => {
                warn!(symbol = %symbol, error = %e, "Symbol skipped this cycle");
                report.skipped.push(e.to_string());
            }
            Err(e) => {
                error!(symbol = %symbol, error = %e, "Cycle aborted");
                return Err(e);
            }
        }
    }
    Ok(report)
}
