use crate::{Bar, BarOutcome, PipelineEvent, Result};

/// Callback contract between a market-data feed and the decision core.
///
/// The feed owns polling, retries and gap detection. It must deliver bars
/// for a given symbol in strictly increasing timestamp order; the handler
/// only rejects regressions, it does not dedupe across feed restarts.
pub trait BarHandler {
    /// One newly closed period for `symbol`.
    fn on_bar(&mut self, symbol: &str, bar: Bar) -> Result<BarOutcome>;

    /// Preload history without running any decisions. Returns how many bars
    /// were stored.
    fn on_history(&mut self, symbol: &str, bars: &[Bar]) -> Result<usize>;
}

/// Downstream consumer of pipeline events (console, log file, dashboard).
pub trait EventSink {
    fn emit(&mut self, event: &PipelineEvent);

    /// Push buffered events to their destination. Called once at shutdown.
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Collects events in memory; used by tests and for post-run inspection.
impl EventSink for Vec<PipelineEvent> {
    fn emit(&mut self, event: &PipelineEvent) {
        self.push(event.clone());
    }
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn emit(&mut self, event: &PipelineEvent) {
        (**self).emit(event)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        (**self).flush()
    }
}
