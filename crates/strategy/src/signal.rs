use common::{Bar, ScreenResult, Signal};

use crate::config::SignalConfig;

/// Decides whether the current bar is a confirmed breakout out of a
/// screened consolidation.
#[derive(Debug, Clone)]
pub struct SignalGenerator {
    cfg: SignalConfig,
}

impl SignalGenerator {
    pub fn new(cfg: SignalConfig) -> Self {
        Self { cfg }
    }

    /// Returns a signal when the screen passed, the current close clears the
    /// range high by the configured margin, and volume confirms the move.
    pub fn evaluate(&self, window: &[Bar], screen: &ScreenResult) -> Option<Signal> {
        if !screen.pass {
            return None;
        }
        let metrics = screen.metrics.as_ref()?;
        let current = window.last()?;

        let trigger_level = metrics.range_high * (1.0 + self.cfg.breakout_margin_pct);
        let volume_floor = metrics.avg_volume_50 * self.cfg.volume_multiple;

        if current.close > trigger_level && current.volume >= volume_floor {
            Some(Signal {
                symbol: screen.symbol.clone(),
                trigger_price: current.close,
                timestamp: current.timestamp,
                range_high: metrics.range_high,
            })
        } else {
            None
        }
    }
}
