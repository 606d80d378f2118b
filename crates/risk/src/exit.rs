use common::{Bar, BarField, DataError, ExitReason, ExitResult, Position};
use strategy::indicators::{column, SmaIndicator};

use crate::config::ExitConfig;

/// Result of one trailing-stop evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct ExitDecision {
    pub sma: f64,
    /// `sma × (1 − buffer)` for this bar alone.
    pub candidate_stop: f64,
    /// `max(position.stop_price, candidate_stop)`; what the position's stop
    /// should be raised to.
    pub effective_stop: f64,
    pub exit: Option<ExitResult>,
}

/// Trailing stop that follows a moving average upward and never retreats.
///
/// Holds no state between calls: the ratchet lives in the position's
/// `stop_price`, which the caller raises to `effective_stop` after each
/// evaluation.
#[derive(Debug, Clone)]
pub struct ExitMonitor {
    cfg: ExitConfig,
    sma: SmaIndicator,
}

impl ExitMonitor {
    pub fn new(cfg: ExitConfig) -> Self {
        let sma = SmaIndicator::new(cfg.sma_period);
        Self { cfg, sma }
    }

    pub fn evaluate(&self, position: &Position, window: &[Bar]) -> Result<ExitDecision, DataError> {
        let insufficient = || DataError::InsufficientHistory {
            symbol: position.symbol.clone(),
            have: window.len(),
            need: self.cfg.sma_period,
        };

        let current = window.last().ok_or_else(insufficient)?;
        let sma = self
            .sma
            .compute(&column(window, BarField::Close))
            .ok_or_else(insufficient)?;

        let candidate_stop = sma * (1.0 - self.cfg.buffer_pct);
        let effective_stop = position.stop_price.max(candidate_stop);

        let exit = (current.close <= effective_stop).then(|| ExitResult {
            symbol: position.symbol.clone(),
            reason: if candidate_stop >= position.stop_price {
                ExitReason::TrailingStop
            } else {
                ExitReason::ProtectiveStop
            },
            price: current.close,
            stop_price: effective_stop,
            sma,
        });

        Ok(ExitDecision {
            sma,
            candidate_stop,
            effective_stop,
            exit,
        })
    }
}
