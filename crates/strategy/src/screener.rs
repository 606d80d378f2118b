use common::{Bar, ScreenMetrics, ScreenResult};

use crate::config::ScreenerConfig;
use crate::indicators::mean;

/// Liquidity and pattern filter for breakout setups.
///
/// The last bar of the window is the *current* bar; every bar before it is
/// the *setup*. The setup must show a strong prior move followed by a tight
/// consolidation near the peak, and the current close must not have given
/// back too much of the move. Short or degenerate history fails closed.
#[derive(Debug, Clone)]
pub struct BreakoutScreener {
    cfg: ScreenerConfig,
}

impl BreakoutScreener {
    pub fn new(cfg: ScreenerConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &ScreenerConfig {
        &self.cfg
    }

    pub fn screen(&self, symbol: &str, window: &[Bar]) -> ScreenResult {
        match self.metrics(window) {
            Some(metrics) => ScreenResult {
                symbol: symbol.to_string(),
                pass: self.passes(&metrics),
                metrics: Some(metrics),
            },
            None => ScreenResult::fail_closed(symbol),
        }
    }

    /// Apply the thresholds to already computed metrics.
    pub fn passes(&self, m: &ScreenMetrics) -> bool {
        let cfg = &self.cfg;
        m.avg_volume_50 > cfg.min_avg_volume
            && m.current_close > cfg.min_price
            && m.prior_move_pct >= cfg.min_prior_move_pct
            && (cfg.min_consolidation_days..=cfg.max_consolidation_days)
                .contains(&m.consolidation_days)
            && m.retracement_pct < cfg.max_retracement_pct
    }

    /// Compute screen metrics, or `None` when there is not enough history
    /// or the lookback holds no upward move.
    pub fn metrics(&self, window: &[Bar]) -> Option<ScreenMetrics> {
        let cfg = &self.cfg;
        if window.len() < cfg.required_history() {
            return None;
        }

        let (setup, current) = window.split_at(window.len() - 1);
        let current = current[0];

        let volumes: Vec<f64> = window[window.len() - cfg.volume_period..]
            .iter()
            .map(|b| b.volume)
            .collect();
        let avg_volume_50 = mean(&volumes)?;

        let lookback = &setup[setup.len() - cfg.move_lookback..];

        let band = cfg.consolidation_band_pct;
        let in_band =
            |anchor: f64, b: &Bar| b.low >= anchor * (1.0 - band) && b.high <= anchor * (1.0 + band);

        // The move's peak is the earliest running-high close that every later
        // setup bar consolidates around. Bars inside the band may close above it.
        let mut running_high = f64::NEG_INFINITY;
        let mut anchored = None;
        for (i, b) in lookback.iter().enumerate() {
            if b.close >= running_high {
                running_high = b.close;
                if lookback[i + 1..].iter().all(|later| in_band(b.close, later)) {
                    anchored = Some(i);
                    break;
                }
            }
        }
        // No bar anchors a clean streak: fall back to the earliest highest close.
        let peak_idx = anchored.unwrap_or_else(|| {
            lookback
                .iter()
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |(best_idx, best), (i, b)| {
                    if b.close > best {
                        (i, b.close)
                    } else {
                        (best_idx, best)
                    }
                })
                .0
        });
        let peak_close = lookback[peak_idx].close;
        let trough_close = lookback[..=peak_idx]
            .iter()
            .map(|b| b.close)
            .fold(f64::INFINITY, f64::min);

        if trough_close <= 0.0 || peak_close <= trough_close {
            return None;
        }

        let consolidation_days = lookback[peak_idx + 1..]
            .iter()
            .rev()
            .take_while(|b| in_band(peak_close, *b))
            .count();

        let range_high = lookback[peak_idx..]
            .iter()
            .map(|b| b.high)
            .fold(f64::NEG_INFINITY, f64::max);

        let move_size = peak_close - trough_close;

        Some(ScreenMetrics {
            avg_volume_50,
            prior_move_pct: move_size / trough_close,
            consolidation_days,
            retracement_pct: (peak_close - current.close) / move_size,
            peak_close,
            trough_close,
            range_high,
            current_close: current.close,
            current_volume: current.volume,
        })
    }
}
