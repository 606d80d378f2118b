use common::{Bar, DataError, SizingError};
use strategy::indicators::AtrIndicator;

use crate::config::RiskConfig;

/// Order size and protective stop for a new entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sizing {
    pub quantity: u64,
    pub stop_distance: f64,
    /// Entry price minus stop distance.
    pub stop_price: f64,
    pub atr: f64,
    /// Equity times risk fraction.
    pub risk_amount: f64,
}

/// Fixed-fractional position sizer.
///
/// The stop sits `k × ATR` below entry and the quantity is chosen so that
/// hitting it loses roughly `risk_fraction × equity`, whatever the price level.
#[derive(Debug, Clone)]
pub struct RiskSizer {
    cfg: RiskConfig,
    atr: AtrIndicator,
}

impl RiskSizer {
    pub fn new(cfg: RiskConfig) -> Self {
        let atr = AtrIndicator::new(cfg.atr_period);
        Self { cfg, atr }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.cfg
    }

    /// ATR over the tail of `window`.
    pub fn atr(&self, symbol: &str, window: &[Bar]) -> Result<f64, DataError> {
        self.atr
            .compute(window)
            .ok_or_else(|| DataError::InsufficientHistory {
                symbol: symbol.to_string(),
                have: window.len(),
                need: self.atr.min_bars(),
            })
    }

    pub fn size(
        &self,
        symbol: &str,
        equity: f64,
        entry_price: f64,
        atr: f64,
    ) -> Result<Sizing, SizingError> {
        let stop_distance = self.cfg.stop_multiplier * atr;
        if !(stop_distance > 0.0 && stop_distance.is_finite()) {
            return Err(SizingError::NonPositiveStopDistance {
                symbol: symbol.to_string(),
                stop_distance,
            });
        }

        let risk_amount = equity * self.cfg.risk_fraction;
        let raw = risk_amount / stop_distance;
        if !(raw >= 1.0) {
            return Err(SizingError::QuantityBelowOne {
                symbol: symbol.to_string(),
                raw,
            });
        }

        Ok(Sizing {
            quantity: raw.floor() as u64,
            stop_distance,
            stop_price: entry_price - stop_distance,
            atr,
            risk_amount,
        })
    }

    /// Like [`size`](Self::size), but never spends more than `cash`.
    pub fn size_affordable(
        &self,
        symbol: &str,
        equity: f64,
        cash: f64,
        entry_price: f64,
        atr: f64,
    ) -> Result<Sizing, SizingError> {
        let mut sizing = self.size(symbol, equity, entry_price, atr)?;
        if entry_price > 0.0 && sizing.quantity as f64 * entry_price > cash {
            let affordable = (cash / entry_price).floor();
            if !(affordable >= 1.0) {
                return Err(SizingError::QuantityBelowOne {
                    symbol: symbol.to_string(),
                    raw: cash / entry_price,
                });
            }
            sizing.quantity = affordable as u64;
        }
        Ok(sizing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizer() -> RiskSizer {
        RiskSizer::new(RiskConfig::default())
    }

    #[test]
    fn two_percent_risk_with_atr_two() {
        let s = sizer().size("AAPL", 100_000.0, 50.0, 2.0).unwrap();
        assert_eq!(s.stop_distance, 4.0);
        assert_eq!(s.quantity, 500);
        assert_eq!(s.stop_price, 46.0);
        assert!((s.risk_amount - 2000.0).abs() < 1e-9);
    }

    #[test]
    fn loss_at_stop_is_independent_of_price_level() {
        for price in [5.0, 50.0, 500.0] {
            let atr = price * 0.03;
            let s = sizer().size("X", 100_000.0, price, atr).unwrap();
            let loss = s.quantity as f64 * s.stop_distance;
            assert!(loss <= 2000.0 + 1e-9, "loss {loss} at price {price}");
            assert!(loss > 2000.0 - s.stop_distance, "loss {loss} at price {price}");
        }
    }

    #[test]
    fn zero_atr_is_rejected() {
        let err = sizer().size("X", 100_000.0, 50.0, 0.0).unwrap_err();
        assert!(matches!(err, SizingError::NonPositiveStopDistance { .. }));
    }

    #[test]
    fn nan_atr_is_rejected() {
        let err = sizer().size("X", 100_000.0, 50.0, f64::NAN).unwrap_err();
        assert!(matches!(err, SizingError::NonPositiveStopDistance { .. }));
    }

    #[test]
    fn huge_atr_gives_less_than_one_unit() {
        // 2000 / 4000 = 0.5
        let err = sizer().size("X", 100_000.0, 5000.0, 2000.0).unwrap_err();
        assert!(matches!(err, SizingError::QuantityBelowOne { .. }));
    }

    #[test]
    fn cash_caps_quantity() {
        // Risk alone allows 500 units at 50 = 25k, only 10k cash available.
        let s = sizer()
            .size_affordable("X", 100_000.0, 10_000.0, 50.0, 2.0)
            .unwrap();
        assert_eq!(s.quantity, 200);
        assert_eq!(s.stop_distance, 4.0);
    }

    #[test]
    fn no_cash_means_no_trade() {
        let err = sizer()
            .size_affordable("X", 100_000.0, 10.0, 50.0, 2.0)
            .unwrap_err();
        assert!(matches!(err, SizingError::QuantityBelowOne { .. }));
    }
}
