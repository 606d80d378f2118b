use serde::{Deserialize, Serialize};

/// Breakout screener thresholds.
///
/// Example `[screener]` table:
/// ```toml
/// [screener]
/// min_avg_volume = 300000.0
/// min_price = 3.0
/// min_prior_move_pct = 0.30
/// min_consolidation_days = 4
/// max_consolidation_days = 40
/// max_retracement_pct = 0.25
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScreenerConfig {
    /// Bars averaged for the liquidity check.
    pub volume_period: usize,
    /// Average volume must be strictly above this.
    pub min_avg_volume: f64,
    /// Current close must be strictly above this.
    pub min_price: f64,
    /// Setup bars searched for the prior move.
    pub move_lookback: usize,
    pub min_prior_move_pct: f64,
    /// Half-width of the consolidation band around the peak close, as a fraction.
    pub consolidation_band_pct: f64,
    pub min_consolidation_days: usize,
    pub max_consolidation_days: usize,
    /// Retracement must be strictly below this.
    pub max_retracement_pct: f64,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            volume_period: 50,
            min_avg_volume: 300_000.0,
            min_price: 3.0,
            move_lookback: 63,
            min_prior_move_pct: 0.30,
            consolidation_band_pct: 0.05,
            min_consolidation_days: 4,
            max_consolidation_days: 40,
            max_retracement_pct: 0.25,
        }
    }
}

/// Breakout confirmation thresholds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Close must exceed the range high by at least this fraction.
    pub breakout_margin_pct: f64,
    /// Current volume must be at least this multiple of the average volume.
    pub volume_multiple: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            breakout_margin_pct: 0.005,
            volume_multiple: 1.5,
        }
    }
}

impl ScreenerConfig {
    /// Bars needed before the screener can produce metrics.
    pub fn required_history(&self) -> usize {
        self.volume_period.max(self.move_lookback + 1)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.volume_period == 0 || self.move_lookback == 0 {
            return Err("screener periods must be positive".into());
        }
        if self.min_consolidation_days > self.max_consolidation_days {
            return Err(format!(
                "min_consolidation_days ({}) exceeds max_consolidation_days ({})",
                self.min_consolidation_days, self.max_consolidation_days
            ));
        }
        for (name, value) in [
            ("min_avg_volume", self.min_avg_volume),
            ("min_price", self.min_price),
            ("min_prior_move_pct", self.min_prior_move_pct),
        ] {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(format!("{name} must be a finite non-negative number, got {value}"));
            }
        }
        if !(0.0..1.0).contains(&self.consolidation_band_pct) {
            return Err("consolidation_band_pct must be in [0, 1)".into());
        }
        if !(self.max_retracement_pct > 0.0 && self.max_retracement_pct.is_finite()) {
            return Err(format!(
                "max_retracement_pct must be positive, got {}",
                self.max_retracement_pct
            ));
        }
        Ok(())
    }
}

impl SignalConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.breakout_margin_pct >= 0.0 && self.breakout_margin_pct.is_finite()) {
            return Err(format!(
                "breakout_margin_pct must not be negative, got {}",
                self.breakout_margin_pct
            ));
        }
        if !(self.volume_multiple >= 0.0 && self.volume_multiple.is_finite()) {
            return Err(format!(
                "volume_multiple must not be negative, got {}",
                self.volume_multiple
            ));
        }
        Ok(())
    }
}
