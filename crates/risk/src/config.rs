use serde::{Deserialize, Serialize};

/// Position sizing parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Fraction of equity lost if the initial stop is hit (e.g. 0.02 = 2%).
    pub risk_fraction: f64,
    /// Bars in the ATR average.
    pub atr_period: usize,
    /// Initial stop distance in ATR multiples.
    pub stop_multiplier: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            risk_fraction: 0.02,
            atr_period: 14,
            stop_multiplier: 2.0,
        }
    }
}

impl RiskConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.risk_fraction > 0.0 && self.risk_fraction < 1.0) {
            return Err(format!(
                "risk_fraction must be in (0, 1), got {}",
                self.risk_fraction
            ));
        }
        if self.atr_period == 0 {
            return Err("atr_period must be positive".into());
        }
        if !(self.stop_multiplier > 0.0 && self.stop_multiplier.is_finite()) {
            return Err(format!(
                "stop_multiplier must be positive, got {}",
                self.stop_multiplier
            ));
        }
        Ok(())
    }
}

/// Trailing stop parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitConfig {
    /// Bars in the moving average the stop trails.
    pub sma_period: usize,
    /// Candidate stop sits this fraction below the moving average.
    pub buffer_pct: f64,
}

impl Default for ExitConfig {
    fn default() -> Self {
        Self {
            sma_period: 10,
            buffer_pct: 0.02,
        }
    }
}

impl ExitConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.sma_period == 0 {
            return Err("sma_period must be positive".into());
        }
        if !(0.0..1.0).contains(&self.buffer_pct) {
            return Err(format!("buffer_pct must be in [0, 1), got {}", self.buffer_pct));
        }
        Ok(())
    }
}
