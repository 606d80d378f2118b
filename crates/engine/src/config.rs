use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use common::{Error, Result};
use risk::{ExitConfig, RiskConfig};
use strategy::{ScreenerConfig, SignalConfig};

/// Every decision parameter of the pipeline, loaded once at startup.
///
/// Example `config/swingbot.toml`:
/// ```toml
/// [universe]
/// symbols = ["TSLA", "MSFT"]
/// initial_equity = 100000.0
///
/// [cache]
/// capacity = 180
///
/// [risk]
/// risk_fraction = 0.02
/// ```
/// Missing sections and keys fall back to their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub universe: UniverseConfig,
    pub cache: CacheConfig,
    pub screener: ScreenerConfig,
    pub signal: SignalConfig,
    pub risk: RiskConfig,
    pub exit: ExitConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseConfig {
    pub symbols: Vec<String>,
    pub initial_equity: f64,
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            symbols: vec!["TSLA".to_string(), "MSFT".to_string()],
            initial_equity: 100_000.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Bars kept per symbol.
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 180 }
    }
}

impl EngineConfig {
    /// Read and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read engine config '{}': {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let cfg: EngineConfig = toml::from_str(content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Longest history any component needs before it can decide.
    pub fn required_history(&self) -> usize {
        self.screener
            .required_history()
            .max(self.risk.atr_period + 1)
            .max(self.exit.sma_period)
    }

    pub fn validate(&self) -> Result<()> {
        let symbols = &self.universe.symbols;
        if symbols.is_empty() {
            return Err(Error::Config("universe.symbols must not be empty".into()));
        }
        let mut seen = HashSet::new();
        for symbol in symbols {
            if symbol.trim().is_empty() {
                return Err(Error::Config("universe.symbols contains a blank symbol".into()));
            }
            if !seen.insert(symbol.as_str()) {
                return Err(Error::Config(format!("universe.symbols lists '{symbol}' twice")));
            }
        }
        if !(self.universe.initial_equity > 0.0) {
            return Err(Error::Config(format!(
                "universe.initial_equity must be positive, got {}",
                self.universe.initial_equity
            )));
        }

        self.screener
            .validate()
            .and_then(|_| self.signal.validate())
            .and_then(|_| self.risk.validate())
            .and_then(|_| self.exit.validate())
            .map_err(Error::Config)?;

        let needed = self.required_history();
        if self.cache.capacity < needed {
            return Err(Error::Config(format!(
                "cache.capacity ({}) is below the {needed} bars the pipeline looks back",
                self.cache.capacity
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = EngineConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.required_history(), 64);
        assert_eq!(cfg.cache.capacity, 180);
    }

    #[test]
    fn shipped_config_matches_defaults() {
        let cfg = EngineConfig::from_toml_str(include_str!("../../../config/swingbot.toml")).unwrap();
        let defaults = EngineConfig::default();
        assert_eq!(cfg.universe.symbols, defaults.universe.symbols);
        assert_eq!(cfg.cache.capacity, defaults.cache.capacity);
        assert_eq!(cfg.required_history(), defaults.required_history());
        assert_eq!(cfg.risk.risk_fraction, defaults.risk.risk_fraction);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = EngineConfig::from_toml_str(
            r#"
            [universe]
            symbols = ["AAPL"]

            [risk]
            risk_fraction = 0.01
            "#,
        )
        .unwrap();
        assert_eq!(cfg.universe.symbols, vec!["AAPL"]);
        assert_eq!(cfg.universe.initial_equity, 100_000.0);
        assert_eq!(cfg.risk.risk_fraction, 0.01);
        assert_eq!(cfg.risk.atr_period, 14);
        assert_eq!(cfg.exit.sma_period, 10);
    }

    #[test]
    fn empty_universe_rejected() {
        let err = EngineConfig::from_toml_str("[universe]\nsymbols = []\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn duplicate_symbol_rejected() {
        let err =
            EngineConfig::from_toml_str("[universe]\nsymbols = [\"TSLA\", \"TSLA\"]\n").unwrap_err();
        assert!(err.to_string().contains("twice"));
    }

    #[test]
    fn capacity_below_lookback_rejected() {
        let err = EngineConfig::from_toml_str("[cache]\ncapacity = 63\n").unwrap_err();
        assert!(err.to_string().contains("cache.capacity"));
        EngineConfig::from_toml_str("[cache]\ncapacity = 64\n").unwrap();
    }

    #[test]
    fn bad_component_settings_rejected() {
        for src in [
            "[risk]\nrisk_fraction = 1.5\n",
            "[risk]\nstop_multiplier = 0.0\n",
            "[exit]\nbuffer_pct = 1.0\n",
            "[screener]\nmin_consolidation_days = 10\nmax_consolidation_days = 5\n",
            "[screener]\nmin_avg_volume = nan\n",
            "[screener]\nmin_price = -1.0\n",
            "[risk]\nstop_multiplier = nan\n",
        ] {
            let err = EngineConfig::from_toml_str(src).unwrap_err();
            assert!(matches!(err, Error::Config(_)), "{src} -> {err}");
        }
    }

    #[test]
    fn malformed_toml_is_a_toml_error() {
        let err = EngineConfig::from_toml_str("[cache\ncapacity = 10").unwrap_err();
        assert!(matches!(err, Error::Toml(_)));
    }
}
