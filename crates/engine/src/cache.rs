use std::collections::HashMap;

use tracing::warn;

use common::{Bar, BarField, DataError};

/// Fixed-capacity, time-ordered bar history per symbol.
///
/// Windows are append-only: a bar must be strictly newer than the last one
/// stored for its symbol, and once a window holds `capacity` bars every
/// append evicts the oldest. Readers only ever get `&[Bar]` views.
#[derive(Debug, Clone)]
pub struct RollingBarCache {
    capacity: usize,
    windows: HashMap<String, Vec<Bar>>,
}

impl RollingBarCache {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 1, "cache capacity must be >= 1");
        Self {
            capacity,
            windows: HashMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append one bar. Rejects duplicates and out-of-order bars without
    /// touching the stored window.
    pub fn append(&mut self, symbol: &str, bar: Bar) -> Result<(), DataError> {
        let capacity = self.capacity;
        let window = self
            .windows
            .entry(symbol.to_string())
            .or_insert_with(|| Vec::with_capacity(capacity + 1));

        if let Some(last) = window.last() {
            if bar.timestamp <= last.timestamp {
                warn!(
                    symbol = %symbol,
                    last = %last.timestamp,
                    got = %bar.timestamp,
                    "Rejected stale bar"
                );
                return Err(DataError::OutOfOrder {
                    symbol: symbol.to_string(),
                    last: last.timestamp,
                    got: bar.timestamp,
                });
            }
        }

        window.push(bar);
        if window.len() > capacity {
            window.remove(0);
        }
        Ok(())
    }

    /// Append a run of historical bars in order. Bars before the first
    /// rejected one stay stored.
    pub fn seed(&mut self, symbol: &str, bars: &[Bar]) -> Result<usize, DataError> {
        for bar in bars {
            self.append(symbol, *bar)?;
        }
        Ok(self.len(symbol))
    }

    /// Exactly the most recent `n` bars, oldest first.
    pub fn window(&self, symbol: &str, n: usize) -> Result<&[Bar], DataError> {
        let bars = self.known(symbol)?;
        if bars.len() < n {
            return Err(DataError::InsufficientHistory {
                symbol: symbol.to_string(),
                have: bars.len(),
                need: n,
            });
        }
        Ok(&bars[bars.len() - n..])
    }

    /// At most the most recent `n` bars; empty for an unseen symbol.
    pub fn window_up_to(&self, symbol: &str, n: usize) -> &[Bar] {
        let bars = self.bars(symbol).unwrap_or_default();
        &bars[bars.len().saturating_sub(n)..]
    }

    /// Everything stored for `symbol`.
    pub fn bars(&self, symbol: &str) -> Option<&[Bar]> {
        self.windows.get(symbol).map(Vec::as_slice)
    }

    /// The full stored sequence of one bar field.
    pub fn series(&self, symbol: &str, field: BarField) -> Result<Vec<f64>, DataError> {
        Ok(self.known(symbol)?.iter().map(|b| b.field(field)).collect())
    }

    pub fn last(&self, symbol: &str) -> Option<&Bar> {
        self.windows.get(symbol).and_then(|w| w.last())
    }

    pub fn len(&self, symbol: &str) -> usize {
        self.windows.get(symbol).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.windows.values().all(Vec::is_empty)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.windows.keys().map(String::as_str)
    }

    fn known(&self, symbol: &str) -> Result<&[Bar], DataError> {
        self.bars(symbol).ok_or_else(|| DataError::UnknownSymbol {
            symbol: symbol.to_string(),
        })
    }
}
