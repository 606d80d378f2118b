use common::Bar;

/// Average True Range as the plain mean of the last `period` true ranges.
///
/// Every true range needs the previous close, so at least `period + 1` bars
/// are required.
#[derive(Debug, Clone)]
pub struct AtrIndicator {
    pub period: usize,
}

impl AtrIndicator {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self { period }
    }

    pub fn min_bars(&self) -> usize {
        self.period + 1
    }

    /// Compute ATR from bars (oldest first).
    /// Returns `None` if there are fewer than `period + 1` bars.
    pub fn compute(&self, bars: &[Bar]) -> Option<f64> {
        if bars.len() < self.min_bars() {
            return None;
        }
        let tail = &bars[bars.len() - self.min_bars()..];
        let sum: f64 = tail
            .windows(2)
            .map(|w| w[1].true_range(w[0].close))
            .sum();
        Some(sum / self.period as f64)
    }
}
