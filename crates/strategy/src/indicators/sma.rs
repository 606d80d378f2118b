/// Simple Moving Average over the most recent `period` values.
#[derive(Debug, Clone)]
pub struct SmaIndicator {
    pub period: usize,
}

impl SmaIndicator {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self { period }
    }

    /// Mean of the last `period` values (oldest first).
    /// Returns `None` if there are fewer than `period` values.
    pub fn compute(&self, values: &[f64]) -> Option<f64> {
        if values.len() < self.period {
            return None;
        }
        mean(&values[values.len() - self.period..])
    }
}

/// Arithmetic mean. `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_returns_none_when_insufficient_data() {
        let sma = SmaIndicator::new(10);
        assert!(sma.compute(&[100.0; 9]).is_none());
    }

    #[test]
    fn sma_uses_only_the_tail() {
        let sma = SmaIndicator::new(3);
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let v = sma.compute(&values).unwrap();
        assert!((v - 4.0).abs() < 1e-12, "Expected 4, got {v}");
    }

    #[test]
    fn mean_of_empty_is_none() {
        assert!(mean(&[]).is_none());
        assert_eq!(mean(&[2.0, 4.0]), Some(3.0));
    }
}
