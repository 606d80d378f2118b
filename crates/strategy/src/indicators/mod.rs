pub mod atr;
pub mod sma;

pub use atr::AtrIndicator;
pub use sma::{mean, SmaIndicator};

use common::{Bar, BarField};

/// Extract one numeric column from a slice of bars.
pub fn column(bars: &[Bar], field: BarField) -> Vec<f64> {
    bars.iter().map(|b| b.field(field)).collect()
}
