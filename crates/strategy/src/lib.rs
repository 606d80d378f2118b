pub mod config;
pub mod indicators;
pub mod screener;
pub mod signal;

pub use config::{ScreenerConfig, SignalConfig};
pub use screener::BreakoutScreener;
pub use signal::SignalGenerator;
