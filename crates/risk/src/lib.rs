pub mod config;
pub mod exit;
pub mod sizer;

pub use config::{ExitConfig, RiskConfig};
pub use exit::{ExitDecision, ExitMonitor};
pub use sizer::{RiskSizer, Sizing};
