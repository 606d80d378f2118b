use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One closed OHLCV period for a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    pub fn field(&self, field: BarField) -> f64 {
        match field {
            BarField::Open => self.open,
            BarField::High => self.high,
            BarField::Low => self.low,
            BarField::Close => self.close,
            BarField::Volume => self.volume,
        }
    }
}

/// A numeric column of a bar, used to extract indicator input series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BarField {
    Open,
    High,
    Low,
    Close,
    Volume,
}

/// Side of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Orders are applied to the portfolio the moment they are created, so the
/// only status an order can carry is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Filled,
}

/// Record of one execute or close action. Appended to the order log, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: u64,
    pub price: f64,
    pub status: OrderStatus,
    pub timestamp: DateTime<Utc>,
}

impl Order {
    pub fn filled(
        symbol: impl Into<String>,
        side: OrderSide,
        quantity: u64,
        price: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            symbol: symbol.into(),
            side,
            quantity,
            price,
            status: OrderStatus::Filled,
            timestamp,
        }
    }

    pub fn notional(&self) -> f64 {
        self.quantity as f64 * self.price
    }
}

/// An open long position. At most one exists per symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: u64,
    pub entry_price: f64,
    pub entry_timestamp: DateTime<Utc>,
    /// Only ever raised, never lowered.
    pub stop_price: f64,
    /// Highest close observed since entry.
    pub high_water_mark: f64,
}

impl Position {
    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity as f64 * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.quantity as f64 * (price - self.entry_price)
    }
}

/// A completed round trip, recorded when a position is closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub symbol: String,
    pub quantity: u64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub entry_timestamp: DateTime<Utc>,
    pub exit_timestamp: DateTime<Utc>,
    pub pnl: f64,
    /// Percent, e.g. 12.5 for a 12.5% gain.
    pub pnl_pct: f64,
    pub reason: ExitReason,
}

/// Diagnostics computed by the breakout screener.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenMetrics {
    pub avg_volume_50: f64,
    pub prior_move_pct: f64,
    pub consolidation_days: usize,
    pub retracement_pct: f64,
    /// Close of the move's peak bar.
    pub peak_close: f64,
    /// Lowest close at or before the peak inside the move lookback.
    pub trough_close: f64,
    /// Highest high from the peak bar through the last setup bar.
    pub range_high: f64,
    pub current_close: f64,
    pub current_volume: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenResult {
    pub symbol: String,
    pub pass: bool,
    /// `None` when history was too short or the move was degenerate.
    pub metrics: Option<ScreenMetrics>,
}

impl ScreenResult {
    pub fn fail_closed(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            pass: false,
            metrics: None,
        }
    }
}

/// Entry trigger emitted by the signal generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub trigger_price: f64,
    pub timestamp: DateTime<Utc>,
    /// Consolidation-range high the close broke above.
    pub range_high: f64,
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// The moving-average derived stop was the binding level.
    TrailingStop,
    /// The stop set at entry (or a previously ratcheted level) was binding.
    ProtectiveStop,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitReason::TrailingStop => write!(f, "trailing_stop"),
            ExitReason::ProtectiveStop => write!(f, "protective_stop"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitResult {
    pub symbol: String,
    pub reason: ExitReason,
    pub price: f64,
    pub stop_price: f64,
    pub sma: f64,
}

/// Records handed to the downstream telemetry collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    Screen(ScreenResult),
    Signal(Signal),
    Exit(ExitResult),
    Order(Order),
}

/// What happened to one symbol on one bar.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BarOutcome {
    pub entry: Option<Order>,
    pub exits: Vec<Order>,
    /// Set when the entry path was skipped for a recoverable reason.
    pub skipped: Option<String>,
}
