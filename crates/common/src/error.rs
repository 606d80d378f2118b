use chrono::{DateTime, Utc};
use thiserror::Error;

/// Bad or missing market data for a symbol. Recoverable: the symbol is
/// skipped for the current cycle.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error("{symbol}: bar at {got} is not after last stored bar at {last}")]
    OutOfOrder {
        symbol: String,
        last: DateTime<Utc>,
        got: DateTime<Utc>,
    },

    #[error("{symbol}: have {have} bars, need {need}")]
    InsufficientHistory {
        symbol: String,
        have: usize,
        need: usize,
    },

    #[error("{symbol}: not in the configured universe")]
    UnknownSymbol { symbol: String },
}

/// No tradeable size could be derived. Recoverable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SizingError {
    #[error("{symbol}: stop distance {stop_distance} is not positive")]
    NonPositiveStopDistance { symbol: String, stop_distance: f64 },

    #[error("{symbol}: computed quantity {raw:.4} is below one unit")]
    QuantityBelowOne { symbol: String, raw: f64 },
}

/// The caller drove the portfolio into an invalid transition. Always a bug.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StateError {
    #[error("{symbol}: position already open")]
    PositionAlreadyOpen { symbol: String },

    #[error("{symbol}: no open position")]
    NoOpenPosition { symbol: String },

    #[error("{symbol}: cannot fill {quantity} shares at {price}")]
    InvalidFill {
        symbol: String,
        quantity: u64,
        price: f64,
    },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Sizing error: {0}")]
    Sizing(#[from] SizingError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Data and sizing failures skip one symbol for one cycle; everything
    /// else must be surfaced to the caller.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Data(_) | Error::Sizing(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
