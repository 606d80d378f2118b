pub mod config;
pub mod error;
pub mod handler;
pub mod types;

pub use config::Config;
pub use error::{DataError, Error, Result, SizingError, StateError};
pub use handler::{BarHandler, EventSink};
pub use types::*;
