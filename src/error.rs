//! Error types for the analytics engine.

use chrono::NaiveDate;
use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Error taxonomy of the analytics engine.
///
/// Validation errors are surfaced before any simulation starts and are never
/// retried. Numeric edge cases inside a running computation are resolved by
/// the documented per-component fallback instead of raising.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed input: ticker list, date range or capital.
    #[error("Invalid input: {message}")]
    InputValidation { message: String },

    /// Fewer data points than the computation requires.
    #[error("Insufficient data for {context}: need at least {required}, got {available}")]
    InsufficientData {
        context: String,
        required: usize,
        available: usize,
    },

    /// No ticker has a valid price on the first trading day of a backtest.
    #[error("No ticker has a valid price on the first trading day {date}")]
    NoStartingPrice { date: NaiveDate },
}

impl EngineError {
    /// Create an input validation error.
    pub fn input_validation(message: impl Into<String>) -> Self {
        Self::InputValidation {
            message: message.into(),
        }
    }

    /// Create an insufficient data error.
    pub fn insufficient_data(
        context: impl Into<String>,
        required: usize,
        available: usize,
    ) -> Self {
        Self::InsufficientData {
            context: context.into(),
            required,
            available,
        }
    }

    /// Create a missing starting price error.
    pub fn no_starting_price(date: NaiveDate) -> Self {
        Self::NoStartingPrice { date }
    }
}
