//! Domain error types.
//!
//! These errors represent validation failures in the domain layer.
//! They are distinct from API/IO errors.

/// Domain-level errors for validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    /// An identifier was empty or malformed
    #[error("invalid {kind} id: {value:?}")]
    InvalidId { kind: &'static str, value: String },

    /// Monetary amount was negative or not a finite number
    #[error("invalid amount: {0}")]
    InvalidAmount(f64),

    /// Only one currency is supported
    #[error("unsupported currency: {0}")]
    UnsupportedCurrency(String),

    /// Date string could not be parsed
    #[error("invalid date: {0}")]
    InvalidDate(String),

    /// Stay ends before it starts
    #[error("stay ends ({end}) before it starts ({start})")]
    InvertedDates {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },
}
