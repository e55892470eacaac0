//! Prices and stay dates.

use std::fmt;

use chrono::NaiveDate;
use serde::{Serialize, Serializer};

use super::error::DomainError;

/// The only currency offers are quoted in.
pub const CURRENCY: &str = "usd";

/// A non-negative amount of money in [`CURRENCY`], stored in minor units
/// (cents) so that ordering is exact.
///
/// # Examples
///
/// ```
/// use tour_server::domain::Money;
///
/// let price = Money::from_major(1250.5).unwrap();
/// assert_eq!(price.minor_units(), 125_050);
/// assert_eq!(price.to_string(), "1250.50 usd");
///
/// assert!(Money::from_major(-1.0).is_err());
/// assert!(Money::from_major(f64::NAN).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(u64);

impl Money {
    pub const fn from_minor(minor: u64) -> Self {
        Self(minor)
    }

    /// Build from an amount in major units, rounding to the nearest cent.
    pub fn from_major(amount: f64) -> Result<Self, DomainError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(DomainError::InvalidAmount(amount));
        }
        let minor = (amount * 100.0).round();
        if minor >= u64::MAX as f64 {
            return Err(DomainError::InvalidAmount(amount));
        }
        Ok(Self(minor as u64))
    }

    pub fn minor_units(self) -> u64 {
        self.0
    }

    pub fn as_major(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02} {}", self.0 / 100, self.0 % 100, CURRENCY)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_major())
    }
}

/// Validity window of an offer. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StayDates {
    start: NaiveDate,
    end: NaiveDate,
}

impl StayDates {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DomainError> {
        if end < start {
            return Err(DomainError::InvertedDates { start, end });
        }
        Ok(Self { start, end })
    }

    /// Parse from `YYYY-MM-DD` strings. A full ISO-8601 timestamp is also
    /// accepted; only its date part is kept.
    pub fn parse(start: &str, end: &str) -> Result<Self, DomainError> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of nights between start and end.
    pub fn nights(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, DomainError> {
    let date_part = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|_| DomainError::InvalidDate(s.to_string()))
}
