//! Identifier types.
//!
//! The backend hands out identifiers in a few shapes: country ids are short
//! opaque strings, hotel ids are integers (sometimes sent as numeric strings),
//! and price ids are opaque strings. Each gets its own type so they can't be
//! mixed up.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Identifier of a country (the destination a search is run for).
///
/// # Examples
///
/// ```
/// use tour_server::domain::CountryId;
///
/// let greece = CountryId::parse("GR").unwrap();
/// assert_eq!(greece.as_str(), "GR");
///
/// // Blank ids are rejected
/// assert!(CountryId::parse("  ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CountryId(String);

impl CountryId {
    /// Parse a country id. Surrounding whitespace is trimmed.
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(DomainError::InvalidId {
                kind: "country",
                value: s.to_string(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CountryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a hotel in the catalog.
///
/// # Examples
///
/// ```
/// use tour_server::domain::HotelId;
///
/// assert_eq!(HotelId::parse("7953").unwrap(), HotelId::new(7953));
/// assert!(HotelId::parse("hotel-1").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HotelId(u64);

impl HotelId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Parse a hotel id from its decimal string form.
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| DomainError::InvalidId {
                kind: "hotel",
                value: s.to_string(),
            })
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HotelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a price offer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceId(String);

impl PriceId {
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        if s.trim().is_empty() {
            return Err(DomainError::InvalidId {
                kind: "price",
                value: s.to_string(),
            });
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PriceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
