//! The operations the rest of the crate needs from a tour backend.

use std::fmt;
use std::future::Future;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{Country, CountryId, GeoEntity, Hotel, HotelId, PriceOffer};

use super::error::ApiError;

/// Opaque correlation token identifying one in-flight price search.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SearchToken(String);

impl SearchToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SearchToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the backend hands back when a search starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTicket {
    pub token: SearchToken,
    /// Polling before this instant is pointless.
    pub ready_at: DateTime<Utc>,
}

/// A tour backend.
///
/// This abstraction allows the engine, caches and lookups to run against the
/// real HTTP API or an in-memory mock.
pub trait TourApi: Send + Sync + 'static {
    /// Start a price search for a country.
    fn start_search(
        &self,
        country: &CountryId,
    ) -> impl Future<Output = Result<SearchTicket, ApiError>> + Send;

    /// Fetch the results of a search. Fails with [`ApiError::NotReady`] while
    /// the backend is still computing.
    fn fetch_prices(
        &self,
        token: &SearchToken,
    ) -> impl Future<Output = Result<Vec<PriceOffer>, ApiError>> + Send;

    /// Ask the backend to abandon a search.
    fn stop_search(&self, token: &SearchToken)
    -> impl Future<Output = Result<(), ApiError>> + Send;

    fn get_countries(&self) -> impl Future<Output = Result<Vec<Country>, ApiError>> + Send;

    /// All hotels in a country.
    fn get_hotels(
        &self,
        country: &CountryId,
    ) -> impl Future<Output = Result<Vec<Hotel>, ApiError>> + Send;

    fn get_hotel(&self, id: HotelId) -> impl Future<Output = Result<Hotel, ApiError>> + Send;

    /// Backend-side destination suggestions.
    fn search_geo(&self, query: &str)
    -> impl Future<Output = Result<Vec<GeoEntity>, ApiError>> + Send;
}
