//! The state of one price search, as observers see it.

use serde::Serialize;

use crate::api::SearchToken;
use crate::domain::{CountryId, PriceOffer, Tour};

/// Where a search is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchStatus {
    /// Nothing running.
    Idle,
    /// Waiting for the backend to hand out a token.
    Searching,
    /// Token obtained; waiting for results.
    Polling,
    Success,
    Error,
}

/// A snapshot of the active search.
///
/// Only the engine mutates sessions. Everyone else gets clones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSession {
    /// Increases every time a search starts or is cancelled.
    pub generation: u64,
    pub status: SearchStatus,
    /// Destination being searched. `None` while idle.
    pub country: Option<CountryId>,
    /// Correlation token, present from `Polling` onwards.
    pub token: Option<SearchToken>,
    /// Transient fetch failures retried so far in this session.
    pub retry_count: u32,
    /// Set only in `Error`.
    pub last_error: Option<String>,
    /// Raw offers, set only in `Success`.
    pub prices: Option<Vec<PriceOffer>>,
    /// Offers joined with their hotels, cheapest first. Set only in `Success`.
    pub tours: Option<Vec<Tour>>,
}

impl SearchSession {
    pub fn idle(generation: u64) -> Self {
        Self {
            generation,
            status: SearchStatus::Idle,
            country: None,
            token: None,
            retry_count: 0,
            last_error: None,
            prices: None,
            tours: None,
        }
    }

    /// A fresh session for `country`, waiting on begin-search.
    pub fn searching(generation: u64, country: CountryId) -> Self {
        Self {
            status: SearchStatus::Searching,
            country: Some(country),
            ..Self::idle(generation)
        }
    }

    /// Searching or polling: there is work in flight that `cancel` would stop.
    pub fn is_busy(&self) -> bool {
        matches!(self.status, SearchStatus::Searching | SearchStatus::Polling)
    }

    pub fn has_results(&self) -> bool {
        self.status == SearchStatus::Success
    }

    pub fn has_error(&self) -> bool {
        self.status == SearchStatus::Error
    }
}

impl Default for SearchSession {
    fn default() -> Self {
        Self::idle(0)
    }
}
