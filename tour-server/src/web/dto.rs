//! Data transfer objects for web requests and responses.

use serde::{Deserialize, Serialize};

use crate::domain::{CURRENCY, GeoEntity, Tour};
use crate::search::{SearchSession, SearchStatus};

/// Request to start a price search.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSearchRequest {
    /// Destination country id, e.g. "GR"
    pub country_id: String,
}

/// Query string for destination suggestions.
#[derive(Debug, Deserialize)]
pub struct GeoQuery {
    #[serde(default)]
    pub q: String,

    /// Ask the backend instead of the local index.
    #[serde(default)]
    pub remote: bool,
}

/// Destination suggestions.
#[derive(Debug, Serialize)]
pub struct GeoSearchResponse {
    pub results: Vec<GeoEntity>,
}

/// A tour in search results.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TourResult {
    /// Price offer id
    pub id: String,

    /// Amount in major currency units
    pub amount: f64,

    pub currency: &'static str,

    /// Check-in date, `YYYY-MM-DD`
    pub start_date: String,

    /// Check-out date, `YYYY-MM-DD`
    pub end_date: String,

    pub nights: i64,

    pub hotel: HotelSummary,
}

/// The parts of a hotel a result list needs.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelSummary {
    pub id: u64,
    pub name: String,
    pub img: String,
    pub city_name: String,
    pub country_name: String,
}

impl TourResult {
    pub fn from_tour(tour: &Tour) -> Self {
        let dates = tour.price.dates;
        Self {
            id: tour.id().to_string(),
            amount: tour.amount().as_major(),
            currency: CURRENCY,
            start_date: dates.start().format("%Y-%m-%d").to_string(),
            end_date: dates.end().format("%Y-%m-%d").to_string(),
            nights: dates.nights(),
            hotel: HotelSummary {
                id: tour.hotel.id.get(),
                name: tour.hotel.name.clone(),
                img: tour.hotel.img.clone(),
                city_name: tour.hotel.city_name.clone(),
                country_name: tour.hotel.country_name.clone(),
            },
        }
    }
}

/// The state of the current search.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub generation: u64,
    pub status: SearchStatus,
    pub country_id: Option<String>,
    pub token: Option<String>,
    pub retry_count: u32,
    pub error: Option<String>,
    /// Present once the search has succeeded, cheapest first.
    pub tours: Option<Vec<TourResult>>,
}

impl SearchResponse {
    pub fn from_session(session: &SearchSession) -> Self {
        Self {
            generation: session.generation,
            status: session.status,
            country_id: session.country.as_ref().map(|c| c.to_string()),
            token: session.token.as_ref().map(|t| t.to_string()),
            retry_count: session.retry_count,
            error: session.last_error.clone(),
            tours: session
                .tours
                .as_ref()
                .map(|tours| tours.iter().map(TourResult::from_tour).collect()),
        }
    }
}

/// Result of cancelling a search.
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    /// Whether a running search was actually cancelled
    pub cancelled: bool,

    pub search: SearchResponse,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
