//! Tour backend client.
//!
//! This module provides the transport layer for the tour backend: a
//! [`TourApi`] trait describing the price-search protocol and catalog
//! lookups, an HTTP implementation, and an in-memory mock.
//!
//! Key characteristics of the backend:
//! - Price searches are asynchronous: starting one returns a correlation
//!   token and a time before which results won't be ready
//! - Fetching early yields a 425 "not ready" error carrying a new
//!   readiness time, which is expected rather than a failure
//! - Collections are JSON objects keyed by id, in a meaningful order

mod backend;
mod client;
mod convert;
mod error;
mod mock;
mod types;

pub use backend::{SearchTicket, SearchToken, TourApi};
pub use client::{ApiConfig, TourApiClient};
pub use convert::{ConversionError, parse_timestamp};
pub use error::{ApiError, Disposition, STATUS_NOT_READY};
pub use mock::{FetchReply, MockDataError, MockTourApi, StartReply};
pub use types::{
    CityDto, CountryDto, ErrorResponse, GeoEntityDto, GetSearchPricesResponse, HotelDto,
    HotelRefDto, HotelServicesDto, KeyedList, PriceOfferDto, StartSearchResponse,
    StopSearchResponse,
};

#[cfg(test)]
pub(crate) use mock::fixtures;
