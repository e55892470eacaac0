//! Domain types for tour search.
//!
//! This module contains the core domain model types that represent
//! validated catalog and pricing data. All types enforce their invariants at
//! construction time, so code that receives these types can trust their
//! validity.

mod catalog;
mod error;
mod ids;
mod money;
mod offer;

pub use catalog::{City, Country, GeoEntity, Hotel, HotelServices};
pub use error::DomainError;
pub use ids::{CountryId, HotelId, PriceId};
pub use money::{CURRENCY, Money, StayDates};
pub use offer::{PriceOffer, Tour};
