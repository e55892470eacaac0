//! Catalog entities: countries, cities and hotels.
//!
//! These are immutable once fetched and are shared behind `Arc` by the caches.

use serde::Serialize;

use super::ids::{CountryId, HotelId};

/// A destination country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Country {
    pub id: CountryId,
    pub name: String,
    /// Flag image URL as supplied by the backend.
    pub flag: String,
}

/// A city inside a country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct City {
    pub id: u64,
    pub name: String,
    pub country_id: CountryId,
}

/// Amenities a hotel advertises. Values are free-form ("yes", "paid", ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelServices {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wifi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aquapark: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tennis_court: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub laundry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parking: Option<String>,
}

/// A hotel in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotel {
    pub id: HotelId,
    pub name: String,
    /// Image URL.
    pub img: String,
    pub city_id: u64,
    pub city_name: String,
    pub country_id: CountryId,
    pub country_name: String,
    pub description: Option<String>,
    pub services: HotelServices,
}

/// A destination suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GeoEntity {
    Country(Country),
    City(City),
    Hotel(Hotel),
}

impl GeoEntity {
    /// Display name used for matching suggestions.
    pub fn name(&self) -> &str {
        match self {
            GeoEntity::Country(c) => &c.name,
            GeoEntity::City(c) => &c.name,
            GeoEntity::Hotel(h) => &h.name,
        }
    }

    /// The country a search should be started for when this entity is picked.
    pub fn country_id(&self) -> &CountryId {
        match self {
            GeoEntity::Country(c) => &c.id,
            GeoEntity::City(c) => &c.country_id,
            GeoEntity::Hotel(h) => &h.country_id,
        }
    }
}
