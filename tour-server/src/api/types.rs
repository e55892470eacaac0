//! Tour API response DTOs.
//!
//! These types map directly to the backend's JSON. Collections come back as
//! JSON objects keyed by id; [`KeyedList`] keeps them in the order the
//! backend sent them.

use std::fmt;
use std::marker::PhantomData;

use serde::Deserialize;
use serde::de::{Deserializer, MapAccess, Visitor};

/// A JSON object of `id → item`, kept in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedList<T>(pub Vec<(String, T)>);

impl<T> KeyedList<T> {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_values(self) -> impl Iterator<Item = T> {
        self.0.into_iter().map(|(_, v)| v)
    }
}

impl<T> Default for KeyedList<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for KeyedList<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct KeyedListVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for KeyedListVisitor<T> {
            type Value = KeyedList<T>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object keyed by id")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut items = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, value)) = access.next_entry::<String, T>()? {
                    items.push((key, value));
                }
                Ok(KeyedList(items))
            }
        }

        deserializer.deserialize_map(KeyedListVisitor(PhantomData))
    }
}

/// A country.
#[derive(Debug, Clone, Deserialize)]
pub struct CountryDto {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub flag: String,
}

/// A city.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CityDto {
    pub id: u64,
    pub name: String,
    pub country_id: String,
}

/// Hotel amenities.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HotelServicesDto {
    pub wifi: Option<String>,
    pub aquapark: Option<String>,
    pub tennis_court: Option<String>,
    pub laundry: Option<String>,
    pub parking: Option<String>,
}

/// A hotel.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelDto {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub img: String,
    pub city_id: u64,
    pub city_name: String,
    pub country_id: String,
    pub country_name: String,
    pub description: Option<String>,
    pub services: Option<HotelServicesDto>,
}

/// A destination suggestion, tagged by entity type.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GeoEntityDto {
    Country(CountryDto),
    City(CityDto),
    Hotel(HotelDto),
}

/// Reference from a price offer to its hotel. The backend sends either a
/// number or a numeric string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum HotelRefDto {
    Number(u64),
    Text(String),
}

/// A price offer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceOfferDto {
    pub id: String,
    pub amount: f64,
    pub currency: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(rename = "hotelID", default)]
    pub hotel_id: Option<HotelRefDto>,
}

/// Response from starting a price search.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSearchResponse {
    /// Correlation token for fetching or stopping this search.
    pub token: String,
    /// ISO-8601 time before which results won't be ready.
    pub wait_until: String,
}

/// Response from fetching search results.
#[derive(Debug, Clone, Deserialize)]
pub struct GetSearchPricesResponse {
    pub prices: KeyedList<PriceOfferDto>,
}

/// Response from stopping a search.
#[derive(Debug, Clone, Deserialize)]
pub struct StopSearchResponse {
    #[serde(default)]
    pub message: String,
}

/// Error body for every non-2xx response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub code: u16,
    #[serde(default)]
    pub error: bool,
    #[serde(default)]
    pub message: String,
    pub wait_until: Option<String>,
}
