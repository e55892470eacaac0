//! Conversion from tour API DTOs to domain types.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::domain::{
    CURRENCY, City, Country, CountryId, DomainError, GeoEntity, Hotel, HotelId, HotelServices,
    Money, PriceId, PriceOffer, StayDates,
};

use super::backend::{SearchTicket, SearchToken};
use super::types::{
    CityDto, CountryDto, GeoEntityDto, HotelDto, HotelRefDto, HotelServicesDto, KeyedList,
    PriceOfferDto, StartSearchResponse,
};

/// Error during DTO to domain conversion.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConversionError {
    /// A field failed domain validation
    #[error("invalid {field}: {source}")]
    InvalidField {
        field: &'static str,
        source: DomainError,
    },

    /// A timestamp wasn't valid ISO-8601
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Missing required field
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

fn field(field: &'static str) -> impl FnOnce(DomainError) -> ConversionError {
    move |source| ConversionError::InvalidField { field, source }
}

/// Parse an ISO-8601 timestamp with offset into UTC.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, ConversionError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ConversionError::InvalidTimestamp(s.to_string()))
}

pub fn convert_ticket(response: &StartSearchResponse) -> Result<SearchTicket, ConversionError> {
    if response.token.is_empty() {
        return Err(ConversionError::MissingField("token"));
    }
    Ok(SearchTicket {
        token: SearchToken::new(response.token.clone()),
        ready_at: parse_timestamp(&response.wait_until)?,
    })
}

pub fn convert_country(dto: &CountryDto) -> Result<Country, ConversionError> {
    Ok(Country {
        id: CountryId::parse(&dto.id).map_err(field("country id"))?,
        name: dto.name.clone(),
        flag: dto.flag.clone(),
    })
}

pub fn convert_city(dto: &CityDto) -> Result<City, ConversionError> {
    Ok(City {
        id: dto.id,
        name: dto.name.clone(),
        country_id: CountryId::parse(&dto.country_id).map_err(field("country id"))?,
    })
}

fn convert_services(dto: Option<&HotelServicesDto>) -> HotelServices {
    let Some(dto) = dto else {
        return HotelServices::default();
    };
    HotelServices {
        wifi: dto.wifi.clone(),
        aquapark: dto.aquapark.clone(),
        tennis_court: dto.tennis_court.clone(),
        laundry: dto.laundry.clone(),
        parking: dto.parking.clone(),
    }
}

pub fn convert_hotel(dto: &HotelDto) -> Result<Hotel, ConversionError> {
    Ok(Hotel {
        id: HotelId::new(dto.id),
        name: dto.name.clone(),
        img: dto.img.clone(),
        city_id: dto.city_id,
        city_name: dto.city_name.clone(),
        country_id: CountryId::parse(&dto.country_id).map_err(field("country id"))?,
        country_name: dto.country_name.clone(),
        description: dto.description.clone(),
        services: convert_services(dto.services.as_ref()),
    })
}

pub fn convert_geo_entity(dto: &GeoEntityDto) -> Result<GeoEntity, ConversionError> {
    Ok(match dto {
        GeoEntityDto::Country(c) => GeoEntity::Country(convert_country(c)?),
        GeoEntityDto::City(c) => GeoEntity::City(convert_city(c)?),
        GeoEntityDto::Hotel(h) => GeoEntity::Hotel(convert_hotel(h)?),
    })
}

/// Resolve an offer's hotel reference. Anything that isn't a hotel id counts
/// as "no reference" rather than an error.
fn convert_hotel_ref(dto: Option<&HotelRefDto>) -> Option<HotelId> {
    match dto? {
        HotelRefDto::Number(n) => Some(HotelId::new(*n)),
        HotelRefDto::Text(s) => HotelId::parse(s).ok(),
    }
}

pub fn convert_price(dto: &PriceOfferDto) -> Result<PriceOffer, ConversionError> {
    if !dto.currency.eq_ignore_ascii_case(CURRENCY) {
        return Err(ConversionError::InvalidField {
            field: "currency",
            source: DomainError::UnsupportedCurrency(dto.currency.clone()),
        });
    }
    Ok(PriceOffer {
        id: PriceId::parse(&dto.id).map_err(field("price id"))?,
        amount: Money::from_major(dto.amount).map_err(field("amount"))?,
        dates: StayDates::parse(&dto.start_date, &dto.end_date).map_err(field("dates"))?,
        hotel_id: convert_hotel_ref(dto.hotel_id.as_ref()),
    })
}

/// Convert a keyed collection, skipping (and logging) entries that fail.
fn convert_all<D, T>(
    list: &KeyedList<D>,
    what: &'static str,
    convert: impl Fn(&D) -> Result<T, ConversionError>,
) -> Vec<T> {
    let mut results = Vec::with_capacity(list.len());
    for (key, dto) in &list.0 {
        match convert(dto) {
            Ok(item) => results.push(item),
            Err(e) => warn!(%key, error = %e, "skipping invalid {what}"),
        }
    }
    results
}

/// Convert search results, preserving the order the backend sent them in.
pub fn convert_prices(list: &KeyedList<PriceOfferDto>) -> Vec<PriceOffer> {
    convert_all(list, "price offer", convert_price)
}

pub fn convert_countries(list: &KeyedList<CountryDto>) -> Vec<Country> {
    convert_all(list, "country", convert_country)
}

pub fn convert_hotels(list: &KeyedList<HotelDto>) -> Vec<Hotel> {
    convert_all(list, "hotel", convert_hotel)
}

pub fn convert_geo_entities(list: &KeyedList<GeoEntityDto>) -> Vec<GeoEntity> {
    convert_all(list, "geo entity", convert_geo_entity)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price_dto(id: &str, amount: f64, hotel: Option<HotelRefDto>) -> PriceOfferDto {
        PriceOfferDto {
            id: id.to_string(),
            amount,
            currency: "usd".to_string(),
            start_date: "2025-06-01".to_string(),
            end_date: "2025-06-08".to_string(),
            hotel_id: hotel,
        }
    }

    #[test]
    fn converts_price_with_string_hotel_ref() {
        let offer = convert_price(&price_dto("p1", 1500.0, Some(HotelRefDto::Text("7".into()))))
            .unwrap();
        assert_eq!(offer.id.as_str(), "p1");
        assert_eq!(offer.amount, Money::from_minor(150_000));
        assert_eq!(offer.hotel_id, Some(HotelId::new(7)));
    }

    #[test]
    fn unparseable_hotel_ref_becomes_none() {
        let offer =
            convert_price(&price_dto("p1", 10.0, Some(HotelRefDto::Text("n/a".into())))).unwrap();
        assert_eq!(offer.hotel_id, None);
    }

    #[test]
    fn rejects_foreign_currency() {
        let mut dto = price_dto("p1", 10.0, None);
        dto.currency = "eur".to_string();
        let err = convert_price(&dto).unwrap_err();
        assert!(err.to_string().contains("currency"));
    }

    #[test]
    fn convert_prices_skips_invalid_and_keeps_order() {
        let list = KeyedList(vec![
            ("b".to_string(), price_dto("b", 300.0, None)),
            ("bad".to_string(), price_dto("bad", -5.0, None)),
            ("a".to_string(), price_dto("a", 100.0, None)),
        ]);
        let prices = convert_prices(&list);
        let ids: Vec<&str> = prices.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn ticket_requires_valid_timestamp() {
        let ok = StartSearchResponse {
            token: "T1".to_string(),
            wait_until: "2025-06-01T10:00:00+02:00".to_string(),
        };
        let ticket = convert_ticket(&ok).unwrap();
        assert_eq!(ticket.token.as_str(), "T1");
        assert_eq!(ticket.ready_at.to_rfc3339(), "2025-06-01T08:00:00+00:00");

        let bad = StartSearchResponse {
            token: "T1".to_string(),
            wait_until: "later".to_string(),
        };
        assert!(matches!(
            convert_ticket(&bad),
            Err(ConversionError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn hotel_without_services_gets_defaults() {
        let dto = HotelDto {
            id: 3,
            name: "Blue Bay".to_string(),
            img: String::new(),
            city_id: 1,
            city_name: "Rhodes".to_string(),
            country_id: "GR".to_string(),
            country_name: "Greece".to_string(),
            description: None,
            services: None,
        };
        let hotel = convert_hotel(&dto).unwrap();
        assert_eq!(hotel.id, HotelId::new(3));
        assert_eq!(hotel.services, HotelServices::default());
    }
}
