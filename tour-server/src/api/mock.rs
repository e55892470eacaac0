//! Mock tour backend for testing without a live API.
//!
//! Holds an in-memory catalog (optionally loaded from a JSON fixture) and
//! emulates the price-search protocol: results stay "not ready" (425 with a
//! `waitUntil`) until the search's readiness time, then one offer per hotel
//! in the searched country is returned. Tests can queue scripted replies
//! that take precedence over the emulated behavior.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, Days, TimeDelta, Utc};
use parking_lot::Mutex;
use serde::Deserialize;

use crate::clock::{Clock, SystemClock};
use crate::domain::{
    City, Country, CountryId, GeoEntity, Hotel, HotelId, Money, PriceId, PriceOffer, StayDates,
};

use super::backend::{SearchTicket, SearchToken, TourApi};
use super::convert::{ConversionError, convert_city, convert_country, convert_hotel};
use super::error::ApiError;
use super::types::{CityDto, CountryDto, HotelDto, KeyedList};

/// Default time between starting a search and its results being ready.
const DEFAULT_READY_AFTER: Duration = Duration::from_secs(2);

/// Errors loading mock data.
#[derive(Debug, thiserror::Error)]
pub enum MockDataError {
    #[error("failed to read mock data: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse mock data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid mock data: {0}")]
    Invalid(#[from] ConversionError),
}

/// Fixture file layout: the same keyed objects the real API returns.
#[derive(Debug, Deserialize)]
struct MockFixture {
    countries: KeyedList<CountryDto>,
    #[serde(default)]
    cities: KeyedList<CityDto>,
    #[serde(default)]
    hotels: KeyedList<HotelDto>,
}

/// A scripted reply to `start_search`.
#[derive(Debug, Clone)]
pub enum StartReply {
    /// Hand out this token, ready after `ready_in` (may be negative to
    /// simulate a readiness time already in the past).
    Ticket { token: String, ready_in: TimeDelta },
    /// Fail with this status code and message.
    Fail { status: u16, message: String },
}

/// A scripted reply to `fetch_prices`.
#[derive(Debug, Clone)]
pub enum FetchReply {
    Prices(Vec<PriceOffer>),
    /// 425, optionally with a readiness time `ready_in` from now.
    NotReady { ready_in: Option<TimeDelta> },
    Fail { status: u16, message: String },
}

#[derive(Debug, Clone)]
struct MockSearch {
    country: CountryId,
    ready_at: DateTime<Utc>,
    stopped: bool,
}

#[derive(Debug, Default)]
struct MockCatalog {
    countries: BTreeMap<CountryId, Country>,
    cities: Vec<City>,
    hotels: BTreeMap<HotelId, Hotel>,
}

#[derive(Debug, Default)]
struct CallCounts {
    start: AtomicUsize,
    fetch: AtomicUsize,
    hotel: AtomicUsize,
    hotels: AtomicUsize,
    countries: AtomicUsize,
}

struct MockState {
    catalog: Mutex<MockCatalog>,
    searches: Mutex<HashMap<SearchToken, MockSearch>>,
    start_script: Mutex<VecDeque<StartReply>>,
    fetch_script: Mutex<VecDeque<FetchReply>>,
    stopped: Mutex<Vec<SearchToken>>,
    fail_stop: Mutex<bool>,
    ready_after: Mutex<Duration>,
    latency: Mutex<Duration>,
    next_token: AtomicU64,
    calls: CallCounts,
    clock: Arc<dyn Clock>,
}

/// In-memory tour backend.
#[derive(Clone)]
pub struct MockTourApi {
    state: Arc<MockState>,
}

impl MockTourApi {
    /// Create an empty mock using the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty mock reading time from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(MockState {
                catalog: Mutex::new(MockCatalog::default()),
                searches: Mutex::new(HashMap::new()),
                start_script: Mutex::new(VecDeque::new()),
                fetch_script: Mutex::new(VecDeque::new()),
                stopped: Mutex::new(Vec::new()),
                fail_stop: Mutex::new(false),
                ready_after: Mutex::new(DEFAULT_READY_AFTER),
                latency: Mutex::new(Duration::ZERO),
                next_token: AtomicU64::new(1),
                calls: CallCounts::default(),
                clock,
            }),
        }
    }

    /// Load a catalog fixture from a JSON file.
    pub fn from_file(path: impl AsRef<Path>, clock: Arc<dyn Clock>) -> Result<Self, MockDataError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json, clock)
    }

    /// Load a catalog fixture from a JSON string.
    pub fn from_json(json: &str, clock: Arc<dyn Clock>) -> Result<Self, MockDataError> {
        let fixture: MockFixture = serde_json::from_str(json)?;
        let mock = Self::with_clock(clock);
        for dto in fixture.countries.into_values() {
            mock.add_country(convert_country(&dto)?);
        }
        for dto in fixture.cities.into_values() {
            mock.add_city(convert_city(&dto)?);
        }
        for dto in fixture.hotels.into_values() {
            mock.add_hotel(convert_hotel(&dto)?);
        }
        Ok(mock)
    }

    pub fn add_country(&self, country: Country) {
        self.state
            .catalog
            .lock()
            .countries
            .insert(country.id.clone(), country);
    }

    pub fn add_city(&self, city: City) {
        self.state.catalog.lock().cities.push(city);
    }

    pub fn add_hotel(&self, hotel: Hotel) {
        self.state.catalog.lock().hotels.insert(hotel.id, hotel);
    }

    /// Set how long emulated searches take to become ready.
    pub fn set_ready_after(&self, ready_after: Duration) {
        *self.state.ready_after.lock() = ready_after;
    }

    /// Make `start_search`, `fetch_prices` and `get_hotel` take `latency`
    /// to answer. The call is counted when it arrives, not when it returns.
    pub fn set_latency(&self, latency: Duration) {
        *self.state.latency.lock() = latency;
    }

    /// Queue a reply for the next unscripted `start_search`.
    pub fn push_start(&self, reply: StartReply) {
        self.state.start_script.lock().push_back(reply);
    }

    /// Queue a reply for the next `fetch_prices`.
    pub fn push_fetch(&self, reply: FetchReply) {
        self.state.fetch_script.lock().push_back(reply);
    }

    /// Make `stop_search` fail.
    pub fn fail_stop(&self, fail: bool) {
        *self.state.fail_stop.lock() = fail;
    }

    pub fn start_calls(&self) -> usize {
        self.state.calls.start.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.state.calls.fetch.load(Ordering::SeqCst)
    }

    pub fn hotel_calls(&self) -> usize {
        self.state.calls.hotel.load(Ordering::SeqCst)
    }

    pub fn hotels_calls(&self) -> usize {
        self.state.calls.hotels.load(Ordering::SeqCst)
    }

    pub fn countries_calls(&self) -> usize {
        self.state.calls.countries.load(Ordering::SeqCst)
    }

    /// Tokens `stop_search` has been called with, in call order.
    pub fn stopped_tokens(&self) -> Vec<SearchToken> {
        self.state.stopped.lock().clone()
    }

    async fn respond_later(&self) {
        let latency = *self.state.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }

    fn offset(&self, delta: TimeDelta) -> DateTime<Utc> {
        self.state
            .clock
            .now()
            .checked_add_signed(delta)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// One offer per hotel in the country, priced deterministically from the
    /// hotel id.
    fn generate_offers(&self, token: &SearchToken, country: &CountryId) -> Vec<PriceOffer> {
        let start = self.state.clock.now().date_naive() + Days::new(14);
        let end = start + Days::new(7);
        let catalog = self.state.catalog.lock();
        catalog
            .hotels
            .values()
            .filter(|h| &h.country_id == country)
            .filter_map(|hotel| {
                let dollars = 400 + hotel.id.get().wrapping_mul(7919) % 3000;
                Some(PriceOffer {
                    id: PriceId::parse(&format!("{token}-{}", hotel.id)).ok()?,
                    amount: Money::from_minor(dollars * 100),
                    dates: StayDates::new(start, end).ok()?,
                    hotel_id: Some(hotel.id),
                })
            })
            .collect()
    }
}

impl Default for MockTourApi {
    fn default() -> Self {
        Self::new()
    }
}

impl TourApi for MockTourApi {
    async fn start_search(&self, country: &CountryId) -> Result<SearchTicket, ApiError> {
        self.state.calls.start.fetch_add(1, Ordering::SeqCst);
        self.respond_later().await;

        let scripted = self.state.start_script.lock().pop_front();
        let (token, ready_at) = match scripted {
            Some(StartReply::Ticket { token, ready_in }) => {
                (SearchToken::new(token), self.offset(ready_in))
            }
            Some(StartReply::Fail { status, message }) => {
                return Err(ApiError::from_status(status, message, None));
            }
            None => {
                if !self.state.catalog.lock().countries.contains_key(country) {
                    return Err(ApiError::BadRequest(format!("unknown country {country}")));
                }
                let n = self.state.next_token.fetch_add(1, Ordering::SeqCst);
                let ready_after = *self.state.ready_after.lock();
                let ready_in = TimeDelta::from_std(ready_after).unwrap_or(TimeDelta::zero());
                (SearchToken::new(format!("mock-{n}")), self.offset(ready_in))
            }
        };

        self.state.searches.lock().insert(
            token.clone(),
            MockSearch {
                country: country.clone(),
                ready_at,
                stopped: false,
            },
        );
        Ok(SearchTicket { token, ready_at })
    }

    async fn fetch_prices(&self, token: &SearchToken) -> Result<Vec<PriceOffer>, ApiError> {
        self.state.calls.fetch.fetch_add(1, Ordering::SeqCst);
        self.respond_later().await;

        let scripted = self.state.fetch_script.lock().pop_front();
        match scripted {
            Some(FetchReply::Prices(prices)) => return Ok(prices),
            Some(FetchReply::NotReady { ready_in }) => {
                return Err(ApiError::NotReady {
                    wait_until: ready_in.map(|d| self.offset(d)),
                });
            }
            Some(FetchReply::Fail { status, message }) => {
                return Err(ApiError::from_status(status, message, None));
            }
            None => {}
        }

        let search = self
            .state
            .searches
            .lock()
            .get(token)
            .filter(|s| !s.stopped)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("search {token}")))?;

        if self.state.clock.now() < search.ready_at {
            return Err(ApiError::NotReady {
                wait_until: Some(search.ready_at),
            });
        }
        Ok(self.generate_offers(token, &search.country))
    }

    async fn stop_search(&self, token: &SearchToken) -> Result<(), ApiError> {
        self.state.stopped.lock().push(token.clone());
        if *self.state.fail_stop.lock() {
            return Err(ApiError::Server {
                status: 500,
                message: "failed to stop search".to_string(),
            });
        }
        match self.state.searches.lock().get_mut(token) {
            Some(search) => {
                search.stopped = true;
                Ok(())
            }
            None => Err(ApiError::NotFound(format!("search {token}"))),
        }
    }

    async fn get_countries(&self) -> Result<Vec<Country>, ApiError> {
        self.state.calls.countries.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .state
            .catalog
            .lock()
            .countries
            .values()
            .cloned()
            .collect())
    }

    async fn get_hotels(&self, country: &CountryId) -> Result<Vec<Hotel>, ApiError> {
        self.state.calls.hotels.fetch_add(1, Ordering::SeqCst);
        let catalog = self.state.catalog.lock();
        if !catalog.countries.contains_key(country) {
            return Err(ApiError::NotFound(format!("country {country}")));
        }
        Ok(catalog
            .hotels
            .values()
            .filter(|h| &h.country_id == country)
            .cloned()
            .collect())
    }

    async fn get_hotel(&self, id: HotelId) -> Result<Hotel, ApiError> {
        self.state.calls.hotel.fetch_add(1, Ordering::SeqCst);
        self.respond_later().await;
        self.state
            .catalog
            .lock()
            .hotels
            .get(&id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("hotel {id}")))
    }

    async fn search_geo(&self, query: &str) -> Result<Vec<GeoEntity>, ApiError> {
        let catalog = self.state.catalog.lock();
        let countries = catalog.countries.values().cloned().map(GeoEntity::Country);
        if query.is_empty() {
            return Ok(countries.collect());
        }

        let needle = query.to_lowercase();
        let cities = catalog.cities.iter().cloned().map(GeoEntity::City);
        let hotels = catalog.hotels.values().cloned().map(GeoEntity::Hotel);
        Ok(countries
            .chain(cities)
            .chain(hotels)
            .filter(|e| e.name().to_lowercase().contains(&needle))
            .collect())
    }
}
