//! Tour API HTTP client.
//!
//! Provides async methods for the tour backend: the start/fetch/stop price
//! search protocol plus catalog lookups. Non-2xx responses carry a JSON error
//! body which is mapped to [`ApiError`] here, so callers only ever see typed
//! errors.

use reqwest::Url;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use crate::domain::{Country, CountryId, GeoEntity, Hotel, HotelId, PriceOffer};

use super::backend::{SearchTicket, SearchToken, TourApi};
use super::convert::{
    convert_countries, convert_geo_entities, convert_hotel, convert_hotels, convert_prices,
    convert_ticket, parse_timestamp,
};
use super::error::ApiError;
use super::types::{
    CountryDto, ErrorResponse, GeoEntityDto, GetSearchPricesResponse, HotelDto, KeyedList,
    StartSearchResponse, StopSearchResponse,
};

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// How much of an unparseable body to keep in error messages.
const BODY_SNIPPET_LEN: usize = 500;

/// Configuration for the tour API client.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the backend, e.g. `https://tours.example/api`
    pub base_url: String,
    /// Optional API key, sent as `x-apikey`
    pub api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl ApiConfig {
    /// Create a new config pointing at the given backend.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// HTTP client for the tour backend.
#[derive(Debug, Clone)]
pub struct TourApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl TourApiClient {
    /// Create a new client with the given configuration.
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| ApiError::Server {
            status: 0,
            message: format!("invalid base URL {:?}: {e}", config.base_url),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Server {
                status: 0,
                message: format!("base URL {:?} cannot have paths", config.base_url),
            });
        }

        let mut headers = HeaderMap::new();
        if let Some(key) = &config.api_key {
            let value = HeaderValue::from_str(key).map_err(|_| ApiError::Server {
                status: 0,
                message: "Invalid API key format".to_string(),
            })?;
            headers.insert(HeaderName::from_static("x-apikey"), value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { http, base_url })
    }

    /// Build a URL below the base, escaping each segment.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Send a request and decode a JSON success body, mapping error bodies
    /// to typed errors.
    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        trace!(status = status.as_u16(), len = body.len(), "tour API response");

        if !status.is_success() {
            return Err(error_from_body(status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(|e| ApiError::Json {
            message: format!(
                "{e} (body: {})",
                body.chars().take(BODY_SNIPPET_LEN).collect::<String>()
            ),
        })
    }
}

/// Build an error from a non-2xx response.
///
/// The code inside the error body wins over the HTTP status when present,
/// since that's what the backend uses to signal "not ready".
fn error_from_body(status: u16, body: &str) -> ApiError {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(err) => {
            let wait_until = err
                .wait_until
                .as_deref()
                .and_then(|s| parse_timestamp(s).ok());
            let message = if err.message.is_empty() {
                format!("request failed with status {}", err.code)
            } else {
                err.message
            };
            ApiError::from_status(err.code, message, wait_until)
        }
        Err(_) => ApiError::from_status(
            status,
            body.chars().take(BODY_SNIPPET_LEN).collect(),
            None,
        ),
    }
}

impl TourApi for TourApiClient {
    async fn start_search(&self, country: &CountryId) -> Result<SearchTicket, ApiError> {
        let url = self.url(&["prices", "search"]);
        debug!(%country, "starting price search");
        let response: StartSearchResponse = self
            .send_json(self.http.post(url).query(&[("countryID", country.as_str())]))
            .await?;
        Ok(convert_ticket(&response)?)
    }

    async fn fetch_prices(&self, token: &SearchToken) -> Result<Vec<PriceOffer>, ApiError> {
        let url = self.url(&["prices", "search", token.as_str()]);
        let response: GetSearchPricesResponse = self.send_json(self.http.get(url)).await?;
        Ok(convert_prices(&response.prices))
    }

    async fn stop_search(&self, token: &SearchToken) -> Result<(), ApiError> {
        let url = self.url(&["prices", "search", token.as_str()]);
        let response: StopSearchResponse = self.send_json(self.http.delete(url)).await?;
        debug!(%token, message = %response.message, "search stopped");
        Ok(())
    }

    async fn get_countries(&self) -> Result<Vec<Country>, ApiError> {
        let url = self.url(&["countries"]);
        let list: KeyedList<CountryDto> = self.send_json(self.http.get(url)).await?;
        Ok(convert_countries(&list))
    }

    async fn get_hotels(&self, country: &CountryId) -> Result<Vec<Hotel>, ApiError> {
        let url = self.url(&["hotels"]);
        let list: KeyedList<HotelDto> = self
            .send_json(self.http.get(url).query(&[("countryID", country.as_str())]))
            .await?;
        Ok(convert_hotels(&list))
    }

    async fn get_hotel(&self, id: HotelId) -> Result<Hotel, ApiError> {
        let id = id.to_string();
        let url = self.url(&["hotels", id.as_str()]);
        let dto: HotelDto = self.send_json(self.http.get(url)).await?;
        Ok(convert_hotel(&dto)?)
    }

    async fn search_geo(&self, query: &str) -> Result<Vec<GeoEntity>, ApiError> {
        let url = self.url(&["geo"]);
        let list: KeyedList<GeoEntityDto> = self
            .send_json(self.http.get(url).query(&[("search", query)]))
            .await?;
        Ok(convert_geo_entities(&list))
    }
}
