//! Caching layer for catalog lookups.
//!
//! Countries and hotels change rarely, so lookups are memoized. Every cache
//! fills through `try_get_with`, which means concurrent requests for the same
//! key share a single backend call and a key is populated at most once until
//! it expires. Failed loads are not cached.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache as MokaCache;
use tracing::debug;

use crate::api::{ApiError, TourApi};
use crate::domain::{Country, CountryId, Hotel, HotelId};

/// A shared list of hotels.
pub type HotelList = Arc<Vec<Arc<Hotel>>>;

/// Configuration for the cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for cached entries.
    pub ttl: Duration,

    /// Maximum number of cached entries per cache.
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(10 * 60),
            max_capacity: 10_000,
        }
    }
}

/// Caches for catalog data.
pub struct CatalogCache {
    /// The full country list, under the unit key.
    countries: MokaCache<(), Arc<Vec<Country>>>,

    /// Hotels per country.
    hotels_by_country: MokaCache<CountryId, HotelList>,

    /// Individual hotels.
    hotels: MokaCache<HotelId, Arc<Hotel>>,
}

impl CatalogCache {
    /// Create a new cache with the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            countries: MokaCache::builder()
                .time_to_live(config.ttl)
                .max_capacity(config.max_capacity)
                .build(),
            hotels_by_country: MokaCache::builder()
                .time_to_live(config.ttl)
                .max_capacity(config.max_capacity)
                .build(),
            hotels: MokaCache::builder()
                .time_to_live(config.ttl)
                .max_capacity(config.max_capacity)
                .build(),
        }
    }

    /// Get cache statistics (for monitoring). Approximate until pending
    /// maintenance has run.
    pub fn entry_count(&self) -> u64 {
        self.countries.entry_count()
            + self.hotels_by_country.entry_count()
            + self.hotels.entry_count()
    }

    /// Invalidate all cached entries.
    pub fn invalidate_all(&self) {
        self.countries.invalidate_all();
        self.hotels_by_country.invalidate_all();
        self.hotels.invalidate_all();
    }
}

/// Tour backend with cached catalog lookups.
///
/// Wraps a [`TourApi`] and caches countries and hotels. Price searches are
/// never cached; use [`CachedTourApi::client`] for those.
pub struct CachedTourApi<A> {
    client: A,
    cache: CatalogCache,
}

impl<A: TourApi> CachedTourApi<A> {
    /// Create a new cached client.
    pub fn new(client: A, cache_config: &CacheConfig) -> Self {
        Self {
            client,
            cache: CatalogCache::new(cache_config),
        }
    }

    /// All countries, fetched once.
    pub async fn countries(&self) -> Result<Arc<Vec<Country>>, Arc<ApiError>> {
        self.cache
            .countries
            .try_get_with((), async {
                let countries = self.client.get_countries().await?;
                debug!(count = countries.len(), "loaded countries");
                Ok::<_, ApiError>(Arc::new(countries))
            })
            .await
    }

    /// Look up one country from the cached list.
    pub async fn country(&self, id: &CountryId) -> Result<Option<Country>, Arc<ApiError>> {
        let countries = self.countries().await?;
        Ok(countries.iter().find(|c| &c.id == id).cloned())
    }

    /// All hotels in a country, fetched once per country.
    ///
    /// Also seeds the per-hotel cache so later single lookups are free.
    pub async fn hotels_in(&self, country: &CountryId) -> Result<HotelList, Arc<ApiError>> {
        let list = self
            .cache
            .hotels_by_country
            .try_get_with(country.clone(), async {
                let hotels = self.client.get_hotels(country).await?;
                debug!(%country, count = hotels.len(), "loaded hotels for country");
                Ok::<_, ApiError>(Arc::new(hotels.into_iter().map(Arc::new).collect::<Vec<_>>()))
            })
            .await?;

        for hotel in list.iter() {
            if !self.cache.hotels.contains_key(&hotel.id) {
                self.cache.hotels.insert(hotel.id, hotel.clone()).await;
            }
        }
        Ok(list)
    }

    /// A single hotel, fetched once per id.
    pub async fn hotel(&self, id: HotelId) -> Result<Arc<Hotel>, Arc<ApiError>> {
        self.cache
            .hotels
            .try_get_with(id, async {
                let hotel = self.client.get_hotel(id).await?;
                Ok::<_, ApiError>(Arc::new(hotel))
            })
            .await
    }

    /// Access the underlying client for operations that bypass cache.
    pub fn client(&self) -> &A {
        &self.client
    }

    /// Get cache statistics.
    pub fn cache_entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Invalidate all cached entries.
    pub fn invalidate_cache(&self) {
        self.cache.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockTourApi;
    use crate::api::fixtures::sample_api;
    use crate::clock::SystemClock;

    fn cached() -> CachedTourApi<MockTourApi> {
        CachedTourApi::new(sample_api(Arc::new(SystemClock)), &CacheConfig::default())
    }

    #[test]
    fn default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.ttl, Duration::from_secs(600));
        assert_eq!(config.max_capacity, 10_000);
    }

    #[test]
    fn cache_creation() {
        let cache = CatalogCache::new(&CacheConfig::default());
        assert_eq!(cache.entry_count(), 0);
    }

    #[tokio::test]
    async fn countries_fetched_once() {
        let api = cached();
        assert_eq!(api.countries().await.unwrap().len(), 2);
        assert_eq!(api.countries().await.unwrap().len(), 2);
        assert_eq!(api.client().countries_calls(), 1);

        let greece = api.country(&CountryId::parse("GR").unwrap()).await.unwrap();
        assert_eq!(greece.map(|c| c.name), Some("Greece".to_string()));
        let nowhere = api.country(&CountryId::parse("XX").unwrap()).await.unwrap();
        assert!(nowhere.is_none());
    }

    #[tokio::test]
    async fn concurrent_hotel_lookups_share_one_fetch() {
        let api = cached();
        let lookups = (0..8).map(|_| api.hotel(HotelId::new(1)));
        let results = futures::future::join_all(lookups).await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(api.client().hotel_calls(), 1);
    }

    #[tokio::test]
    async fn failed_lookups_are_not_cached() {
        let api = cached();
        assert!(api.hotel(HotelId::new(99)).await.is_err());
        assert!(api.hotel(HotelId::new(99)).await.is_err());
        assert_eq!(api.client().hotel_calls(), 2);
    }

    #[tokio::test]
    async fn country_hotels_seed_single_lookups() {
        let api = cached();
        let greece = CountryId::parse("GR").unwrap();
        let hotels = api.hotels_in(&greece).await.unwrap();
        assert_eq!(hotels.len(), 3);

        let hotel = api.hotel(HotelId::new(2)).await.unwrap();
        assert_eq!(hotel.name, "Olive Grove");
        assert_eq!(api.client().hotel_calls(), 0);
        assert_eq!(api.client().hotels_calls(), 1);
    }

    #[tokio::test]
    async fn invalidate_forces_refetch() {
        let api = cached();
        api.hotel(HotelId::new(1)).await.unwrap();
        api.invalidate_cache();
        api.hotel(HotelId::new(1)).await.unwrap();
        assert_eq!(api.client().hotel_calls(), 2);
    }
}
