//! Destination suggestions.
//!
//! The first lookup loads every country and every country's hotels, then
//! answers all later queries from memory.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{OnceCell, RwLock};
use tracing::{info, warn};

use crate::api::{ApiError, TourApi};
use crate::cache::CachedTourApi;
use crate::domain::{GeoEntity, Hotel};

type Index = Arc<Vec<GeoEntity>>;

/// Case-insensitive name lookup over countries and hotels.
///
/// Concurrent first callers share a single load. A load that fails leaves an
/// empty index in place until [`GeoSearch::clear`] is called.
pub struct GeoSearch<A> {
    api: Arc<CachedTourApi<A>>,
    index: RwLock<Arc<OnceCell<Index>>>,
}

impl<A: TourApi> GeoSearch<A> {
    pub fn new(api: Arc<CachedTourApi<A>>) -> Self {
        Self {
            api,
            index: RwLock::new(Arc::new(OnceCell::new())),
        }
    }

    /// Entities whose name contains `query`, ignoring case. A blank query
    /// matches nothing.
    pub async fn search(&self, query: &str) -> Vec<GeoEntity> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        self.entries()
            .await
            .iter()
            .filter(|e| e.name().to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    /// Number of loaded entities, loading them if needed.
    pub async fn len(&self) -> usize {
        self.entries().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Forget the loaded index. The next search loads it again.
    pub async fn clear(&self) {
        *self.index.write().await = Arc::new(OnceCell::new());
    }

    /// Ask the backend for its own suggestions, bypassing the local index.
    pub async fn backend_search(&self, query: &str) -> Result<Vec<GeoEntity>, ApiError> {
        self.api.client().search_geo(query).await
    }

    async fn entries(&self) -> Index {
        let cell = self.index.read().await.clone();
        cell.get_or_init(|| self.load()).await.clone()
    }

    async fn load(&self) -> Index {
        let countries = match self.api.countries().await {
            Ok(countries) => countries,
            Err(e) => {
                warn!(error = %e, "could not load countries for suggestions");
                return Arc::new(Vec::new());
            }
        };

        let loads = countries.iter().map(|country| async move {
            match self.api.hotels_in(&country.id).await {
                Ok(hotels) => hotels.iter().map(|h| Hotel::clone(h)).collect::<Vec<_>>(),
                Err(e) => {
                    warn!(country = %country.id, error = %e, "could not load hotels for suggestions");
                    Vec::new()
                }
            }
        });
        let hotels: Vec<Vec<Hotel>> = join_all(loads).await;

        let mut entries: Vec<GeoEntity> = countries
            .iter()
            .cloned()
            .map(GeoEntity::Country)
            .collect();
        entries.extend(hotels.into_iter().flatten().map(GeoEntity::Hotel));

        info!(entries = entries.len(), "loaded destination suggestions");
        Arc::new(entries)
    }
}
