//! Application state for the web layer.

use std::sync::Arc;

use crate::api::TourApi;
use crate::cache::CachedTourApi;
use crate::clock::Clock;
use crate::geo::GeoSearch;
use crate::search::{SearchConfig, SearchEngine};

/// Shared application state.
///
/// Contains all the services needed to handle requests.
pub struct AppState<A> {
    /// Cached tour backend
    pub api: Arc<CachedTourApi<A>>,

    /// The single price search shared by all clients
    pub engine: SearchEngine<A>,

    /// Destination suggestions
    pub geo: Arc<GeoSearch<A>>,
}

impl<A> Clone for AppState<A> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            engine: self.engine.clone(),
            geo: self.geo.clone(),
        }
    }
}

impl<A: TourApi> AppState<A> {
    /// Create a new app state.
    pub fn new(api: CachedTourApi<A>, clock: Arc<dyn Clock>, config: SearchConfig) -> Self {
        let api = Arc::new(api);
        Self {
            engine: SearchEngine::new(api.clone(), clock, config),
            geo: Arc::new(GeoSearch::new(api.clone())),
            api,
        }
    }
}
