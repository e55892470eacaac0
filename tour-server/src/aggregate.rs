//! Turning raw price offers into tours.
//!
//! Offers only carry a hotel id. Aggregation looks up each referenced hotel
//! once, joins it onto its offers and orders the result cheapest first.
//! Offers whose hotel can't be resolved are dropped, not reported.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::api::TourApi;
use crate::cache::CachedTourApi;
use crate::domain::{CountryId, Hotel, HotelId, PriceOffer, Tour};

/// How hotels referenced by offers are looked up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResolvePolicy {
    /// One lookup per referenced hotel.
    #[default]
    PerHotel,
    /// One lookup for every hotel in the searched country.
    ByCountry,
}

/// Resolves hotel ids to hotels.
///
/// Ids that can't be resolved are simply absent from the returned map.
pub trait HotelResolver: Sync {
    fn resolve(
        &self,
        country: &CountryId,
        ids: &[HotelId],
    ) -> impl Future<Output = HashMap<HotelId, Arc<Hotel>>> + Send;
}

/// Looks up each hotel individually through the catalog cache.
pub struct PerHotelResolver<'a, A> {
    api: &'a CachedTourApi<A>,
}

impl<'a, A: TourApi> PerHotelResolver<'a, A> {
    pub fn new(api: &'a CachedTourApi<A>) -> Self {
        Self { api }
    }
}

impl<A: TourApi> HotelResolver for PerHotelResolver<'_, A> {
    async fn resolve(&self, _country: &CountryId, ids: &[HotelId]) -> HashMap<HotelId, Arc<Hotel>> {
        let lookups = ids.iter().map(|&id| async move { (id, self.api.hotel(id).await) });

        join_all(lookups)
            .await
            .into_iter()
            .filter_map(|(id, result)| match result {
                Ok(hotel) => Some((id, hotel)),
                Err(e) => {
                    warn!(hotel_id = %id, error = %e, "could not resolve hotel, dropping its offers");
                    None
                }
            })
            .collect()
    }
}

/// Loads the whole country's hotel list and picks out the referenced ones.
pub struct ByCountryResolver<'a, A> {
    api: &'a CachedTourApi<A>,
}

impl<'a, A: TourApi> ByCountryResolver<'a, A> {
    pub fn new(api: &'a CachedTourApi<A>) -> Self {
        Self { api }
    }
}

impl<A: TourApi> HotelResolver for ByCountryResolver<'_, A> {
    async fn resolve(&self, country: &CountryId, ids: &[HotelId]) -> HashMap<HotelId, Arc<Hotel>> {
        let hotels = match self.api.hotels_in(country).await {
            Ok(hotels) => hotels,
            Err(e) => {
                warn!(%country, error = %e, "could not load hotels, dropping all offers");
                return HashMap::new();
            }
        };

        let wanted: HashSet<HotelId> = ids.iter().copied().collect();
        hotels
            .iter()
            .filter(|h| wanted.contains(&h.id))
            .map(|h| (h.id, h.clone()))
            .collect()
    }
}

/// Keep the first offer for each price id.
pub fn deduplicate(prices: Vec<PriceOffer>) -> Vec<PriceOffer> {
    let mut seen = HashSet::with_capacity(prices.len());
    prices
        .into_iter()
        .filter(|p| seen.insert(p.id.clone()))
        .collect()
}

/// Sort tours cheapest first. Equal amounts keep their relative order.
pub fn rank_tours(mut tours: Vec<Tour>) -> Vec<Tour> {
    tours.sort_by_key(|t| t.amount());
    tours
}

/// Join offers with their hotels and rank them.
///
/// Each distinct hotel id is passed to the resolver exactly once.
pub async fn aggregate_tours<R: HotelResolver>(
    prices: Vec<PriceOffer>,
    country: &CountryId,
    resolver: &R,
) -> Vec<Tour> {
    let prices = deduplicate(prices);

    let mut seen = HashSet::new();
    let ids: Vec<HotelId> = prices
        .iter()
        .filter_map(|p| p.hotel_id)
        .filter(|id| seen.insert(*id))
        .collect();

    let hotels = if ids.is_empty() {
        HashMap::new()
    } else {
        resolver.resolve(country, &ids).await
    };

    let offer_count = prices.len();
    let tours: Vec<Tour> = prices
        .into_iter()
        .filter_map(|price| {
            let hotel = hotels.get(&price.hotel_id?)?.clone();
            Some(Tour::new(price, hotel))
        })
        .collect();

    debug!(
        offers = offer_count,
        hotels = ids.len(),
        tours = tours.len(),
        "aggregated tours"
    );
    rank_tours(tours)
}
