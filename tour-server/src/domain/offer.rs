//! Price offers and the tours built from them.

use std::sync::Arc;

use serde::Serialize;

use super::catalog::Hotel;
use super::ids::{HotelId, PriceId};
use super::money::{Money, StayDates};

/// A priced offer returned by a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceOffer {
    pub id: PriceId,
    pub amount: Money,
    pub dates: StayDates,
    /// The hotel this offer is for. `None` when the backend omitted it or sent
    /// something that isn't a hotel id; such offers never become tours.
    pub hotel_id: Option<HotelId>,
}

/// An offer joined with the hotel it refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tour {
    pub price: PriceOffer,
    pub hotel: Arc<Hotel>,
}

impl Tour {
    pub fn new(price: PriceOffer, hotel: Arc<Hotel>) -> Self {
        Self { price, hotel }
    }

    /// Tours are identified by their offer.
    pub fn id(&self) -> &PriceId {
        &self.price.id
    }

    pub fn amount(&self) -> Money {
        self.price.amount
    }
}
