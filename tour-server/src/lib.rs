//! Tour search server.
//!
//! Finds priced hotel stays ("tours") for a destination by driving the tour
//! backend's asynchronous start/poll/stop search protocol, then joining the
//! returned offers with hotel details.

pub mod aggregate;
pub mod api;
pub mod cache;
pub mod clock;
pub mod domain;
pub mod geo;
pub mod search;
pub mod web;
