//! Web layer for the tour search server.
//!
//! Provides JSON endpoints for catalog lookups, destination suggestions and
//! the shared price search.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, ServeError, create_router, serve};
pub use state::AppState;
