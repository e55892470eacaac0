//! HTTP route handlers.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::api::{ApiError, TourApi};
use crate::domain::{Country, CountryId, Hotel, HotelId};

use super::dto::*;
use super::state::AppState;

/// Create the application router.
pub fn create_router<A: TourApi>(state: AppState<A>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/countries", get(list_countries::<A>))
        .route("/api/countries/:id/hotels", get(country_hotels::<A>))
        .route("/api/hotels/:id", get(hotel_details::<A>))
        .route("/api/geo", get(search_geo::<A>))
        .route(
            "/api/search",
            get(current_search::<A>)
                .post(start_search::<A>)
                .delete(cancel_search::<A>),
        )
        .with_state(state)
}

/// Errors from running the HTTP server.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve<A: TourApi>(state: AppState<A>, addr: SocketAddr) -> Result<(), ServeError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServeError::Bind { addr, source })?;
    info!(%addr, "listening");
    axum::serve(listener, create_router(state))
        .await
        .map_err(ServeError::Serve)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

async fn list_countries<A: TourApi>(
    State(state): State<AppState<A>>,
) -> Result<Json<Vec<Country>>, AppError> {
    let countries = state.api.countries().await?;
    Ok(Json(countries.to_vec()))
}

async fn country_hotels<A: TourApi>(
    State(state): State<AppState<A>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Hotel>>, AppError> {
    let country = CountryId::parse(&id).map_err(|_| AppError::BadRequest {
        message: format!("Invalid country id: {id}"),
    })?;
    let hotels = state.api.hotels_in(&country).await?;
    Ok(Json(hotels.iter().map(|h| Hotel::clone(h)).collect()))
}

async fn hotel_details<A: TourApi>(
    State(state): State<AppState<A>>,
    Path(id): Path<String>,
) -> Result<Json<Hotel>, AppError> {
    let id = HotelId::parse(&id).map_err(|_| AppError::BadRequest {
        message: format!("Invalid hotel id: {id}"),
    })?;
    let hotel = state.api.hotel(id).await?;
    Ok(Json(Hotel::clone(&hotel)))
}

/// Destination suggestions, from the local index unless `remote` is set.
async fn search_geo<A: TourApi>(
    State(state): State<AppState<A>>,
    Query(query): Query<GeoQuery>,
) -> Result<Json<GeoSearchResponse>, AppError> {
    let results = if query.remote {
        state
            .geo
            .backend_search(&query.q)
            .await
            .map_err(|e| AppError::from(Arc::new(e)))?
    } else {
        state.geo.search(&query.q).await
    };
    Ok(Json(GeoSearchResponse { results }))
}

async fn current_search<A: TourApi>(State(state): State<AppState<A>>) -> Json<SearchResponse> {
    Json(SearchResponse::from_session(&state.engine.snapshot()))
}

/// Start a search, replacing any search already running.
async fn start_search<A: TourApi>(
    State(state): State<AppState<A>>,
    Json(req): Json<StartSearchRequest>,
) -> Result<impl IntoResponse, AppError> {
    let country = CountryId::parse(&req.country_id).map_err(|_| AppError::BadRequest {
        message: format!("Invalid country id: {}", req.country_id),
    })?;

    state.engine.start(country);
    let session = state.engine.snapshot();
    Ok((StatusCode::ACCEPTED, Json(SearchResponse::from_session(&session))))
}

async fn cancel_search<A: TourApi>(State(state): State<AppState<A>>) -> Json<CancelResponse> {
    let cancelled = state.engine.cancel().await;
    Json(CancelResponse {
        cancelled,
        search: SearchResponse::from_session(&state.engine.snapshot()),
    })
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
    Internal { message: String },
}

impl From<Arc<ApiError>> for AppError {
    fn from(e: Arc<ApiError>) -> Self {
        match e.as_ref() {
            ApiError::NotFound(_) => AppError::NotFound {
                message: e.to_string(),
            },
            ApiError::BadRequest(_) => AppError::BadRequest {
                message: e.to_string(),
            },
            _ => AppError::Internal {
                message: e.to_string(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
            AppError::Internal { message } => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        warn!(status = status.as_u16(), %message, "request failed");

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
