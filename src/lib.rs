pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod services;
pub mod state;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::{middleware, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Builds the full router: every booking route sits behind the JWT
/// middleware; only the health check is public.
pub fn app(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/api/bookings", post(handlers::bookings::create_booking))
        .route(
            "/api/bookings/:id",
            get(handlers::bookings::get_booking).patch(handlers::bookings::update_booking),
        )
        .route(
            "/api/bookings/:id/cancel",
            post(handlers::bookings::cancel_booking),
        )
        .route(
            "/api/users/:user_id/bookings",
            get(handlers::bookings::get_user_bookings),
        )
        .route(
            "/api/barbers/:barber_id/bookings",
            get(handlers::bookings::get_barber_bookings),
        )
        .route(
            "/api/barbers/:barber_id/slots",
            get(handlers::bookings::get_available_time_slots),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    Router::new()
        .route("/health", get(handlers::health::health))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
