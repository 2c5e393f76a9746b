//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - The ledger REST routes
//! - Bearer-token identity middleware
//! - The email notifier wired into the ledger repository

pub mod middleware;
pub mod notifier;
pub mod routes;

use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use dealflow_db::LedgerRepository;
use dealflow_shared::JwtService;

pub use notifier::EmailNotifier;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Ledger store.
    pub ledger: Arc<LedgerRepository>,
    /// JWT service for token validation.
    pub jwt_service: Arc<JwtService>,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
