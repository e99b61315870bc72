// API module - HTTP endpoints

pub mod admin;
pub mod auth;
pub mod health;
pub mod middleware;
pub mod public;

use axum::{routing::get, Router};

use middleware::session::AppState;

/// All application routes with state applied. The session layer is added by
/// the caller so tests can swap in an in-memory store.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .merge(public::router())
        .merge(auth::router())
        .merge(admin::router(state.clone()))
        .with_state(state)
}
