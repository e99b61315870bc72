use axum::extract::FromRef;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::SqliteStore;

use crate::config::Config;
use crate::db::SqliteCardStore;
use crate::services::card_service::CardService;

/// Session keys used in the application
pub const SESSION_KEY_ADMIN: &str = "admin_username";

/// Creates a session layer for Axum
pub async fn create_session_layer(
    pool: SqlitePool,
    cookie_secure: bool,
) -> Result<SessionManagerLayer<SqliteStore>, sqlx::Error> {
    // Create the session store backed by SQLite
    let session_store = SqliteStore::new(pool);
    session_store.migrate().await?;

    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(cookie_secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::hours(24)));

    Ok(session_layer)
}

/// Application state shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub cards: CardService,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: Config) -> Self {
        let cards = CardService::new(Arc::new(SqliteCardStore::new(pool.clone())));

        Self {
            pool,
            cards,
            config: Arc::new(config),
        }
    }
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> SqlitePool {
        state.pool.clone()
    }
}
