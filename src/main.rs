use secrecy::ExposeSecret;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pointcard::api::middleware::session::{create_session_layer, AppState};
use pointcard::config::Config;
use pointcard::db;
use pointcard::models::admin_user::AdminUser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pointcard=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting pointcard server...");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    // Create database pool
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Seed the admin account
    let created = AdminUser::seed(
        &pool,
        &config.admin_username,
        config.admin_password.expose_secret(),
    )
    .await?;
    if created {
        tracing::info!(username = %config.admin_username, "Admin account created");
    }

    // Create session layer
    let session_layer = create_session_layer(pool.clone(), config.cookie_secure).await?;
    tracing::info!("Session layer initialized");

    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState::new(pool, config);

    let app = pointcard::api::router(state)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http());

    tracing::info!("Listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install CTRL+C signal handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, cleaning up...");
}
