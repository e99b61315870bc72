use secrecy::Secret;
use serde::Deserialize;

use crate::services::qr_generator::QrPayloadMode;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,

    /// Public address printed on cards and used for URL-style QR payloads.
    /// Falls back to the request's Host header when unset.
    pub public_base_url: Option<String>,
    pub app_title: String,

    // Admin credentials, seeded into `users` at startup
    pub admin_username: String,
    pub admin_password: Secret<String>,

    // Shared key for scanner clients without a browser session
    pub admin_key: Option<Secret<String>>,

    pub cookie_secure: bool,
    pub qr_payload: QrPayloadMode,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists (for local development)
        let _ = dotenvy::dotenv();

        let config = config::Config::builder()
            .add_source(config::Environment::default().separator("__"))
            .build()?;

        let qr_payload = match config.get::<String>("qr_payload") {
            Ok(raw) => raw
                .parse()
                .map_err(|e: String| config::ConfigError::Message(e))?,
            Err(_) => QrPayloadMode::default(),
        };

        Ok(Self {
            database_url: config
                .get("database_url")
                .unwrap_or_else(|_| "sqlite://points.db?mode=rwc".to_string()),
            host: config.get("host").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: config.get("port").unwrap_or(5000),

            public_base_url: config
                .get::<String>("public_base_url")
                .ok()
                .map(|url| url.trim().trim_end_matches('/').to_string())
                .filter(|url| !url.is_empty()),
            app_title: config
                .get("app_title")
                .unwrap_or_else(|_| "Points".to_string()),

            admin_username: config
                .get("admin_username")
                .unwrap_or_else(|_| "admin".to_string()),
            admin_password: Secret::new(config.get("admin_password")?),

            admin_key: config
                .get::<String>("admin_key")
                .ok()
                .filter(|key| !key.is_empty())
                .map(Secret::new),

            cookie_secure: config.get("cookie_secure").unwrap_or(false),
            qr_payload,
        })
    }
}
