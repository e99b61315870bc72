use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::db::StoreError;
use crate::services::card_service::CardError;
use crate::services::qr_generator::QrGenerationError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Card not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("QR code error: {0}")]
    Qr(#[from] QrGenerationError),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl From<CardError> for AppError {
    fn from(err: CardError) -> Self {
        match err {
            CardError::NotFound(token) => AppError::NotFound(token),
            CardError::Validation(msg) => AppError::Validation(msg),
            CardError::Conflict | CardError::Store(StoreError::Conflict) => {
                AppError::Conflict("Could not allocate a unique card token".to_string())
            }
            CardError::Store(StoreError::Database(e)) => AppError::Database(e),
            CardError::Store(StoreError::Overflow) => {
                AppError::Validation("Point balance is at its maximum".to_string())
            }
            CardError::Random => AppError::Internal(anyhow::anyhow!("random number generator failure")),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Database(_)
            | AppError::Session(_)
            | AppError::Qr(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code used by the JSON endpoints
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::Validation(_) => "invalid_request",
            _ => "internal",
        }
    }

    fn log_if_internal(&self) {
        if self.status().is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log_if_internal();

        let status = self.status();
        let message = match self {
            AppError::NotFound(_) => "Card not found".to_string(),
            AppError::Conflict(msg) | AppError::Validation(msg) => msg,
            _ => "Internal server error".to_string(),
        };

        (status, message).into_response()
    }
}

/// Error wrapper for JSON endpoints: `{"error": "<code>"}`
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl From<CardError> for ApiError {
    fn from(err: CardError) -> Self {
        ApiError(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.0.log_if_internal();

        let body = Json(json!({ "error": self.0.code() }));
        (self.0.status(), body).into_response()
    }
}
