use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use secrecy::ExposeSecret;
use serde_json::json;
use tower_sessions::Session;

use super::session::{AppState, SESSION_KEY_ADMIN};

pub const ADMIN_KEY_HEADER: &str = "x-admin-key";
pub const ADMIN_KEY_PARAM: &str = "k";

/// Authentication error responses
#[derive(Debug)]
pub enum AuthError {
    /// Browser request without a session, sent to the login form
    LoginRequired,
    /// API request without credentials
    Unauthorized,
    SessionError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::LoginRequired => Redirect::to("/login").into_response(),
            AuthError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "unauthorized" })),
            )
                .into_response(),
            AuthError::SessionError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Session error occurred.").into_response()
            }
        }
    }
}

/// Middleware that requires an admin session or the configured admin key
pub async fn require_admin(
    State(state): State<AppState>,
    session: Session,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let admin: Option<String> = session
        .get(SESSION_KEY_ADMIN)
        .await
        .map_err(|_| AuthError::SessionError)?;

    let key_ok = state.config.admin_key.as_ref().is_some_and(|expected| {
        presented_key(request.headers(), request.uri().query())
            .is_some_and(|key| key == *expected.expose_secret())
    });

    if admin.is_none() && !key_ok {
        tracing::debug!(path = %request.uri().path(), "Rejected unauthenticated admin request");
        return Err(if request.uri().path().starts_with("/api/") {
            AuthError::Unauthorized
        } else {
            AuthError::LoginRequired
        });
    }

    Ok(next.run(request).await)
}

/// Admin key from the `X-Admin-Key` header, else the `k` query parameter
fn presented_key(headers: &HeaderMap, query: Option<&str>) -> Option<String> {
    if let Some(value) = headers.get(ADMIN_KEY_HEADER) {
        return value.to_str().ok().map(str::to_string);
    }

    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == ADMIN_KEY_PARAM)
        .map(|(_, value)| value.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_header_key_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(ADMIN_KEY_HEADER, HeaderValue::from_static("from-header"));

        assert_eq!(
            presented_key(&headers, Some("k=from-query")).as_deref(),
            Some("from-header")
        );
    }

    #[test]
    fn test_query_key() {
        let headers = HeaderMap::new();

        assert_eq!(
            presented_key(&headers, Some("x=1&k=s%20ecret")).as_deref(),
            Some("s ecret")
        );
        assert_eq!(presented_key(&headers, Some("x=1")), None);
        assert_eq!(presented_key(&headers, None), None);
    }
}
