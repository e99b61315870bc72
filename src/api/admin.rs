use askama::Template;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{auth::require_admin, session::AppState};
use crate::config::Config;
use crate::error::{ApiError, AppError};
use crate::models::card::{Card, CardEvent, CardSummary};
use crate::services::{qr_generator, scan_payload};

/// Dashboard row
struct CardRow {
    token: String,
    owner: String,
    points: i64,
    blocked: bool,
    created: String,
}

impl From<Card> for CardRow {
    fn from(card: Card) -> Self {
        Self {
            created: card.created_at.format("%Y-%m-%d %H:%M").to_string(),
            token: card.token,
            owner: card.owner,
            points: card.points,
            blocked: card.blocked,
        }
    }
}

#[derive(Template)]
#[template(path = "admin/dashboard.html")]
struct DashboardTemplate {
    title: String,
    cards: Vec<CardRow>,
    error: Option<String>,
}

#[derive(Template)]
#[template(path = "admin/print.html")]
struct PrintTemplate {
    owner: String,
    token: String,
    site_url: String,
    qr_data_uri: String,
}

#[derive(Template)]
#[template(path = "admin/scan.html")]
struct ScanTemplate {
    title: String,
}

/// Address printed on cards: configured base URL, else the request's host
fn site_url(config: &Config, headers: &HeaderMap) -> String {
    if let Some(base) = &config.public_base_url {
        return base.clone();
    }

    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}:{}", config.host, config.port));

    format!("http://{host}")
}

async fn render_dashboard(state: &AppState, error: Option<String>) -> Result<DashboardTemplate, AppError> {
    let cards = state.cards.list_cards().await?;

    Ok(DashboardTemplate {
        title: state.config.app_title.clone(),
        cards: cards.into_iter().map(CardRow::from).collect(),
        error,
    })
}

/// Lists all cards with inline actions
async fn dashboard(State(state): State<AppState>) -> Result<DashboardTemplate, AppError> {
    render_dashboard(&state, None).await
}

#[derive(Deserialize)]
struct AddCardForm {
    #[serde(default, alias = "owner")]
    name: String,
}

/// Creates a card and opens its print view
async fn add_card(
    State(state): State<AppState>,
    Form(form): Form<AddCardForm>,
) -> Result<Response, AppError> {
    match state.cards.create_card(&form.name).await {
        Ok(card) => Ok(Redirect::to(&format!("/admin/print/{}", card.token)).into_response()),
        Err(err) => match AppError::from(err) {
            AppError::Validation(msg) => {
                let page = render_dashboard(&state, Some(msg)).await?;
                Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
            }
            other => Err(other),
        },
    }
}

#[derive(Deserialize)]
struct PlusQuery {
    delta: Option<i64>,
}

async fn plus(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Query(query): Query<PlusQuery>,
) -> Result<Redirect, AppError> {
    state
        .cards
        .increment_points(&token, query.delta.unwrap_or(1))
        .await?;

    Ok(Redirect::to("/admin"))
}

async fn toggle(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Redirect, AppError> {
    state.cards.toggle_blocked(&token).await?;

    Ok(Redirect::to("/admin"))
}

async fn reset(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Redirect, AppError> {
    state.cards.reset_points(&token).await?;

    Ok(Redirect::to("/admin"))
}

async fn delete(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Redirect, AppError> {
    state.cards.delete_card(&token).await?;

    Ok(Redirect::to("/admin"))
}

/// Printable card with the QR code embedded
async fn print_card(
    State(state): State<AppState>,
    Path(token): Path<String>,
    headers: HeaderMap,
) -> Result<PrintTemplate, AppError> {
    let card = state.cards.get_card(&token).await?;

    let site_url = site_url(&state.config, &headers);
    let payload = qr_generator::qr_payload(&card.token, &site_url, state.config.qr_payload)?;
    let qr_data_uri = qr_generator::png_data_uri(&payload)?;

    Ok(PrintTemplate {
        owner: card.owner,
        token: card.token,
        site_url: format!("{site_url}/"),
        qr_data_uri,
    })
}

/// Raw SVG QR code for a card
async fn card_qr(
    State(state): State<AppState>,
    Path(token): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let card = state.cards.get_card(&token).await?;

    let site_url = site_url(&state.config, &headers);
    let payload = qr_generator::qr_payload(&card.token, &site_url, state.config.qr_payload)?;
    let qr_svg = qr_generator::generate_qr_svg(&payload)?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "image/svg+xml")],
        qr_svg,
    )
        .into_response())
}

async fn scan_page(State(state): State<AppState>) -> ScanTemplate {
    ScanTemplate {
        title: state.config.app_title.clone(),
    }
}

#[derive(Deserialize)]
struct ScanRequest {
    #[serde(default)]
    token: String,
}

/// Adds one point for a scanned card; accepts a bare token or lookup URL
async fn scan_api(
    State(state): State<AppState>,
    payload: Result<Json<ScanRequest>, JsonRejection>,
) -> Result<Json<CardSummary>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection.body_text(), "Rejected scan request body");
        AppError::Validation(rejection.body_text())
    })?;

    let token = scan_payload::extract_token(&request.token)
        .ok_or_else(|| AppError::Validation("token required".to_string()))?;

    let card = state.cards.increment_points(&token, 1).await?;

    Ok(Json(CardSummary::from(&card)))
}

async fn events_api(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<Vec<CardEvent>>, ApiError> {
    let events = state.cards.card_events(&token).await?;

    Ok(Json(events))
}

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin", get(dashboard))
        .route("/admin/add", post(add_card))
        .route("/admin/plus/:token", get(plus).post(plus))
        .route("/admin/toggle/:token", get(toggle).post(toggle))
        .route("/admin/reset/:token", get(reset).post(reset))
        .route("/admin/delete/:token", get(delete).post(delete))
        .route("/admin/print/:token", get(print_card))
        .route("/admin/qr/:token", get(card_qr))
        .route("/admin/scan", get(scan_page))
        .route("/api/admin/scan", post(scan_api))
        .route("/api/admin/cards/:token/events", get(events_api))
        .route_layer(middleware::from_fn_with_state(state, require_admin))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::qr_generator::QrPayloadMode;
    use axum::http::HeaderValue;
    use secrecy::Secret;

    fn config(public_base_url: Option<&str>) -> Config {
        Config {
            database_url: "sqlite::memory:".to_string(),
            host: "127.0.0.1".to_string(),
            port: 5000,
            public_base_url: public_base_url.map(str::to_string),
            app_title: "Points".to_string(),
            admin_username: "admin".to_string(),
            admin_password: Secret::new("admin123".to_string()),
            admin_key: None,
            cookie_secure: false,
            qr_payload: QrPayloadMode::Token,
        }
    }

    #[test]
    fn test_site_url_prefers_config() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("cards.local"));

        assert_eq!(
            site_url(&config(Some("https://points.example")), &headers),
            "https://points.example"
        );
        assert_eq!(site_url(&config(None), &headers), "http://cards.local");
        assert_eq!(
            site_url(&config(None), &HeaderMap::new()),
            "http://127.0.0.1:5000"
        );
    }
}
