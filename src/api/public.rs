use askama::Template;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::session::AppState;
use crate::error::{ApiError, AppError};
use crate::models::card::{Card, CardSummary};
use crate::services::scan_payload;

#[derive(Template)]
#[template(path = "landing.html")]
struct LandingTemplate {
    title: String,
}

#[derive(Template)]
#[template(path = "points.html")]
struct PointsTemplate {
    title: String,
    owner: String,
    points: i64,
    token: String,
    blocked: bool,
}

impl PointsTemplate {
    fn new(title: &str, card: Card) -> Self {
        Self {
            title: title.to_string(),
            owner: card.owner,
            points: card.points,
            token: card.token,
            blocked: card.blocked,
        }
    }
}

/// Public landing page with code input and camera scanner
async fn landing(State(state): State<AppState>) -> LandingTemplate {
    LandingTemplate {
        title: state.config.app_title.clone(),
    }
}

/// Point balance page for a card
async fn card_points(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<PointsTemplate, AppError> {
    let card = state.cards.get_card(&token).await?;

    Ok(PointsTemplate::new(&state.config.app_title, card))
}

#[derive(Deserialize)]
struct LookupQuery {
    code: Option<String>,
}

/// Lookup by typed code or scanned payload, which may be a full lookup URL
async fn lookup(
    State(state): State<AppState>,
    Query(query): Query<LookupQuery>,
) -> Result<Response, AppError> {
    let Some(token) = query.code.as_deref().and_then(scan_payload::extract_token) else {
        return Ok(Redirect::to("/").into_response());
    };

    let card = state.cards.get_card(&token).await?;

    Ok(PointsTemplate::new(&state.config.app_title, card).into_response())
}

/// JSON balance: `{"name", "points", "blocked"}`
async fn card_api(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<CardSummary>, ApiError> {
    let card = state.cards.get_card(&token).await?;

    Ok(Json(CardSummary::from(&card)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(landing))
        .route("/u/:token", get(card_points))
        .route("/user", get(lookup))
        .route("/api/card/:token", get(card_api))
}
