use askama::Template;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::api::middleware::session::{AppState, SESSION_KEY_ADMIN};
use crate::error::AppError;
use crate::models::admin_user::AdminUser;

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    title: String,
    error: Option<String>,
}

/// Shows the admin login form, or the dashboard when already logged in
async fn login_page(State(state): State<AppState>, session: Session) -> Result<Response, AppError> {
    let admin: Option<String> = session.get(SESSION_KEY_ADMIN).await?;
    if admin.is_some() {
        return Ok(Redirect::to("/admin").into_response());
    }

    Ok(LoginTemplate {
        title: state.config.app_title.clone(),
        error: None,
    }
    .into_response())
}

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

/// Checks admin credentials and marks the session as logged in
async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let username = form.username.trim();

    let Some(user) = AdminUser::verify_credentials(&state.pool, username, &form.password).await?
    else {
        tracing::warn!(username = %username, "Failed admin login");
        let page = LoginTemplate {
            title: state.config.app_title.clone(),
            error: Some("Invalid username or password".to_string()),
        };
        return Ok((StatusCode::UNAUTHORIZED, page).into_response());
    };

    // New session id on privilege change
    session.cycle_id().await?;
    session.insert(SESSION_KEY_ADMIN, &user.username).await?;

    tracing::info!(username = %user.username, "Admin logged in");

    Ok(Redirect::to("/admin").into_response())
}

/// Logs out the admin
async fn logout(session: Session) -> Result<Redirect, AppError> {
    session.flush().await?;

    Ok(Redirect::to("/"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout))
}
