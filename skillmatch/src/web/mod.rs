//! HTTP surface: router, shared state, and access guards

pub mod csrf;
pub mod error;
pub mod handlers;
pub mod session;
pub mod views;

use anyhow::{Context, Result};
use askama::Template;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::config::Config;
use crate::config::repository::{providers, sessions, users};
use crate::models::{ProviderProfile, Role, User};
use error::{WebError, WebResult};
use session::Session;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: Config) -> Self {
        Self {
            pool,
            config: Arc::new(config),
        }
    }
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(handlers::pages::landing))
        .route("/get-started/", get(handlers::pages::get_started))
        .route("/healthz", get(handlers::pages::healthz))
        .route("/static/{file}", get(handlers::pages::static_asset))
        .route(
            "/login/",
            get(handlers::auth::login_page).post(handlers::auth::login_submit),
        )
        .route("/logout/", get(handlers::auth::logout))
        .route(
            "/register/user/",
            get(handlers::auth::register_user_page).post(handlers::auth::register_user_submit),
        )
        .route(
            "/register/company/",
            get(handlers::onboarding::account_page).post(handlers::onboarding::account_submit),
        )
        .route(
            "/register/company/details/",
            get(handlers::onboarding::details_page).post(handlers::onboarding::details_submit),
        )
        .route("/dashboard/", get(handlers::services::dashboard))
        .route("/services/", get(handlers::pages::catalog))
        .route(
            "/services/add/",
            get(handlers::services::add_page).post(handlers::services::add_submit),
        )
        .route(
            "/services/{id}/edit/",
            get(handlers::services::edit_page).post(handlers::services::edit_submit),
        )
        .route("/services/{id}/delete/", post(handlers::services::delete))
        .route("/requests/", get(handlers::requests::list))
        .route(
            "/requests/new/",
            get(handlers::requests::new_page).post(handlers::requests::new_submit),
        )
        .route("/requests/{id}/complete/", post(handlers::requests::complete))
        .fallback(handlers::pages::not_found)
        .layer(DefaultBodyLimit::max(upload_limit))
        .with_state(state)
}

/// Render a template, turning render failures into a 500
pub fn render<T: Template>(template: T) -> WebResult {
    let html = template.render().context("Template rendering failed")?;
    Ok(Html(html).into_response())
}

/// The logged-in, active account behind the session
pub async fn current_user(state: &AppState, session: &Session) -> Result<Option<User>> {
    let Some(user_id) = session.user_id() else {
        return Ok(None);
    };
    Ok(users::get_user(&state.pool, user_id)
        .await?
        .filter(|user| user.is_active))
}

pub async fn require_user(state: &AppState, session: &Session) -> WebResult<User> {
    current_user(state, session)
        .await?
        .ok_or(WebError::LoginRequired)
}

pub async fn require_role(state: &AppState, session: &Session, role: Role) -> WebResult<User> {
    let user = require_user(state, session).await?;
    if user.role != role {
        return Err(WebError::LoginRequired);
    }
    Ok(user)
}

/// A provider account together with its company profile
pub async fn require_provider(
    state: &AppState,
    session: &Session,
) -> WebResult<(User, ProviderProfile)> {
    let user = require_role(state, session, Role::Provider).await?;
    let provider = providers::get_provider_by_user(&state.pool, user.id)
        .await?
        .ok_or(WebError::NotFound)?;
    Ok((user, provider))
}

/// Bind and serve until Ctrl-C
pub async fn serve(config: Config, pool: SqlitePool) -> Result<()> {
    let bind = config.bind.clone();
    tokio::fs::create_dir_all(&config.media_dir)
        .await
        .with_context(|| format!("Failed to create media dir {}", config.media_dir.display()))?;

    let purged = sessions::delete_expired_sessions(&pool, config.session_max_age_secs).await?;
    if purged > 0 {
        log::info!("Removed {} expired session(s)", purged);
    }

    let app = build_router(AppState::new(pool, config));
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    log::info!("skillmatch listening on http://{}", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for shutdown signal: {}", e);
            }
            log::info!("Shutting down");
        })
        .await
        .context("Server failed")
}

/// Shorthand used by handlers that only need to redirect
pub fn see_other(path: &str) -> Response {
    axum::response::Redirect::to(path).into_response()
}
