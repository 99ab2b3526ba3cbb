//! Public pages: landing, role choice, catalog, assets

use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::services::catalog;
use crate::web::error::{WebError, WebResult};
use crate::web::session::Session;
use crate::web::views::{CatalogView, GetStartedView, LandingView};
use crate::web::{AppState, current_user, render};

static STYLE_CSS: &str = include_str!("../../../assets/styles.css");
static LOCATION_PICKER_JS: &str = include_str!("../../../assets/location-picker.js");

pub async fn landing(State(state): State<AppState>, mut session: Session) -> WebResult {
    let user = current_user(&state, &session).await?;
    let layout = session.layout(user.as_ref());
    let page = render(LandingView { layout })?;
    session.finish(&state.pool, page).await
}

pub async fn get_started(State(state): State<AppState>, mut session: Session) -> WebResult {
    let user = current_user(&state, &session).await?;
    let layout = session.layout(user.as_ref());
    let page = render(GetStartedView { layout })?;
    session.finish(&state.pool, page).await
}

#[derive(Debug, Deserialize)]
pub struct CatalogQuery {
    pub category: Option<String>,
}

/// Public service catalog with an optional category filter
pub async fn catalog(
    State(state): State<AppState>,
    mut session: Session,
    Query(query): Query<CatalogQuery>,
) -> WebResult {
    let user = current_user(&state, &session).await?;
    let selected = query.category.as_deref();
    let categories = catalog::list_categories(&state.pool).await?;
    let entries = catalog::browse(&state.pool, selected).await?;

    let layout = session.layout(user.as_ref());
    let page = render(CatalogView::new(layout, &categories, selected, &entries))?;
    session.finish(&state.pool, page).await
}

pub async fn healthz() -> &'static str {
    "ok"
}

pub async fn static_asset(Path(file): Path<String>) -> Response {
    match file.as_str() {
        "styles.css" => ([(header::CONTENT_TYPE, "text/css")], STYLE_CSS).into_response(),
        "location-picker.js" => (
            [(header::CONTENT_TYPE, "application/javascript")],
            LOCATION_PICKER_JS,
        )
            .into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

pub async fn not_found() -> WebError {
    WebError::NotFound
}
