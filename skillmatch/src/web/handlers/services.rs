//! Provider dashboard and service management

use axum::extract::{Path, State};

use crate::config::repository::{documents, providers};
use crate::forms::{FormErrors, ServiceForm};
use crate::models::{ProviderProfile, Role, User};
use crate::services::{catalog, requests};
use crate::web::csrf::{Confirm, CsrfForm};
use crate::web::error::{WebError, WebResult};
use crate::web::session::Session;
use crate::web::views::{DashboardView, ServiceFormView};
use crate::web::{AppState, render, require_provider, require_role, see_other};

const DASHBOARD_PATH: &str = "/dashboard/";

pub async fn dashboard(State(state): State<AppState>, mut session: Session) -> WebResult {
    let user = require_role(&state, &session, Role::Provider).await?;
    let Some(provider) = providers::get_provider_by_user(&state.pool, user.id).await? else {
        return session
            .finish(&state.pool, see_other("/register/company/details/"))
            .await;
    };

    let services = catalog::list_services(&state.pool, &provider).await?;
    let docs = documents::list_documents(&state.pool, provider.id).await?;
    let matched = requests::list_for_provider(&state.pool, provider.id).await?;

    let layout = session.form_layout(Some(&user));
    let page = render(DashboardView::new(layout, &provider, &services, &docs, &matched))?;
    session.finish(&state.pool, page).await
}

async fn render_service_form(
    state: &AppState,
    session: &mut Session,
    user: &User,
    heading: &'static str,
    action: String,
    form: ServiceForm,
    errors: Option<FormErrors>,
) -> WebResult {
    let categories = catalog::list_categories(&state.pool).await?;
    let layout = session.form_layout(Some(user));
    render(ServiceFormView::new(layout, heading, action, form, &categories, errors))
}

pub async fn add_page(State(state): State<AppState>, mut session: Session) -> WebResult {
    let (user, _) = require_provider(&state, &session).await?;
    let page = render_service_form(
        &state,
        &mut session,
        &user,
        "Add a service",
        "/services/add/".to_string(),
        ServiceForm::default(),
        None,
    )
    .await?;
    session.finish(&state.pool, page).await
}

pub async fn add_submit(
    State(state): State<AppState>,
    mut session: Session,
    CsrfForm(form): CsrfForm<ServiceForm>,
) -> WebResult {
    let (user, provider) = require_provider(&state, &session).await?;
    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => {
            let page = render_service_form(
                &state,
                &mut session,
                &user,
                "Add a service",
                "/services/add/".to_string(),
                form,
                Some(errors),
            )
            .await?;
            return session.finish(&state.pool, page).await;
        }
    };

    catalog::add_service(&state.pool, &provider, &input).await?;
    session.success(format!("Service '{}' added.", input.title));
    session.finish(&state.pool, see_other(DASHBOARD_PATH)).await
}

async fn owned_service_form(
    state: &AppState,
    provider: &ProviderProfile,
    service_id: i64,
) -> WebResult<ServiceForm> {
    let service = catalog::get_owned_service(&state.pool, provider, service_id)
        .await?
        .ok_or(WebError::NotFound)?;
    Ok(ServiceForm::from_service(&service))
}

pub async fn edit_page(
    State(state): State<AppState>,
    mut session: Session,
    Path(id): Path<i64>,
) -> WebResult {
    let (user, provider) = require_provider(&state, &session).await?;
    let form = owned_service_form(&state, &provider, id).await?;
    let page = render_service_form(
        &state,
        &mut session,
        &user,
        "Edit service",
        format!("/services/{}/edit/", id),
        form,
        None,
    )
    .await?;
    session.finish(&state.pool, page).await
}

pub async fn edit_submit(
    State(state): State<AppState>,
    mut session: Session,
    Path(id): Path<i64>,
    CsrfForm(form): CsrfForm<ServiceForm>,
) -> WebResult {
    let (user, provider) = require_provider(&state, &session).await?;
    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => {
            // Foreign ids are not found even when the form is invalid
            owned_service_form(&state, &provider, id).await?;
            let page = render_service_form(
                &state,
                &mut session,
                &user,
                "Edit service",
                format!("/services/{}/edit/", id),
                form,
                Some(errors),
            )
            .await?;
            return session.finish(&state.pool, page).await;
        }
    };

    if !catalog::edit_service(&state.pool, &provider, id, &input).await? {
        return Err(WebError::NotFound);
    }
    session.success(format!("Service '{}' updated.", input.title));
    session.finish(&state.pool, see_other(DASHBOARD_PATH)).await
}

pub async fn delete(
    State(state): State<AppState>,
    mut session: Session,
    Path(id): Path<i64>,
    CsrfForm(Confirm {}): CsrfForm<Confirm>,
) -> WebResult {
    let (_, provider) = require_provider(&state, &session).await?;
    if !catalog::delete_service(&state.pool, &provider, id).await? {
        return Err(WebError::NotFound);
    }
    session.success("Service deleted.");
    session.finish(&state.pool, see_other(DASHBOARD_PATH)).await
}
