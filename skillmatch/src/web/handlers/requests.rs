//! Seeker requests: listing, creation with matching, completion

use axum::extract::{Path, State};

use crate::forms::RequestForm;
use crate::models::{RequestStatus, Role};
use crate::services::requests::{self, Completion};
use crate::web::csrf::{Confirm, CsrfForm};
use crate::web::error::{WebError, WebResult};
use crate::web::session::Session;
use crate::web::views::{RequestFormView, RequestRow, RequestsView};
use crate::web::{AppState, render, require_role, see_other};

const REQUESTS_PATH: &str = "/requests/";

pub async fn list(State(state): State<AppState>, mut session: Session) -> WebResult {
    let user = require_role(&state, &session, Role::Seeker).await?;
    let summaries = requests::list_for_user(&state.pool, &user).await?;

    let layout = session.form_layout(Some(&user));
    let page = render(RequestsView {
        layout,
        requests: summaries.iter().map(RequestRow::from).collect(),
    })?;
    session.finish(&state.pool, page).await
}

pub async fn new_page(State(state): State<AppState>, mut session: Session) -> WebResult {
    let user = require_role(&state, &session, Role::Seeker).await?;
    let form = RequestForm {
        location: user.location.clone(),
        ..RequestForm::default()
    };

    let layout = session.form_layout(Some(&user));
    let page = render(RequestFormView {
        layout,
        form,
        errors: Vec::new(),
    })?;
    session.finish(&state.pool, page).await
}

/// Save the request; matching runs immediately
pub async fn new_submit(
    State(state): State<AppState>,
    mut session: Session,
    CsrfForm(form): CsrfForm<RequestForm>,
) -> WebResult {
    let user = require_role(&state, &session, Role::Seeker).await?;
    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => {
            let layout = session.form_layout(Some(&user));
            let page = render(RequestFormView {
                layout,
                form,
                errors: errors.messages().to_vec(),
            })?;
            return session.finish(&state.pool, page).await;
        }
    };

    let request = requests::create_request(&state.pool, &user, &input).await?;
    match request.status {
        RequestStatus::Matched => {
            session.success("Your request has been matched with a provider.")
        }
        _ => session.success(
            "Your request has been submitted. We will match you with a provider as soon as one is available.",
        ),
    }
    session.finish(&state.pool, see_other(REQUESTS_PATH)).await
}

pub async fn complete(
    State(state): State<AppState>,
    mut session: Session,
    Path(id): Path<i64>,
    CsrfForm(Confirm {}): CsrfForm<Confirm>,
) -> WebResult {
    let user = require_role(&state, &session, Role::Seeker).await?;
    match requests::complete_request(&state.pool, &user, id).await? {
        Completion::Completed => session.success("Request marked as completed."),
        Completion::NotMatched(status) => session.error(format!(
            "Only matched requests can be completed; this one is {}.",
            status.label().to_lowercase()
        )),
        Completion::NotFound => return Err(WebError::NotFound),
    }
    session.finish(&state.pool, see_other(REQUESTS_PATH)).await
}
