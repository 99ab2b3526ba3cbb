//! Two-step provider sign-up: account, then company details with documents

use axum::extract::{Multipart, State};

use crate::config::repository::{providers, users};
use crate::forms::{
    DocumentUpload, FormErrors, ProviderAccountForm, ProviderProfileForm, validate_uploads,
};
use crate::models::User;
use crate::services::{accounts, onboarding};
use crate::web::csrf::CsrfForm;
use crate::web::error::{WebError, WebResult};
use crate::web::session::Session;
use crate::web::views::{CompanyDetailsView, ProviderAccountView};
use crate::web::{AppState, current_user, render, see_other};

const ACCOUNT_PATH: &str = "/register/company/";
const DETAILS_PATH: &str = "/register/company/details/";

pub async fn account_page(State(state): State<AppState>, mut session: Session) -> WebResult {
    let user = current_user(&state, &session).await?;
    let layout = session.form_layout(user.as_ref());
    let page = render(ProviderAccountView::new(layout, ProviderAccountForm::default(), None))?;
    session.finish(&state.pool, page).await
}

pub async fn account_submit(
    State(state): State<AppState>,
    mut session: Session,
    CsrfForm(form): CsrfForm<ProviderAccountForm>,
) -> WebResult {
    let outcome = match form.validate() {
        Ok(input) => accounts::register_provider_account(&state.pool, &input).await?,
        Err(errors) => Err(errors),
    };

    match outcome {
        Ok(user) => {
            session.set_pending_provider(Some(user.id));
            session.finish(&state.pool, see_other(DETAILS_PATH)).await
        }
        Err(errors) => {
            let layout = session.form_layout(None);
            let form = ProviderAccountForm {
                password: String::new(),
                confirm_password: String::new(),
                ..form
            };
            let page = render(ProviderAccountView::new(layout, form, Some(errors)))?;
            session.finish(&state.pool, page).await
        }
    }
}

/// The account finishing onboarding: the pending one from step 1, or a
/// logged-in provider that never completed step 2
async fn onboarding_account(state: &AppState, session: &Session) -> WebResult<Option<User>> {
    let user_id = match session.pending_provider() {
        Some(id) => id,
        None => match current_user(state, session).await? {
            Some(user) if user.is_provider() => user.id,
            _ => return Ok(None),
        },
    };

    let user = users::get_user(&state.pool, user_id)
        .await?
        .filter(|user| user.is_provider())
        .ok_or(WebError::NotFound)?;
    if providers::get_provider_by_user(&state.pool, user.id)
        .await?
        .is_some()
    {
        return Ok(None);
    }
    Ok(Some(user))
}

pub async fn details_page(State(state): State<AppState>, mut session: Session) -> WebResult {
    let Some(user) = onboarding_account(&state, &session).await? else {
        return session.finish(&state.pool, see_other(ACCOUNT_PATH)).await;
    };

    let layout = session.form_layout(None);
    let page = render(CompanyDetailsView::new(
        layout,
        user.username,
        ProviderProfileForm::default(),
        &[],
        None,
    ))?;
    session.finish(&state.pool, page).await
}

/// Multipart body of the company details step
struct DetailsSubmission {
    form: ProviderProfileForm,
    uploads: Vec<DocumentUpload>,
    csrf_token: String,
}

/// Split a multipart body into profile fields and document slots
async fn read_details(mut multipart: Multipart) -> WebResult<DetailsSubmission> {
    let mut form = ProviderProfileForm::default();
    let mut csrf_token = String::new();
    let mut uploads = vec![DocumentUpload::default(); onboarding::DOCUMENT_SLOTS];

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| WebError::BadRequest(e.body_text()))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        let slot = name
            .split_once('-')
            .and_then(|(prefix, rest)| Some((prefix.parse::<usize>().ok()?, rest)))
            .filter(|(index, _)| *index < onboarding::DOCUMENT_SLOTS);

        match slot {
            Some((index, "document_file")) => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content = field
                    .bytes()
                    .await
                    .map_err(|e| WebError::BadRequest(e.body_text()))?;
                uploads[index].file_name = file_name;
                uploads[index].content = content.to_vec();
            }
            Some((index, "document_name")) => {
                uploads[index].document_name = field
                    .text()
                    .await
                    .map_err(|e| WebError::BadRequest(e.body_text()))?;
            }
            _ => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| WebError::BadRequest(e.body_text()))?;
                if name == "csrf_token" {
                    csrf_token = value;
                } else {
                    form.set_field(&name, value);
                }
            }
        }
    }

    Ok(DetailsSubmission {
        form,
        uploads,
        csrf_token,
    })
}

/// Save the company profile, log the provider in and continue to the first service
pub async fn details_submit(
    State(state): State<AppState>,
    mut session: Session,
    multipart: Multipart,
) -> WebResult {
    let Some(user) = onboarding_account(&state, &session).await? else {
        return session.finish(&state.pool, see_other(ACCOUNT_PATH)).await;
    };

    let DetailsSubmission {
        form,
        uploads,
        csrf_token,
    } = read_details(multipart).await?;
    session.verify_csrf(&csrf_token)?;

    let profile = match (form.validate(), validate_uploads(&uploads)) {
        (Ok(profile), Ok(())) => profile,
        (profile, files) => {
            let mut errors = FormErrors::new();
            for result in [profile.map(|_| ()), files] {
                if let Err(found) = result {
                    errors.merge(found);
                }
            }
            let names: Vec<String> = uploads.iter().map(|u| u.document_name.clone()).collect();
            let layout = session.form_layout(None);
            let page = render(CompanyDetailsView::new(
                layout,
                user.username,
                form,
                &names,
                Some(errors),
            ))?;
            return session.finish(&state.pool, page).await;
        }
    };

    onboarding::complete_company_details(
        &state.pool,
        &state.config.media_dir,
        &user,
        &profile,
        &uploads,
    )
    .await?;

    session.login(user.id);
    session.set_pending_provider(None);
    session.success("Company details saved. Add your first service to complete your profile.");
    session.finish(&state.pool, see_other("/services/add/")).await
}
