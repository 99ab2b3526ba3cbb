//! Login, logout and seeker registration

use axum::extract::State;

use crate::config::repository::sessions;
use crate::forms::{LoginForm, SeekerRegistrationForm};
use crate::services::accounts;
use crate::web::csrf::CsrfForm;
use crate::web::error::{LOGIN_PATH, WebResult};
use crate::web::session::Session;
use crate::web::views::{LoginView, RegisterUserView};
use crate::web::{AppState, current_user, render, see_other};

pub async fn login_page(State(state): State<AppState>, mut session: Session) -> WebResult {
    let user = current_user(&state, &session).await?;
    let layout = session.form_layout(user.as_ref());
    let page = render(LoginView {
        layout,
        form: LoginForm::default(),
    })?;
    session.finish(&state.pool, page).await
}

/// Providers land on their dashboard, seekers on their requests
pub async fn login_submit(
    State(state): State<AppState>,
    mut session: Session,
    CsrfForm(form): CsrfForm<LoginForm>,
) -> WebResult {
    match accounts::authenticate(&state.pool, &form.username, &form.password).await? {
        Some(user) => {
            log::info!("User '{}' logged in", user.username);
            let purged = sessions::delete_expired_sessions(
                &state.pool,
                state.config.session_max_age_secs,
            )
            .await?;
            if purged > 0 {
                log::debug!("Removed {} expired session(s)", purged);
            }
            session.login(user.id);
            let target = if user.is_provider() { "/dashboard/" } else { "/requests/" };
            session.finish(&state.pool, see_other(target)).await
        }
        None => {
            session.error("Invalid username or password.");
            let layout = session.form_layout(None);
            let page = render(LoginView {
                layout,
                form: LoginForm {
                    username: form.username,
                    password: String::new(),
                },
            })?;
            session.finish(&state.pool, page).await
        }
    }
}

pub async fn logout(State(state): State<AppState>, mut session: Session) -> WebResult {
    session.logout();
    session.finish(&state.pool, see_other(LOGIN_PATH)).await
}

pub async fn register_user_page(State(state): State<AppState>, mut session: Session) -> WebResult {
    let user = current_user(&state, &session).await?;
    let layout = session.form_layout(user.as_ref());
    let page = render(RegisterUserView {
        layout,
        form: SeekerRegistrationForm::default(),
    })?;
    session.finish(&state.pool, page).await
}

/// Validation problems are shown as messages above the re-rendered form
pub async fn register_user_submit(
    State(state): State<AppState>,
    mut session: Session,
    CsrfForm(form): CsrfForm<SeekerRegistrationForm>,
) -> WebResult {
    let outcome = match form.validate() {
        Ok(input) => accounts::register_seeker(&state.pool, &input).await?.map(|_| ()),
        Err(errors) => Err(errors),
    };

    match outcome {
        Ok(()) => {
            session.success("Account created successfully. Please log in.");
            session.finish(&state.pool, see_other(LOGIN_PATH)).await
        }
        Err(errors) => {
            for message in errors.messages() {
                session.error(message.clone());
            }
            let layout = session.form_layout(None);
            let page = render(RegisterUserView {
                layout,
                form: SeekerRegistrationForm {
                    password: String::new(),
                    ..form
                },
            })?;
            session.finish(&state.pool, page).await
        }
    }
}
