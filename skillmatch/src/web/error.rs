//! Error responses for the web layer

use askama::Template;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};

use super::views::ErrorView;

pub const LOGIN_PATH: &str = "/login/";

/// Failure of a handler. Unexpected errors are logged and shown as a 500 page;
/// authorization failures redirect to the login page.
#[derive(Debug)]
pub enum WebError {
    /// Not logged in, or logged in with the wrong role
    LoginRequired,
    /// Form post without a matching CSRF token
    Forbidden,
    NotFound,
    BadRequest(String),
    Internal(anyhow::Error),
}

impl<E> From<E> for WebError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        WebError::Internal(err.into())
    }
}

/// Render the error page with a fallback to plain text
pub fn render_error(status: StatusCode, message: &str) -> Response {
    let view = ErrorView::new(status, message);
    match view.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            log::error!("Failed to render error view: {}", e);
            (status, message.to_string()).into_response()
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        match self {
            WebError::LoginRequired => Redirect::to(LOGIN_PATH).into_response(),
            WebError::Forbidden => render_error(
                StatusCode::FORBIDDEN,
                "CSRF verification failed. Request aborted.",
            ),
            WebError::NotFound => render_error(StatusCode::NOT_FOUND, "Page not found."),
            WebError::BadRequest(message) => render_error(StatusCode::BAD_REQUEST, &message),
            WebError::Internal(err) => {
                log::error!("Request failed: {:#}", err);
                render_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong. Please try again.",
                )
            }
        }
    }
}

pub type WebResult<T = Response> = Result<T, WebError>;
