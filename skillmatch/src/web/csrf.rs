//! Double-submit CSRF protection
//!
//! Rendered forms carry the value of the `csrftoken` cookie in a hidden
//! `csrf_token` field. A state-changing post is refused unless the two agree.
//! The cookie is issued by [`Session`](super::session::Session) the first time
//! a page asks for the token.

use axum::Form;
use axum::extract::{FromRequest, Request};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::error::WebError;
use super::session::cookie_value;

pub const CSRF_COOKIE: &str = "csrftoken";

/// Cookie lifetime, one year
pub const CSRF_MAX_AGE_SECS: u64 = 365 * 24 * 60 * 60;

pub fn new_token() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Compare without returning at the first differing byte
fn tokens_match(expected: &str, submitted: &str) -> bool {
    expected.len() == submitted.len()
        && expected
            .bytes()
            .zip(submitted.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

/// Check a submitted token against the request's cookie
pub fn verify(cookie: Option<&str>, submitted: &str) -> Result<(), WebError> {
    match cookie {
        Some(expected) if !submitted.is_empty() && tokens_match(expected, submitted) => Ok(()),
        _ => {
            log::warn!("Rejected a post with a missing or mismatched CSRF token");
            Err(WebError::Forbidden)
        }
    }
}

#[derive(Deserialize)]
struct WithToken<T> {
    #[serde(default)]
    csrf_token: String,
    #[serde(flatten)]
    fields: T,
}

/// `Form<T>` that also requires the CSRF token
pub struct CsrfForm<T>(pub T);

impl<S, T> FromRequest<S> for CsrfForm<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = WebError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let cookie = cookie_value(req.headers(), CSRF_COOKIE);
        let Form(submitted) = Form::<WithToken<T>>::from_request(req, state)
            .await
            .map_err(|e| WebError::BadRequest(e.body_text()))?;
        verify(cookie.as_deref(), &submitted.csrf_token)?;
        Ok(CsrfForm(submitted.fields))
    }
}

/// Body of a button-only form such as delete or complete
#[derive(Debug, Default, Deserialize)]
pub struct Confirm {}
