//! Cookie-keyed sessions stored in the `sessions` table
//!
//! The `Session` extractor loads the record behind the `sessionid` cookie.
//! Handlers mutate it and hand their response to [`Session::finish`], which
//! persists changes and sets or clears the cookie. A session whose record is
//! empty is never stored, so anonymous visitors leave no rows behind.
//! Rows expire `session_max_age_secs` after creation.
//!
//! The session also owns the `csrftoken` cookie used by [`super::csrf`].

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::{IntoResponse, Response};
use sqlx::SqlitePool;

use super::AppState;
use super::csrf::{self, CSRF_COOKIE, CSRF_MAX_AGE_SECS};
use super::error::WebError;
use super::views::Layout;
use crate::config::repository::sessions::{self, Flash, FlashLevel, SessionRecord};
use crate::models::User;

pub const COOKIE_NAME: &str = "sessionid";

#[derive(Debug)]
pub struct Session {
    token: String,
    record: SessionRecord,
    max_age_secs: u64,
    /// A row exists under `token`
    stored: bool,
    /// Token of a row to drop once the new one is saved (login rotation)
    retired: Option<String>,
    destroy: bool,
    dirty: bool,
    issue_cookie: bool,
    csrf_token: Option<String>,
    issue_csrf: bool,
}

fn new_token() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Value of the named cookie, if the request carries a non-empty one
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(cookie, _)| *cookie == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl Session {
    fn fresh(max_age_secs: u64) -> Self {
        Self {
            token: new_token(),
            record: SessionRecord::default(),
            max_age_secs,
            stored: false,
            retired: None,
            destroy: false,
            dirty: false,
            issue_cookie: true,
            csrf_token: None,
            issue_csrf: false,
        }
    }

    /// Load the session for a request's headers
    pub async fn load(pool: &SqlitePool, headers: &HeaderMap, max_age_secs: u64) -> anyhow::Result<Self> {
        let csrf_token = cookie_value(headers, CSRF_COOKIE);
        let stored = match cookie_value(headers, COOKIE_NAME) {
            Some(token) => sessions::get_session(pool, &token, max_age_secs)
                .await?
                .map(|record| (token, record)),
            None => None,
        };

        let session = match stored {
            Some((token, record)) => Self {
                token,
                record,
                stored: true,
                issue_cookie: false,
                ..Self::fresh(max_age_secs)
            },
            // Unknown or expired token: never adopt a client-chosen id
            None => Self::fresh(max_age_secs),
        };
        Ok(Self {
            csrf_token,
            ..session
        })
    }

    pub fn user_id(&self) -> Option<i64> {
        self.record.user_id
    }

    pub fn pending_provider(&self) -> Option<i64> {
        self.record.pending_provider_user_id
    }

    pub fn set_pending_provider(&mut self, user_id: Option<i64>) {
        self.record.pending_provider_user_id = user_id;
        self.dirty = true;
    }

    /// Attach a user to the session under a new token
    pub fn login(&mut self, user_id: i64) {
        if !self.issue_cookie {
            self.retired = Some(std::mem::replace(&mut self.token, new_token()));
            self.stored = false;
            self.issue_cookie = true;
        }
        self.record.user_id = Some(user_id);
        self.destroy = false;
        self.dirty = true;
    }

    /// Drop all session state, including pending flashes
    pub fn logout(&mut self) {
        self.record = SessionRecord::default();
        self.destroy = true;
    }

    pub fn flash(&mut self, level: FlashLevel, message: impl Into<String>) {
        self.record.flashes.push(Flash {
            level,
            message: message.into(),
        });
        self.dirty = true;
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.flash(FlashLevel::Success, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.flash(FlashLevel::Error, message);
    }

    /// Remove and return queued flash messages (shown once)
    pub fn take_flashes(&mut self) -> Vec<Flash> {
        if self.record.flashes.is_empty() {
            return Vec::new();
        }
        self.dirty = true;
        std::mem::take(&mut self.record.flashes)
    }

    /// Token for hidden form fields; issues the cookie on first use
    pub fn csrf_token(&mut self) -> String {
        match &self.csrf_token {
            Some(token) => token.clone(),
            None => {
                let token = csrf::new_token();
                self.csrf_token = Some(token.clone());
                self.issue_csrf = true;
                token
            }
        }
    }

    /// Check a token submitted outside `CsrfForm` (multipart bodies)
    pub fn verify_csrf(&self, submitted: &str) -> Result<(), WebError> {
        let cookie = if self.issue_csrf { None } else { self.csrf_token.as_deref() };
        csrf::verify(cookie, submitted)
    }

    /// Page chrome for `user`, consuming pending flashes
    pub fn layout(&mut self, user: Option<&User>) -> Layout {
        let flashes = self.take_flashes();
        Layout::new(user, flashes)
    }

    /// Chrome for a page that posts a form; issues the CSRF cookie if needed
    pub fn form_layout(&mut self, user: Option<&User>) -> Layout {
        let token = self.csrf_token();
        self.layout(user).with_csrf_token(token)
    }

    fn session_cookie(&self, clear: bool) -> Option<HeaderValue> {
        let value = if clear {
            format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", COOKIE_NAME)
        } else {
            format!(
                "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
                COOKIE_NAME, self.token, self.max_age_secs
            )
        };
        HeaderValue::from_str(&value).ok()
    }

    fn csrf_cookie(&self) -> Option<HeaderValue> {
        let token = self.csrf_token.as_deref()?;
        let value = format!(
            "{}={}; Path=/; SameSite=Lax; Max-Age={}",
            CSRF_COOKIE, token, CSRF_MAX_AGE_SECS
        );
        HeaderValue::from_str(&value).ok()
    }

    async fn drop_rows(&self, pool: &SqlitePool) -> anyhow::Result<()> {
        if self.stored {
            sessions::delete_session(pool, &self.token).await?;
        }
        if let Some(retired) = &self.retired {
            sessions::delete_session(pool, retired).await?;
        }
        Ok(())
    }

    /// Persist changes and attach cookies to the response
    pub async fn finish(self, pool: &SqlitePool, response: impl IntoResponse) -> Result<Response, WebError> {
        let mut response = response.into_response();
        if self.issue_csrf {
            if let Some(cookie) = self.csrf_cookie() {
                response.headers_mut().append(header::SET_COOKIE, cookie);
            }
        }

        // Nothing left to remember: drop the row and the cookie, if any
        if self.destroy || (self.dirty && self.record.is_empty()) {
            self.drop_rows(pool).await?;
            let had_cookie = self.destroy || self.stored || self.retired.is_some();
            if had_cookie {
                if let Some(cookie) = self.session_cookie(true) {
                    response.headers_mut().append(header::SET_COOKIE, cookie);
                }
            }
            return Ok(response);
        }

        if !self.dirty {
            return Ok(response);
        }

        sessions::save_session(pool, &self.token, &self.record).await?;
        if let Some(retired) = &self.retired {
            sessions::delete_session(pool, retired).await?;
        }
        if self.issue_cookie {
            if let Some(cookie) = self.session_cookie(false) {
                response.headers_mut().append(header::SET_COOKIE, cookie);
            }
        }
        Ok(response)
    }
}

impl<S> FromRequestParts<S> for Session
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app = AppState::from_ref(state);
        Ok(Session::load(&app.pool, &parts.headers, app.config.session_max_age_secs).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX_AGE: u64 = 3600;

    fn cookie_headers(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    fn set_cookies(response: &Response) -> Vec<String> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    async fn session_rows(pool: &SqlitePool) -> i64 {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sessions")
            .fetch_one(pool)
            .await
            .unwrap();
        count
    }

    #[test]
    fn test_cookie_parsing() {
        let headers = cookie_headers("theme=dark; sessionid=abc123 ; csrftoken=xyz");
        assert_eq!(cookie_value(&headers, COOKIE_NAME).as_deref(), Some("abc123"));
        assert_eq!(cookie_value(&headers, CSRF_COOKIE).as_deref(), Some("xyz"));

        let empty = cookie_headers("sessionid=");
        assert_eq!(cookie_value(&empty, COOKIE_NAME), None);
        assert_eq!(cookie_value(&HeaderMap::new(), COOKIE_NAME), None);
    }

    #[tokio::test]
    async fn test_login_rotates_token_and_flashes_show_once() {
        let pool = crate::config::memory_pool().await.unwrap();
        sqlx::query("INSERT INTO users (username, password_hash, role) VALUES ('alice', 'x', 'user')")
            .execute(&pool)
            .await
            .unwrap();

        let mut session = Session::fresh(MAX_AGE);
        session.success("Welcome");
        let first_token = session.token.clone();
        let response = session.finish(&pool, "ok").await.unwrap();
        assert!(set_cookies(&response)[0].starts_with("sessionid="));

        let headers = cookie_headers(&format!("sessionid={}", first_token));
        let mut session = Session::load(&pool, &headers, MAX_AGE).await.unwrap();
        assert_eq!(session.take_flashes().len(), 1);
        session.login(1);
        let second_token = session.token.clone();
        assert_ne!(first_token, second_token);
        session.finish(&pool, "ok").await.unwrap();

        assert!(sessions::get_session(&pool, &first_token, MAX_AGE).await.unwrap().is_none());
        let stored = sessions::get_session(&pool, &second_token, MAX_AGE)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.user_id, Some(1));
        assert!(stored.flashes.is_empty());
    }

    #[tokio::test]
    async fn test_flash_shown_on_the_same_request_is_not_stored() {
        let pool = crate::config::memory_pool().await.unwrap();

        let mut session = Session::fresh(MAX_AGE);
        session.error("Invalid username or password.");
        assert_eq!(session.take_flashes().len(), 1);
        let response = session.finish(&pool, "ok").await.unwrap();

        assert!(set_cookies(&response).is_empty());
        assert_eq!(session_rows(&pool).await, 0);
    }

    #[tokio::test]
    async fn test_consumed_stored_session_is_deleted() {
        let pool = crate::config::memory_pool().await.unwrap();

        let mut session = Session::fresh(MAX_AGE);
        session.success("Account created successfully. Please log in.");
        let token = session.token.clone();
        session.finish(&pool, "ok").await.unwrap();
        assert_eq!(session_rows(&pool).await, 1);

        let headers = cookie_headers(&format!("sessionid={}", token));
        let mut session = Session::load(&pool, &headers, MAX_AGE).await.unwrap();
        assert_eq!(session.take_flashes().len(), 1);
        let response = session.finish(&pool, "ok").await.unwrap();

        assert_eq!(session_rows(&pool).await, 0);
        assert!(set_cookies(&response)[0].contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_expired_session_is_not_adopted() {
        let pool = crate::config::memory_pool().await.unwrap();
        sqlx::query("INSERT INTO users (username, password_hash, role) VALUES ('alice', 'x', 'user')")
            .execute(&pool)
            .await
            .unwrap();
        let record = SessionRecord {
            user_id: Some(1),
            ..Default::default()
        };
        sessions::save_session(&pool, "old", &record).await.unwrap();
        sqlx::query("UPDATE sessions SET created_at = datetime('now', '-2 hours')")
            .execute(&pool)
            .await
            .unwrap();

        let headers = cookie_headers("sessionid=old");
        let session = Session::load(&pool, &headers, MAX_AGE).await.unwrap();
        assert_eq!(session.user_id(), None);
        assert_ne!(session.token, "old");
    }

    #[tokio::test]
    async fn test_csrf_cookie_issued_once() {
        let pool = crate::config::memory_pool().await.unwrap();

        let mut session = Session::fresh(MAX_AGE);
        let token = session.csrf_token();
        assert_eq!(session.csrf_token(), token);
        // A token minted on this request has no cookie to match yet
        assert!(session.verify_csrf(&token).is_err());
        let response = session.finish(&pool, "ok").await.unwrap();
        assert_eq!(
            set_cookies(&response),
            vec![format!(
                "csrftoken={}; Path=/; SameSite=Lax; Max-Age={}",
                token, CSRF_MAX_AGE_SECS
            )]
        );

        let headers = cookie_headers(&format!("csrftoken={}", token));
        let mut session = Session::load(&pool, &headers, MAX_AGE).await.unwrap();
        assert_eq!(session.csrf_token(), token);
        assert!(session.verify_csrf(&token).is_ok());
        let response = session.finish(&pool, "ok").await.unwrap();
        assert!(set_cookies(&response).is_empty());
    }
}
