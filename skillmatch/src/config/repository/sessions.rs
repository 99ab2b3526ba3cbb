//! Server-side session storage

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

/// Severity of a one-shot flash message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Error,
}

impl FlashLevel {
    pub fn css_class(&self) -> &'static str {
        match self {
            FlashLevel::Success => "success",
            FlashLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

/// Persisted session state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionRecord {
    pub user_id: Option<i64>,
    /// Account created by onboarding step 1, waiting for its company profile
    pub pending_provider_user_id: Option<i64>,
    pub flashes: Vec<Flash>,
}

impl SessionRecord {
    /// Nothing worth persisting
    pub fn is_empty(&self) -> bool {
        self.user_id.is_none() && self.pending_provider_user_id.is_none() && self.flashes.is_empty()
    }
}

/// SQLite datetime modifier for "this many seconds ago"
fn age_modifier(max_age_secs: u64) -> String {
    format!("-{} seconds", max_age_secs)
}

/// Load a session created less than `max_age_secs` ago
pub async fn get_session(
    pool: &SqlitePool,
    token: &str,
    max_age_secs: u64,
) -> Result<Option<SessionRecord>> {
    let row = sqlx::query(
        r#"
        SELECT user_id, pending_provider_user_id, flash_json FROM sessions
        WHERE token = ? AND created_at > datetime('now', ?)
        "#,
    )
    .bind(token)
    .bind(age_modifier(max_age_secs))
    .fetch_optional(pool)
    .await
    .context("Failed to load session")?;

    let Some(row) = row else {
        return Ok(None);
    };

    let flash_json: String = row.try_get("flash_json")?;
    let flashes: Vec<Flash> = serde_json::from_str(&flash_json).unwrap_or_else(|e| {
        log::warn!("Discarding unreadable flash messages: {}", e);
        Vec::new()
    });

    Ok(Some(SessionRecord {
        user_id: row.try_get("user_id")?,
        pending_provider_user_id: row.try_get("pending_provider_user_id")?,
        flashes,
    }))
}

/// Insert or replace the session stored under `token`
pub async fn save_session(pool: &SqlitePool, token: &str, session: &SessionRecord) -> Result<()> {
    let flash_json =
        serde_json::to_string(&session.flashes).context("Failed to serialize flash messages")?;

    sqlx::query(
        r#"
        INSERT INTO sessions (token, user_id, pending_provider_user_id, flash_json)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(token) DO UPDATE SET
            user_id = excluded.user_id,
            pending_provider_user_id = excluded.pending_provider_user_id,
            flash_json = excluded.flash_json
        "#,
    )
    .bind(token)
    .bind(session.user_id)
    .bind(session.pending_provider_user_id)
    .bind(&flash_json)
    .execute(pool)
    .await
    .context("Failed to save session")?;

    Ok(())
}

pub async fn delete_session(pool: &SqlitePool, token: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await
        .context("Failed to delete session")?;

    Ok(())
}

/// Remove sessions older than `max_age_secs`; returns how many were dropped
pub async fn delete_expired_sessions(pool: &SqlitePool, max_age_secs: u64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE created_at <= datetime('now', ?)")
        .bind(age_modifier(max_age_secs))
        .execute(pool)
        .await
        .context("Failed to delete expired sessions")?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::memory_pool;

    const DAY: u64 = 24 * 60 * 60;

    fn with_flash() -> SessionRecord {
        SessionRecord {
            flashes: vec![Flash {
                level: FlashLevel::Success,
                message: "Saved".into(),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_record() {
        assert!(SessionRecord::default().is_empty());
        assert!(!with_flash().is_empty());
        let pending = SessionRecord {
            pending_provider_user_id: Some(3),
            ..Default::default()
        };
        assert!(!pending.is_empty());
    }

    #[tokio::test]
    async fn test_old_sessions_expire_and_are_purged() {
        let pool = memory_pool().await.unwrap();
        save_session(&pool, "fresh", &with_flash()).await.unwrap();
        save_session(&pool, "stale", &with_flash()).await.unwrap();
        sqlx::query("UPDATE sessions SET created_at = datetime('now', '-15 days') WHERE token = 'stale'")
            .execute(&pool)
            .await
            .unwrap();

        assert!(get_session(&pool, "fresh", 14 * DAY).await.unwrap().is_some());
        assert!(get_session(&pool, "stale", 14 * DAY).await.unwrap().is_none());
        assert!(get_session(&pool, "stale", 30 * DAY).await.unwrap().is_some());

        assert_eq!(delete_expired_sessions(&pool, 14 * DAY).await.unwrap(), 1);
        let (remaining,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sessions")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(remaining, 1);
    }
}
