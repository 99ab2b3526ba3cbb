//! Repository for user accounts

use anyhow::{Context, Result, anyhow};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::models::{Role, User};

/// Fields for a new account; the password is already hashed
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub role: Role,
    pub location: &'a str,
}

const USER_COLUMNS: &str =
    "id, username, email, password_hash, role, phone, location, is_active, created_at";

fn user_from_row(row: &SqliteRow) -> Result<User> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        role: Role::from_db(&role).ok_or_else(|| anyhow!("Unknown role in database: {}", role))?,
        phone: row.try_get("phone")?,
        location: row.try_get("location")?,
        is_active: row.try_get::<i64, _>("is_active")? != 0,
        created_at: row.try_get("created_at")?,
    })
}

/// Insert a new user, returning its id
pub async fn insert_user(pool: &SqlitePool, user: &NewUser<'_>) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO users (username, email, password_hash, role, location)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(user.username)
    .bind(user.email)
    .bind(user.password_hash)
    .bind(user.role.as_db())
    .bind(user.location)
    .execute(pool)
    .await
    .context("Failed to insert user")?;

    Ok(result.last_insert_rowid())
}

/// Whether an error from this repository came from a UNIQUE constraint
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    match err.downcast_ref::<sqlx::Error>() {
        Some(sqlx::Error::Database(db)) => db.is_unique_violation(),
        _ => false,
    }
}

/// Check if a username is taken
pub async fn username_exists(pool: &SqlitePool, username: &str) -> Result<bool> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await
        .context("Failed to check username existence")?;

    Ok(row.is_some())
}

pub async fn get_user(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user")?;

    row.as_ref().map(user_from_row).transpose()
}

pub async fn get_user_by_username(pool: &SqlitePool, username: &str) -> Result<Option<User>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM users WHERE username = ?",
        USER_COLUMNS
    ))
    .bind(username)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by username")?;

    row.as_ref().map(user_from_row).transpose()
}

/// List all users ordered by username
pub async fn list_users(pool: &SqlitePool) -> Result<Vec<User>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM users ORDER BY username",
        USER_COLUMNS
    ))
    .fetch_all(pool)
    .await
    .context("Failed to list users")?;

    rows.iter().map(user_from_row).collect()
}

/// Enable or disable login for an account
pub async fn set_user_active(pool: &SqlitePool, id: i64, active: bool) -> Result<bool> {
    let result = sqlx::query("UPDATE users SET is_active = ? WHERE id = ?")
        .bind(active as i64)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update user active flag")?;

    Ok(result.rows_affected() > 0)
}
