//! Repository for provider (company) profiles

use anyhow::{Context, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteExecutor, SqlitePool};

use crate::models::{NewProviderProfile, ProviderProfile};

const PROVIDER_COLUMNS: &str = "id, user_id, company_name, service_category, description, \
     verified, rating, location, address, contact_number, latitude, longitude, profile_completed";

fn provider_from_row(row: &SqliteRow) -> Result<ProviderProfile> {
    Ok(ProviderProfile {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        company_name: row.try_get("company_name")?,
        service_category: row.try_get("service_category")?,
        description: row.try_get("description")?,
        verified: row.try_get::<i64, _>("verified")? != 0,
        rating: row.try_get("rating")?,
        location: row.try_get("location")?,
        address: row.try_get("address")?,
        contact_number: row.try_get("contact_number")?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        profile_completed: row.try_get::<i64, _>("profile_completed")? != 0,
    })
}

/// Create the profile for a provider account (unverified, incomplete)
pub async fn insert_provider<'e, E>(
    executor: E,
    user_id: i64,
    profile: &NewProviderProfile,
) -> Result<i64>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO providers (
            user_id, company_name, service_category, description, location,
            address, contact_number, latitude, longitude, profile_completed
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0)
        "#,
    )
    .bind(user_id)
    .bind(&profile.company_name)
    .bind(&profile.service_category)
    .bind(&profile.description)
    .bind(&profile.location)
    .bind(&profile.address)
    .bind(&profile.contact_number)
    .bind(profile.latitude)
    .bind(profile.longitude)
    .execute(executor)
    .await
    .context("Failed to insert provider profile")?;

    Ok(result.last_insert_rowid())
}

pub async fn get_provider(pool: &SqlitePool, id: i64) -> Result<Option<ProviderProfile>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM providers WHERE id = ?",
        PROVIDER_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get provider")?;

    row.as_ref().map(provider_from_row).transpose()
}

/// Get the profile owned by an account
pub async fn get_provider_by_user(
    pool: &SqlitePool,
    user_id: i64,
) -> Result<Option<ProviderProfile>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM providers WHERE user_id = ?",
        PROVIDER_COLUMNS
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .context("Failed to get provider by user")?;

    row.as_ref().map(provider_from_row).transpose()
}

/// List all providers ordered by company name
pub async fn list_providers(pool: &SqlitePool) -> Result<Vec<ProviderProfile>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM providers ORDER BY company_name, id",
        PROVIDER_COLUMNS
    ))
    .fetch_all(pool)
    .await
    .context("Failed to list providers")?;

    rows.iter().map(provider_from_row).collect()
}

/// Verified providers in id order: the candidate set for matching
pub async fn list_verified_providers(pool: &SqlitePool) -> Result<Vec<ProviderProfile>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM providers WHERE verified = 1 ORDER BY id",
        PROVIDER_COLUMNS
    ))
    .fetch_all(pool)
    .await
    .context("Failed to list verified providers")?;

    rows.iter().map(provider_from_row).collect()
}

pub async fn set_verified(pool: &SqlitePool, id: i64, verified: bool) -> Result<bool> {
    let result = sqlx::query("UPDATE providers SET verified = ? WHERE id = ?")
        .bind(verified as i64)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update provider verification")?;

    Ok(result.rows_affected() > 0)
}

pub async fn set_rating(pool: &SqlitePool, id: i64, rating: f64) -> Result<bool> {
    let result = sqlx::query("UPDATE providers SET rating = ? WHERE id = ?")
        .bind(rating)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update provider rating")?;

    Ok(result.rows_affected() > 0)
}

pub async fn set_profile_completed<'e, E>(executor: E, id: i64, completed: bool) -> Result<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query("UPDATE providers SET profile_completed = ? WHERE id = ?")
        .bind(completed as i64)
        .bind(id)
        .execute(executor)
        .await
        .context("Failed to update provider completion flag")?;

    Ok(())
}
