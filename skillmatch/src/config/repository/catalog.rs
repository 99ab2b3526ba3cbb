//! Repository for categories and services

use anyhow::{Context, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteExecutor, SqlitePool};

use crate::models::{CatalogEntry, Category, Service};

/// Editable service fields
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceFields {
    pub category_id: i64,
    pub title: String,
    pub description: String,
    pub min_price: f64,
    pub max_price: f64,
}

const SERVICE_SELECT: &str = r#"
    SELECT s.id, s.provider_id, s.title, s.description, s.min_price, s.max_price,
           c.id AS category_id, c.name AS category_name, c.slug AS category_slug
    FROM services s
    JOIN categories c ON c.id = s.category_id
"#;

fn category_from_row(row: &SqliteRow) -> Result<Category> {
    Ok(Category {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
    })
}

fn service_from_row(row: &SqliteRow) -> Result<Service> {
    Ok(Service {
        id: row.try_get("id")?,
        provider_id: row.try_get("provider_id")?,
        category: Category {
            id: row.try_get("category_id")?,
            name: row.try_get("category_name")?,
            slug: row.try_get("category_slug")?,
        },
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        min_price: row.try_get("min_price")?,
        max_price: row.try_get("max_price")?,
    })
}

/// Case-insensitive lookup by exact name
pub async fn find_category_by_name<'e, E>(executor: E, name: &str) -> Result<Option<Category>>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query("SELECT id, name, slug FROM categories WHERE name = ? COLLATE NOCASE")
        .bind(name)
        .fetch_optional(executor)
        .await
        .context("Failed to look up category")?;

    row.as_ref().map(category_from_row).transpose()
}

pub async fn find_category_by_slug(pool: &SqlitePool, slug: &str) -> Result<Option<Category>> {
    let row = sqlx::query("SELECT id, name, slug FROM categories WHERE slug = ?")
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to look up category by slug")?;

    row.as_ref().map(category_from_row).transpose()
}

/// Check if a slug is already used by another category
pub async fn slug_exists<'e, E>(executor: E, slug: &str) -> Result<bool>
where
    E: SqliteExecutor<'e>,
{
    let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM categories WHERE slug = ?")
        .bind(slug)
        .fetch_optional(executor)
        .await
        .context("Failed to check category slug")?;

    Ok(row.is_some())
}

pub async fn insert_category<'e, E>(executor: E, name: &str, slug: &str) -> Result<Category>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("INSERT INTO categories (name, slug) VALUES (?, ?)")
        .bind(name)
        .bind(slug)
        .execute(executor)
        .await
        .context("Failed to insert category")?;

    Ok(Category {
        id: result.last_insert_rowid(),
        name: name.to_string(),
        slug: slug.to_string(),
    })
}

/// All categories ordered by name (datalist suggestions, catalog filter)
pub async fn list_categories(pool: &SqlitePool) -> Result<Vec<Category>> {
    let rows = sqlx::query("SELECT id, name, slug FROM categories ORDER BY name COLLATE NOCASE")
        .fetch_all(pool)
        .await
        .context("Failed to list categories")?;

    rows.iter().map(category_from_row).collect()
}

pub async fn insert_service<'e, E>(
    executor: E,
    provider_id: i64,
    fields: &ServiceFields,
) -> Result<i64>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO services (provider_id, category_id, title, description, min_price, max_price)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(provider_id)
    .bind(fields.category_id)
    .bind(&fields.title)
    .bind(&fields.description)
    .bind(fields.min_price)
    .bind(fields.max_price)
    .execute(executor)
    .await
    .context("Failed to insert service")?;

    Ok(result.last_insert_rowid())
}

/// Update a service owned by `provider_id`. Returns false when no such service exists.
pub async fn update_service(
    pool: &SqlitePool,
    provider_id: i64,
    service_id: i64,
    fields: &ServiceFields,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE services
        SET category_id = ?, title = ?, description = ?, min_price = ?, max_price = ?
        WHERE id = ? AND provider_id = ?
        "#,
    )
    .bind(fields.category_id)
    .bind(&fields.title)
    .bind(&fields.description)
    .bind(fields.min_price)
    .bind(fields.max_price)
    .bind(service_id)
    .bind(provider_id)
    .execute(pool)
    .await
    .context("Failed to update service")?;

    Ok(result.rows_affected() > 0)
}

/// Delete a service owned by `provider_id`
pub async fn delete_service(pool: &SqlitePool, provider_id: i64, service_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM services WHERE id = ? AND provider_id = ?")
        .bind(service_id)
        .bind(provider_id)
        .execute(pool)
        .await
        .context("Failed to delete service")?;

    Ok(result.rows_affected() > 0)
}

/// Get a service only if it belongs to `provider_id`
pub async fn get_owned_service(
    pool: &SqlitePool,
    provider_id: i64,
    service_id: i64,
) -> Result<Option<Service>> {
    let row = sqlx::query(&format!(
        "{} WHERE s.id = ? AND s.provider_id = ?",
        SERVICE_SELECT
    ))
    .bind(service_id)
    .bind(provider_id)
    .fetch_optional(pool)
    .await
    .context("Failed to get service")?;

    row.as_ref().map(service_from_row).transpose()
}

pub async fn list_services_for_provider(pool: &SqlitePool, provider_id: i64) -> Result<Vec<Service>> {
    let rows = sqlx::query(&format!(
        "{} WHERE s.provider_id = ? ORDER BY s.title, s.id",
        SERVICE_SELECT
    ))
    .bind(provider_id)
    .fetch_all(pool)
    .await
    .context("Failed to list provider services")?;

    rows.iter().map(service_from_row).collect()
}

/// Public catalog, optionally restricted to one category
pub async fn list_catalog(pool: &SqlitePool, category_id: Option<i64>) -> Result<Vec<CatalogEntry>> {
    let rows = sqlx::query(
        r#"
        SELECT s.id, s.provider_id, s.title, s.description, s.min_price, s.max_price,
               c.id AS category_id, c.name AS category_name, c.slug AS category_slug,
               p.company_name, p.verified
        FROM services s
        JOIN categories c ON c.id = s.category_id
        JOIN providers p ON p.id = s.provider_id
        WHERE (?1 IS NULL OR s.category_id = ?1)
        ORDER BY c.name COLLATE NOCASE, p.rating DESC, s.title
        "#,
    )
    .bind(category_id)
    .fetch_all(pool)
    .await
    .context("Failed to list catalog")?;

    let mut entries = Vec::new();
    for row in &rows {
        entries.push(CatalogEntry {
            service: service_from_row(row)?,
            company_name: row.try_get("company_name")?,
            verified: row.try_get::<i64, _>("verified")? != 0,
        });
    }

    Ok(entries)
}
