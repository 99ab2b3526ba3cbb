//! Categories and the services providers offer

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::{SqliteConnection, SqlitePool};

use crate::config::repository::catalog::{self, ServiceFields};
use crate::config::repository::providers;
use crate::forms::ServiceInput;
use crate::models::{CatalogEntry, Category, ProviderProfile, Service};

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s-]").expect("valid slug regex"));
static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-\s_]+").expect("valid slug regex"));

/// URL slug for a category name: lowercase words joined by single hyphens
pub fn slugify(name: &str) -> String {
    let lowered = name.to_lowercase();
    let stripped = NON_WORD.replace_all(&lowered, "");
    let joined = SEPARATORS.replace_all(stripped.trim(), "-");
    joined.trim_matches('-').to_string()
}

/// First free slug: `base`, `base-2`, `base-3`, ...
async fn unique_slug(conn: &mut SqliteConnection, name: &str) -> Result<String> {
    let base = match slugify(name) {
        s if s.is_empty() => "category".to_string(),
        s => s,
    };

    let mut candidate = base.clone();
    let mut n = 2;
    while catalog::slug_exists(&mut *conn, &candidate).await? {
        candidate = format!("{}-{}", base, n);
        n += 1;
    }
    Ok(candidate)
}

async fn get_or_create_in(conn: &mut SqliteConnection, name: &str) -> Result<Category> {
    let name = name.trim();
    if let Some(existing) = catalog::find_category_by_name(&mut *conn, name).await? {
        return Ok(existing);
    }

    let slug = unique_slug(conn, name).await?;
    let category = catalog::insert_category(&mut *conn, name, &slug).await?;
    log::info!("Created category '{}' ({})", category.name, category.slug);
    Ok(category)
}

/// Look a category up case-insensitively, creating it on first use
pub async fn get_or_create_category(pool: &SqlitePool, name: &str) -> Result<Category> {
    let mut tx = pool.begin().await.context("Failed to start transaction")?;
    let category = get_or_create_in(&mut *tx, name).await?;
    tx.commit().await.context("Failed to commit category")?;
    Ok(category)
}

/// Create a service for the provider and mark its profile complete
pub async fn add_service(
    pool: &SqlitePool,
    provider: &ProviderProfile,
    input: &ServiceInput,
) -> Result<i64> {
    let mut tx = pool.begin().await.context("Failed to start transaction")?;

    let category = get_or_create_in(&mut *tx, &input.category).await?;
    let fields = ServiceFields {
        category_id: category.id,
        title: input.title.clone(),
        description: input.description.clone(),
        min_price: input.min_price,
        max_price: input.max_price,
    };
    let service_id = catalog::insert_service(&mut *tx, provider.id, &fields).await?;
    providers::set_profile_completed(&mut *tx, provider.id, true).await?;

    tx.commit().await.context("Failed to commit service")?;

    log::info!(
        "Provider {} added service '{}' (id {}) in '{}'",
        provider.id,
        input.title,
        service_id,
        category.name
    );
    Ok(service_id)
}

/// Update a service the provider owns. `Ok(false)` when it does not own one with that id.
pub async fn edit_service(
    pool: &SqlitePool,
    provider: &ProviderProfile,
    service_id: i64,
    input: &ServiceInput,
) -> Result<bool> {
    if catalog::get_owned_service(pool, provider.id, service_id)
        .await?
        .is_none()
    {
        return Ok(false);
    }

    let category = get_or_create_category(pool, &input.category).await?;
    let fields = ServiceFields {
        category_id: category.id,
        title: input.title.clone(),
        description: input.description.clone(),
        min_price: input.min_price,
        max_price: input.max_price,
    };
    let updated = catalog::update_service(pool, provider.id, service_id, &fields).await?;
    if updated {
        log::info!("Provider {} updated service {}", provider.id, service_id);
    }
    Ok(updated)
}

/// Delete a service the provider owns
pub async fn delete_service(pool: &SqlitePool, provider: &ProviderProfile, service_id: i64) -> Result<bool> {
    let deleted = catalog::delete_service(pool, provider.id, service_id).await?;
    if deleted {
        log::info!("Provider {} deleted service {}", provider.id, service_id);
    } else {
        log::warn!(
            "Provider {} tried to delete service {} it does not own",
            provider.id,
            service_id
        );
    }
    Ok(deleted)
}

pub async fn get_owned_service(
    pool: &SqlitePool,
    provider: &ProviderProfile,
    service_id: i64,
) -> Result<Option<Service>> {
    catalog::get_owned_service(pool, provider.id, service_id).await
}

pub async fn list_services(pool: &SqlitePool, provider: &ProviderProfile) -> Result<Vec<Service>> {
    catalog::list_services_for_provider(pool, provider.id).await
}

pub async fn list_categories(pool: &SqlitePool) -> Result<Vec<Category>> {
    catalog::list_categories(pool).await
}

/// Public catalog; an unknown category slug yields an empty listing
pub async fn browse(pool: &SqlitePool, category_slug: Option<&str>) -> Result<Vec<CatalogEntry>> {
    match category_slug.map(str::trim).filter(|s| !s.is_empty()) {
        Some(slug) => match catalog::find_category_by_slug(pool, slug).await? {
            Some(category) => catalog::list_catalog(pool, Some(category.id)).await,
            None => Ok(Vec::new()),
        },
        None => catalog::list_catalog(pool, None).await,
    }
}
