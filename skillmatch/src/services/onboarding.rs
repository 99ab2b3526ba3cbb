//! Multi-step provider onboarding and admin moderation of profiles

use anyhow::{Context, Result, anyhow, bail};
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::{SqliteConnection, SqlitePool};
use std::path::{Path, PathBuf};

use crate::config::repository::{documents, providers, users};
use crate::forms::DocumentUpload;
use crate::models::{NewProviderProfile, ProviderProfile, User};

/// Number of document slots offered on the company details step
pub const DOCUMENT_SLOTS: usize = 3;

static UNSAFE_FILE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("valid file name regex"));

/// Reduce an uploaded file name to a safe basename
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned = UNSAFE_FILE_CHARS.replace_all(base, "_");
    let cleaned = cleaned.trim_matches(|c| c == '.' || c == '_');
    if cleaned.is_empty() {
        "document".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Relative location of a stored document under the media root
fn document_path(provider_id: i64, slot: usize, file_name: &str) -> PathBuf {
    Path::new("documents")
        .join(provider_id.to_string())
        .join(format!("{}_{}", slot, sanitize_file_name(file_name)))
}

/// Onboarding step 2: create the company profile for a provider account and
/// store its documents. The profile starts unverified and incomplete; adding
/// the first service completes it.
pub async fn complete_company_details(
    pool: &SqlitePool,
    media_dir: &Path,
    user: &User,
    profile: &NewProviderProfile,
    uploads: &[DocumentUpload],
) -> Result<ProviderProfile> {
    if !user.is_provider() {
        bail!("Account '{}' is not a provider account", user.username);
    }
    if providers::get_provider_by_user(pool, user.id).await?.is_some() {
        bail!("Account '{}' already has a company profile", user.username);
    }

    let mut tx = pool.begin().await.context("Failed to start transaction")?;
    let provider_id = providers::insert_provider(&mut *tx, user.id, profile).await?;

    let mut written = Vec::new();
    let stored = store_documents(&mut *tx, media_dir, provider_id, uploads, &mut written).await;
    let committed = match stored {
        Ok(()) => tx.commit().await.context("Failed to commit company profile"),
        Err(e) => Err(e),
    };
    if let Err(e) = committed {
        remove_documents(&written).await;
        return Err(e);
    }

    log::info!(
        "Created company profile '{}' (id {}) for '{}' with {} document(s)",
        profile.company_name,
        provider_id,
        user.username,
        written.len()
    );

    providers::get_provider(pool, provider_id)
        .await?
        .ok_or_else(|| anyhow!("Provider {} vanished after insert", provider_id))
}

/// Write each filled slot under the media root and record it. Paths are pushed
/// to `written` as soon as the file exists so the caller can undo them.
async fn store_documents(
    conn: &mut SqliteConnection,
    media_dir: &Path,
    provider_id: i64,
    uploads: &[DocumentUpload],
    written: &mut Vec<PathBuf>,
) -> Result<()> {
    for (slot, upload) in uploads.iter().enumerate().take(DOCUMENT_SLOTS) {
        if !upload.has_file() {
            continue;
        }

        let relative = document_path(provider_id, slot, &upload.file_name);
        let absolute = media_dir.join(&relative);
        if let Some(parent) = absolute.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        tokio::fs::write(&absolute, &upload.content)
            .await
            .with_context(|| format!("Failed to write document {}", absolute.display()))?;
        written.push(absolute);

        let relative = relative.to_string_lossy().replace('\\', "/");
        documents::insert_document(&mut *conn, provider_id, upload.display_name(), &relative).await?;
    }
    Ok(())
}

async fn remove_documents(paths: &[PathBuf]) {
    for path in paths {
        if let Err(e) = tokio::fs::remove_file(path).await {
            log::warn!("Failed to remove orphaned document {}: {}", path.display(), e);
        }
    }
}

/// Resolve a provider profile through its owner's username
pub async fn provider_for_username(pool: &SqlitePool, username: &str) -> Result<ProviderProfile> {
    let user = users::get_user_by_username(pool, username)
        .await?
        .ok_or_else(|| anyhow!("No account named '{}'", username))?;
    providers::get_provider_by_user(pool, user.id)
        .await?
        .ok_or_else(|| anyhow!("Account '{}' has no company profile", username))
}

/// Admin: grant or revoke verification
pub async fn verify_provider(pool: &SqlitePool, username: &str, verified: bool) -> Result<ProviderProfile> {
    let provider = provider_for_username(pool, username).await?;
    providers::set_verified(pool, provider.id, verified).await?;
    log::info!(
        "Provider '{}' verification set to {}",
        provider.company_name,
        verified
    );
    Ok(ProviderProfile { verified, ..provider })
}

/// Admin: set the rating score (unconstrained, but must be a finite number)
pub async fn set_rating(pool: &SqlitePool, username: &str, rating: f64) -> Result<ProviderProfile> {
    if !rating.is_finite() {
        bail!("Rating must be a finite number");
    }
    let provider = provider_for_username(pool, username).await?;
    providers::set_rating(pool, provider.id, rating).await?;
    log::info!("Provider '{}' rating set to {}", provider.company_name, rating);
    Ok(ProviderProfile { rating, ..provider })
}
