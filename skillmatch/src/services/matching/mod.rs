// Matching service: pairs a service request with the best verified provider
//
// Selection is a filter-and-sort: verified providers whose category and
// location contain the request's text (case-insensitive), highest rating first.

pub mod core;
pub mod models;

// Re-export commonly used types
pub use models::{MatchCriteria, MatchInfo, MatchReport, Rejection};

use crate::config::repository::providers;
use crate::models::ProviderProfile;
use anyhow::Result;
use sqlx::SqlitePool;

/// Find the best verified provider for the criteria.
/// Candidates are loaded in id order so rating ties resolve to the oldest profile.
pub async fn find_best_provider(
    pool: &SqlitePool,
    criteria: &MatchCriteria,
) -> Result<Option<ProviderProfile>> {
    let candidates = providers::list_verified_providers(pool).await?;

    match core::best_match(&candidates, criteria) {
        Some(info) => {
            log::debug!(
                "Matched '{}' in '{}' to provider {} ({} qualifying)",
                criteria.service_type,
                criteria.location,
                info.provider.id,
                info.qualifying
            );
            Ok(Some(info.provider.clone()))
        }
        None => {
            log::debug!(
                "No provider for '{}' in '{}' among {} verified",
                criteria.service_type,
                criteria.location,
                candidates.len()
            );
            Ok(None)
        }
    }
}

/// Every registered provider with its verdict for the criteria, in listing order.
/// `Ok(())` marks a provider that would be considered.
pub async fn explain(
    pool: &SqlitePool,
    criteria: &MatchCriteria,
) -> Result<Vec<(ProviderProfile, Result<(), Rejection>)>> {
    let candidates = providers::list_providers(pool).await?;
    Ok(candidates
        .into_iter()
        .map(|provider| {
            let verdict = core::check(&provider, criteria);
            (provider, verdict)
        })
        .collect())
}
