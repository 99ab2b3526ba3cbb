//! Service requests: creation with automatic matching, bulk matching, completion

use anyhow::{Result, anyhow};
use chrono::Utc;
use sqlx::SqlitePool;

use crate::config::repository::requests::{self, NewRequest};
use crate::forms::RequestInput;
use crate::models::{RequestStatus, RequestSummary, ServiceRequest, User};
use crate::services::matching::{self, MatchCriteria, MatchReport};

/// Outcome of marking a request completed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Completed,
    /// Only matched requests can be completed
    NotMatched(RequestStatus),
    NotFound,
}

/// Save a new request. The matching lookup runs once, at creation; with a
/// result the request is stored as `matched`, otherwise it stays `pending`.
pub async fn create_request(pool: &SqlitePool, user: &User, input: &RequestInput) -> Result<ServiceRequest> {
    let criteria = MatchCriteria::new(input.service_type.clone(), input.location.clone());
    let best = matching::find_best_provider(pool, &criteria).await?;

    let (status, matched_provider_id) = match &best {
        Some(provider) => (RequestStatus::Matched, Some(provider.id)),
        None => (RequestStatus::Pending, None),
    };

    let id = requests::insert_request(
        pool,
        &NewRequest {
            user_id: user.id,
            service_type: &input.service_type,
            description: &input.description,
            location: &input.location,
            status,
            matched_provider_id,
            date_requested: Utc::now().naive_utc(),
        },
    )
    .await?;

    match &best {
        Some(provider) => log::info!(
            "Request {} from '{}' matched to '{}'",
            id,
            user.username,
            provider.company_name
        ),
        None => log::info!("Request {} from '{}' left pending", id, user.username),
    }

    requests::get_request(pool, id)
        .await?
        .ok_or_else(|| anyhow!("Request {} vanished after insert", id))
}

/// Run matching over pending requests (all of them, or only `ids`).
/// Requests that still find no provider stay pending.
pub async fn run_matching(pool: &SqlitePool, ids: Option<&[i64]>) -> Result<MatchReport> {
    let pending = requests::list_pending(pool, ids).await?;
    let mut report = MatchReport {
        considered: pending.len(),
        ..Default::default()
    };

    for request in &pending {
        let criteria = MatchCriteria::from(request);
        if let Some(provider) = matching::find_best_provider(pool, &criteria).await? {
            if requests::assign_match(pool, request.id, provider.id).await? {
                report.matched.push((request.id, provider.id));
            }
        }
    }

    log::info!(
        "Matching run: {} of {} pending requests matched",
        report.matched_count(),
        report.considered
    );
    Ok(report)
}

/// Mark a matched request as completed. Only the requester may do this.
pub async fn complete_request(pool: &SqlitePool, user: &User, request_id: i64) -> Result<Completion> {
    let Some(request) = requests::get_request(pool, request_id).await? else {
        return Ok(Completion::NotFound);
    };
    if request.user_id != user.id {
        return Ok(Completion::NotFound);
    }
    if request.status != RequestStatus::Matched {
        return Ok(Completion::NotMatched(request.status));
    }

    requests::set_status(pool, request_id, RequestStatus::Completed).await?;
    log::info!("Request {} completed by '{}'", request_id, user.username);
    Ok(Completion::Completed)
}

pub async fn list_for_user(pool: &SqlitePool, user: &User) -> Result<Vec<RequestSummary>> {
    requests::list_requests_for_user(pool, user.id).await
}

pub async fn list_for_provider(pool: &SqlitePool, provider_id: i64) -> Result<Vec<RequestSummary>> {
    requests::list_requests_for_provider(pool, provider_id).await
}

pub async fn list_all(pool: &SqlitePool, status: Option<RequestStatus>) -> Result<Vec<RequestSummary>> {
    requests::list_all_requests(pool, status).await
}
