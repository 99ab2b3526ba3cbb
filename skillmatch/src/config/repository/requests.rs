//! Repository for service requests

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDateTime;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::models::{RequestStatus, RequestSummary, ServiceRequest};

/// Fields of a request as it is first saved
#[derive(Debug, Clone)]
pub struct NewRequest<'a> {
    pub user_id: i64,
    pub service_type: &'a str,
    pub description: &'a str,
    pub location: &'a str,
    pub status: RequestStatus,
    pub matched_provider_id: Option<i64>,
    pub date_requested: NaiveDateTime,
}

const SUMMARY_SELECT: &str = r#"
    SELECT r.id, r.user_id, r.service_type, r.description, r.location, r.status,
           r.date_requested, r.matched_provider_id,
           u.username, p.company_name AS matched_company
    FROM service_requests r
    JOIN users u ON u.id = r.user_id
    LEFT JOIN providers p ON p.id = r.matched_provider_id
"#;

fn request_from_row(row: &SqliteRow) -> Result<ServiceRequest> {
    let status: String = row.try_get("status")?;
    Ok(ServiceRequest {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        service_type: row.try_get("service_type")?,
        description: row.try_get("description")?,
        location: row.try_get("location")?,
        status: RequestStatus::from_db(&status)
            .ok_or_else(|| anyhow!("Unknown request status in database: {}", status))?,
        date_requested: row.try_get("date_requested")?,
        matched_provider_id: row.try_get("matched_provider_id")?,
    })
}

fn summary_from_row(row: &SqliteRow) -> Result<RequestSummary> {
    Ok(RequestSummary {
        request: request_from_row(row)?,
        username: row.try_get("username")?,
        matched_company: row.try_get("matched_company")?,
    })
}

pub async fn insert_request(pool: &SqlitePool, request: &NewRequest<'_>) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO service_requests (
            user_id, service_type, description, location, status,
            date_requested, matched_provider_id
        )
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(request.user_id)
    .bind(request.service_type)
    .bind(request.description)
    .bind(request.location)
    .bind(request.status.as_db())
    .bind(request.date_requested)
    .bind(request.matched_provider_id)
    .execute(pool)
    .await
    .context("Failed to insert service request")?;

    Ok(result.last_insert_rowid())
}

pub async fn get_request(pool: &SqlitePool, id: i64) -> Result<Option<ServiceRequest>> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, service_type, description, location, status,
               date_requested, matched_provider_id
        FROM service_requests
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get service request")?;

    row.as_ref().map(request_from_row).transpose()
}

/// Pending requests, optionally restricted to the given ids
pub async fn list_pending(pool: &SqlitePool, ids: Option<&[i64]>) -> Result<Vec<ServiceRequest>> {
    let rows = sqlx::query(
        r#"
        SELECT id, user_id, service_type, description, location, status,
               date_requested, matched_provider_id
        FROM service_requests
        WHERE status = 'pending'
        ORDER BY date_requested, id
        "#,
    )
    .fetch_all(pool)
    .await
    .context("Failed to list pending requests")?;

    let mut pending = Vec::new();
    for row in &rows {
        let request = request_from_row(row)?;
        if ids.is_none_or(|ids| ids.contains(&request.id)) {
            pending.push(request);
        }
    }

    Ok(pending)
}

/// Record a match on a request that is still pending
pub async fn assign_match(pool: &SqlitePool, request_id: i64, provider_id: i64) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE service_requests
        SET matched_provider_id = ?, status = 'matched'
        WHERE id = ? AND status = 'pending'
        "#,
    )
    .bind(provider_id)
    .bind(request_id)
    .execute(pool)
    .await
    .context("Failed to assign match")?;

    Ok(result.rows_affected() > 0)
}

pub async fn set_status(pool: &SqlitePool, request_id: i64, status: RequestStatus) -> Result<bool> {
    let result = sqlx::query("UPDATE service_requests SET status = ? WHERE id = ?")
        .bind(status.as_db())
        .bind(request_id)
        .execute(pool)
        .await
        .context("Failed to update request status")?;

    Ok(result.rows_affected() > 0)
}

/// Requests made by one account, newest first
pub async fn list_requests_for_user(pool: &SqlitePool, user_id: i64) -> Result<Vec<RequestSummary>> {
    let rows = sqlx::query(&format!(
        "{} WHERE r.user_id = ? ORDER BY r.date_requested DESC, r.id DESC",
        SUMMARY_SELECT
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("Failed to list user requests")?;

    rows.iter().map(summary_from_row).collect()
}

/// Requests matched to one provider, newest first
pub async fn list_requests_for_provider(
    pool: &SqlitePool,
    provider_id: i64,
) -> Result<Vec<RequestSummary>> {
    let rows = sqlx::query(&format!(
        "{} WHERE r.matched_provider_id = ? ORDER BY r.date_requested DESC, r.id DESC",
        SUMMARY_SELECT
    ))
    .bind(provider_id)
    .fetch_all(pool)
    .await
    .context("Failed to list provider requests")?;

    rows.iter().map(summary_from_row).collect()
}

/// All requests, optionally filtered by status
pub async fn list_all_requests(
    pool: &SqlitePool,
    status: Option<RequestStatus>,
) -> Result<Vec<RequestSummary>> {
    let rows = sqlx::query(&format!(
        "{} WHERE (?1 IS NULL OR r.status = ?1) ORDER BY r.date_requested DESC, r.id DESC",
        SUMMARY_SELECT
    ))
    .bind(status.map(|s| s.as_db()))
    .fetch_all(pool)
    .await
    .context("Failed to list requests")?;

    rows.iter().map(summary_from_row).collect()
}
