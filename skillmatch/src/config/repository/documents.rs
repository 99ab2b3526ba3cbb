//! Repository for company documents uploaded during onboarding

use anyhow::{Context, Result};
use sqlx::{Row, SqliteExecutor, SqlitePool};

use crate::models::CompanyDocument;

pub async fn insert_document<'e, E>(
    executor: E,
    provider_id: i64,
    document_name: &str,
    file_path: &str,
) -> Result<i64>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        "INSERT INTO company_documents (provider_id, document_name, file_path) VALUES (?, ?, ?)",
    )
    .bind(provider_id)
    .bind(document_name)
    .bind(file_path)
    .execute(executor)
    .await
    .context("Failed to insert company document")?;

    Ok(result.last_insert_rowid())
}

pub async fn list_documents(pool: &SqlitePool, provider_id: i64) -> Result<Vec<CompanyDocument>> {
    let rows = sqlx::query(
        r#"
        SELECT id, provider_id, document_name, file_path, uploaded_at
        FROM company_documents
        WHERE provider_id = ?
        ORDER BY id
        "#,
    )
    .bind(provider_id)
    .fetch_all(pool)
    .await
    .context("Failed to list company documents")?;

    let mut documents = Vec::new();
    for row in rows {
        documents.push(CompanyDocument {
            id: row.try_get("id")?,
            provider_id: row.try_get("provider_id")?,
            document_name: row.try_get("document_name")?,
            file_path: row.try_get("file_path")?,
            uploaded_at: row.try_get("uploaded_at")?,
        });
    }

    Ok(documents)
}
