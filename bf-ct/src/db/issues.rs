//! Consistency issue database operations
//!
//! `resolution` is a nullable JSON object column holding the latest
//! [`Resolution`].

use bf_common::{time, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite, SqlitePool};
use uuid::Uuid;

use super::{corrupt, get_optional_uuid, get_timestamp, get_uuid};
use crate::analysis::ContinuityCounts;
use crate::models::{ConsistencyIssue, IssueSeverity, IssueStatus, IssueType, Resolution};

const ISSUE_COLUMNS: &str = "id, book_id, chapter_id, issue_type, severity, title, description, \
     excerpt, suggestion, status, resolution, detected_at";

fn row_to_issue(row: &SqliteRow) -> Result<ConsistencyIssue> {
    let issue_type: String = row.get("issue_type");
    let severity: String = row.get("severity");
    let status: String = row.get("status");
    let resolution: Option<String> = row.get("resolution");

    let resolution = resolution
        .map(|json| serde_json::from_str::<Resolution>(&json))
        .transpose()
        .map_err(|e| corrupt("resolution", &e.to_string()))?;

    Ok(ConsistencyIssue {
        id: get_uuid(row, "id")?,
        book_id: get_uuid(row, "book_id")?,
        chapter_id: get_optional_uuid(row, "chapter_id")?,
        issue_type: IssueType::parse(&issue_type)
            .ok_or_else(|| corrupt("issue_type", &issue_type))?,
        severity: IssueSeverity::parse(&severity).ok_or_else(|| corrupt("severity", &severity))?,
        title: row.get("title"),
        description: row.get("description"),
        excerpt: row.get("excerpt"),
        suggestion: row.get("suggestion"),
        status: IssueStatus::parse(&status).ok_or_else(|| corrupt("status", &status))?,
        resolution,
        detected_at: get_timestamp(row, "detected_at")?,
    })
}

fn resolution_json(issue: &ConsistencyIssue) -> Result<Option<String>> {
    issue
        .resolution
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| bf_common::Error::Internal(format!("Failed to serialize resolution: {}", e)))
}

pub async fn insert_issue<'e, E>(executor: E, issue: &ConsistencyIssue) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let resolution = resolution_json(issue)?;

    sqlx::query(&format!(
        "INSERT INTO consistency_issues ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        ISSUE_COLUMNS
    ))
    .bind(issue.id.to_string())
    .bind(issue.book_id.to_string())
    .bind(issue.chapter_id.map(|id| id.to_string()))
    .bind(issue.issue_type.as_str())
    .bind(issue.severity.as_str())
    .bind(&issue.title)
    .bind(&issue.description)
    .bind(&issue.excerpt)
    .bind(&issue.suggestion)
    .bind(issue.status.as_str())
    .bind(resolution)
    .bind(time::to_db(&issue.detected_at))
    .execute(executor)
    .await?;

    Ok(())
}

/// Insert several issues in one transaction; either all are stored or none
pub async fn insert_issues(pool: &SqlitePool, issues: &[ConsistencyIssue]) -> Result<()> {
    let mut tx = pool.begin().await?;
    for issue in issues {
        insert_issue(&mut *tx, issue).await?;
    }
    tx.commit().await?;

    Ok(())
}

/// Issues for a book, most actionable first
///
/// Order: status (open, resolved, acknowledged, dismissed), then severity
/// (critical before warning), then newest first.
pub async fn list_issues(pool: &SqlitePool, book_id: Uuid) -> Result<Vec<ConsistencyIssue>> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {}
        FROM consistency_issues
        WHERE book_id = ?
        ORDER BY
            CASE status
                WHEN 'open' THEN 0
                WHEN 'resolved' THEN 1
                WHEN 'acknowledged' THEN 2
                ELSE 3
            END ASC,
            CASE severity WHEN 'critical' THEN 0 ELSE 1 END ASC,
            detected_at DESC
        "#,
        ISSUE_COLUMNS
    ))
    .bind(book_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_issue).collect()
}

pub async fn get_issue(
    pool: &SqlitePool,
    book_id: Uuid,
    issue_id: Uuid,
) -> Result<Option<ConsistencyIssue>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM consistency_issues WHERE id = ? AND book_id = ?",
        ISSUE_COLUMNS
    ))
    .bind(issue_id.to_string())
    .bind(book_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(row_to_issue).transpose()
}

/// Persist the status and resolution record of an issue
pub async fn save_resolution(pool: &SqlitePool, issue: &ConsistencyIssue) -> Result<()> {
    let resolution = resolution_json(issue)?;

    sqlx::query(
        "UPDATE consistency_issues SET status = ?, resolution = ? WHERE id = ? AND book_id = ?",
    )
    .bind(issue.status.as_str())
    .bind(resolution)
    .bind(issue.id.to_string())
    .bind(issue.book_id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

/// All counts the analysis endpoint needs, in one pass per table
pub async fn continuity_counts(pool: &SqlitePool, book_id: Uuid) -> Result<ContinuityCounts> {
    let row = sqlx::query(
        r#"
        SELECT
            COUNT(*) AS total,
            COALESCE(SUM(CASE WHEN status = 'open' THEN 1 ELSE 0 END), 0) AS open,
            COALESCE(SUM(CASE WHEN status = 'open' AND severity = 'critical' THEN 1 ELSE 0 END), 0)
                AS open_critical
        FROM consistency_issues
        WHERE book_id = ?
        "#,
    )
    .bind(book_id.to_string())
    .fetch_one(pool)
    .await?;

    Ok(ContinuityCounts {
        facts: super::facts::count_facts(pool, book_id).await?,
        events: super::events::count_events(pool, book_id).await?,
        issues: row.get("total"),
        open_issues: row.get("open"),
        open_critical: row.get("open_critical"),
    })
}
