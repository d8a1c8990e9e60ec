//! Scan status database operations

use bf_common::{time, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::ScanStatus;

/// Current scan status; [`ScanStatus::default`] if the book was never scanned
pub async fn get_scan_status(pool: &SqlitePool, book_id: Uuid) -> Result<ScanStatus> {
    let row = sqlx::query("SELECT phase, progress FROM scan_status WHERE book_id = ?")
        .bind(book_id.to_string())
        .fetch_optional(pool)
        .await?;

    Ok(match row {
        Some(row) => ScanStatus::new(row.get::<String, _>("phase"), row.get::<i64, _>("progress")),
        None => ScanStatus::default(),
    })
}

/// Overwrite the book's scan status
pub async fn set_scan_status(pool: &SqlitePool, book_id: Uuid, status: &ScanStatus) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO scan_status (book_id, phase, progress, updated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(book_id) DO UPDATE SET
            phase = excluded.phase,
            progress = excluded.progress,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(book_id.to_string())
    .bind(&status.phase)
    .bind(status.progress)
    .bind(time::to_db(&time::now()))
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::books::create_book;
    use bf_common::db::init_memory_database;

    #[tokio::test]
    async fn test_scan_status_default_then_overwrite() {
        let pool = init_memory_database().await.unwrap();
        let book = create_book(&pool, "alice", "Book").await.unwrap();

        assert_eq!(get_scan_status(&pool, book.id).await.unwrap(), ScanStatus::default());

        set_scan_status(&pool, book.id, &ScanStatus::new("Extracting facts", 40))
            .await
            .unwrap();
        set_scan_status(&pool, book.id, &ScanStatus::new("Checking", 90))
            .await
            .unwrap();

        let status = get_scan_status(&pool, book.id).await.unwrap();
        assert_eq!(status, ScanStatus::new("Checking", 90));

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM scan_status")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }
}
