//! Book and chapter database operations

use bf_common::{time, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::SqlitePool;
use sqlx::Row;
use uuid::Uuid;

use super::{get_timestamp, get_uuid, next_position};
use crate::models::{Book, Chapter};

fn row_to_book(row: &SqliteRow) -> Result<Book> {
    Ok(Book {
        id: get_uuid(row, "id")?,
        owner_id: row.get("owner_id"),
        title: row.get("title"),
        created_at: get_timestamp(row, "created_at")?,
    })
}

fn row_to_chapter(row: &SqliteRow) -> Result<Chapter> {
    Ok(Chapter {
        id: get_uuid(row, "id")?,
        book_id: get_uuid(row, "book_id")?,
        position: row.get("position"),
        title: row.get("title"),
        created_at: get_timestamp(row, "created_at")?,
    })
}

pub async fn create_book(pool: &SqlitePool, owner_id: &str, title: &str) -> Result<Book> {
    let book = Book {
        id: Uuid::new_v4(),
        owner_id: owner_id.to_string(),
        title: title.to_string(),
        created_at: time::now(),
    };

    sqlx::query("INSERT INTO books (id, owner_id, title, created_at) VALUES (?, ?, ?, ?)")
        .bind(book.id.to_string())
        .bind(&book.owner_id)
        .bind(&book.title)
        .bind(time::to_db(&book.created_at))
        .execute(pool)
        .await?;

    Ok(book)
}

/// Books owned by `owner_id`, oldest first
pub async fn list_books_for_owner(pool: &SqlitePool, owner_id: &str) -> Result<Vec<Book>> {
    let rows = sqlx::query(
        "SELECT id, owner_id, title, created_at FROM books WHERE owner_id = ? ORDER BY created_at ASC",
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_book).collect()
}

/// Load a book only if `owner_id` owns it
///
/// A book owned by someone else is indistinguishable from a missing one.
pub async fn find_owned_book(
    pool: &SqlitePool,
    book_id: Uuid,
    owner_id: &str,
) -> Result<Option<Book>> {
    let row = sqlx::query(
        "SELECT id, owner_id, title, created_at FROM books WHERE id = ? AND owner_id = ?",
    )
    .bind(book_id.to_string())
    .bind(owner_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(row_to_book).transpose()
}

/// Add a chapter; `position` defaults to one past the last chapter
pub async fn create_chapter(
    pool: &SqlitePool,
    book_id: Uuid,
    title: &str,
    position: Option<i64>,
) -> Result<Chapter> {
    let position = match position {
        Some(p) => p,
        None => {
            let max: Option<i64> =
                sqlx::query_scalar("SELECT MAX(position) FROM chapters WHERE book_id = ?")
                    .bind(book_id.to_string())
                    .fetch_one(pool)
                    .await?;
            next_position(max, 1)?
        }
    };

    let chapter = Chapter {
        id: Uuid::new_v4(),
        book_id,
        position,
        title: title.to_string(),
        created_at: time::now(),
    };

    sqlx::query(
        "INSERT INTO chapters (id, book_id, position, title, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(chapter.id.to_string())
    .bind(chapter.book_id.to_string())
    .bind(chapter.position)
    .bind(&chapter.title)
    .bind(time::to_db(&chapter.created_at))
    .execute(pool)
    .await?;

    Ok(chapter)
}

pub async fn list_chapters(pool: &SqlitePool, book_id: Uuid) -> Result<Vec<Chapter>> {
    let rows = sqlx::query(
        r#"
        SELECT id, book_id, position, title, created_at
        FROM chapters
        WHERE book_id = ?
        ORDER BY position ASC, created_at ASC
        "#,
    )
    .bind(book_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_chapter).collect()
}

/// Whether `chapter_id` belongs to `book_id`
pub async fn chapter_in_book(pool: &SqlitePool, book_id: Uuid, chapter_id: Uuid) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM chapters WHERE id = ? AND book_id = ?)",
    )
    .bind(chapter_id.to_string())
    .bind(book_id.to_string())
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bf_common::db::init_memory_database;

    #[tokio::test]
    async fn test_find_owned_book_scopes_by_owner() {
        let pool = init_memory_database().await.unwrap();
        let book = create_book(&pool, "alice", "The Salt Road").await.unwrap();

        let found = find_owned_book(&pool, book.id, "alice").await.unwrap();
        assert_eq!(found.map(|b| b.title), Some("The Salt Road".to_string()));

        assert!(find_owned_book(&pool, book.id, "bob").await.unwrap().is_none());
        assert!(find_owned_book(&pool, Uuid::new_v4(), "alice")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_chapter_positions_default_to_next() {
        let pool = init_memory_database().await.unwrap();
        let book = create_book(&pool, "alice", "The Salt Road").await.unwrap();

        let first = create_chapter(&pool, book.id, "Arrival", None).await.unwrap();
        let second = create_chapter(&pool, book.id, "Harbor", None).await.unwrap();
        let inserted = create_chapter(&pool, book.id, "Prologue", Some(0)).await.unwrap();

        assert_eq!(first.position, 1);
        assert_eq!(second.position, 2);
        assert_eq!(inserted.position, 0);

        let titles: Vec<String> = list_chapters(&pool, book.id)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.title)
            .collect();
        assert_eq!(titles, vec!["Prologue", "Arrival", "Harbor"]);
    }

    #[tokio::test]
    async fn test_chapter_in_other_book() {
        let pool = init_memory_database().await.unwrap();
        let book = create_book(&pool, "alice", "One").await.unwrap();
        let other = create_book(&pool, "alice", "Two").await.unwrap();
        let chapter = create_chapter(&pool, book.id, "Arrival", None).await.unwrap();

        assert!(chapter_in_book(&pool, book.id, chapter.id).await.unwrap());
        assert!(!chapter_in_book(&pool, other.id, chapter.id).await.unwrap());
    }
}
