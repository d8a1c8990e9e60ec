//! Story fact database operations
//!
//! `history` is a JSON array of [`FactRevision`] in a TEXT column.

use bf_common::{time, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{corrupt, get_optional_uuid, get_timestamp, get_uuid};
use crate::checker::{ContextFact, MAX_CONTEXT_FACTS};
use crate::models::{FactConfidence, FactImportance, FactRevision, FactSource, StoryFact};

const FACT_COLUMNS: &str = "id, book_id, category, subject, attribute, value, current_value, \
     established_in, confidence, importance, source, history, created_at, updated_at";

/// Optional equality filters for [`list_facts`]
#[derive(Debug, Clone, Default)]
pub struct FactFilter {
    pub category: Option<String>,
    pub subject: Option<String>,
    pub attribute: Option<String>,
}

fn row_to_fact(row: &SqliteRow) -> Result<StoryFact> {
    let confidence: String = row.get("confidence");
    let importance: String = row.get("importance");
    let source: String = row.get("source");
    let history: String = row.get("history");

    let history: Vec<FactRevision> =
        serde_json::from_str(&history).map_err(|e| corrupt("history", &e.to_string()))?;

    Ok(StoryFact {
        id: get_uuid(row, "id")?,
        book_id: get_uuid(row, "book_id")?,
        category: row.get("category"),
        subject: row.get("subject"),
        attribute: row.get("attribute"),
        value: row.get("value"),
        current_value: row.get("current_value"),
        established_in: get_optional_uuid(row, "established_in")?,
        confidence: FactConfidence::parse(&confidence)
            .ok_or_else(|| corrupt("confidence", &confidence))?,
        importance: FactImportance::parse(&importance)
            .ok_or_else(|| corrupt("importance", &importance))?,
        source: FactSource::parse(&source).ok_or_else(|| corrupt("source", &source))?,
        history,
        created_at: get_timestamp(row, "created_at")?,
        updated_at: get_timestamp(row, "updated_at")?,
    })
}

fn history_json(fact: &StoryFact) -> Result<String> {
    serde_json::to_string(&fact.history).map_err(|e| {
        bf_common::Error::Internal(format!("Failed to serialize fact history: {}", e))
    })
}

pub async fn insert_fact(pool: &SqlitePool, fact: &StoryFact) -> Result<()> {
    let history = history_json(fact)?;

    sqlx::query(&format!(
        "INSERT INTO story_facts ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        FACT_COLUMNS
    ))
    .bind(fact.id.to_string())
    .bind(fact.book_id.to_string())
    .bind(&fact.category)
    .bind(&fact.subject)
    .bind(&fact.attribute)
    .bind(&fact.value)
    .bind(&fact.current_value)
    .bind(fact.established_in.map(|id| id.to_string()))
    .bind(fact.confidence.as_str())
    .bind(fact.importance.as_str())
    .bind(fact.source.as_str())
    .bind(&history)
    .bind(time::to_db(&fact.created_at))
    .bind(time::to_db(&fact.updated_at))
    .execute(pool)
    .await?;

    Ok(())
}

/// Facts for a book in creation order
pub async fn list_facts(
    pool: &SqlitePool,
    book_id: Uuid,
    filter: &FactFilter,
) -> Result<Vec<StoryFact>> {
    let mut sql = format!("SELECT {} FROM story_facts WHERE book_id = ?", FACT_COLUMNS);
    let mut binds: Vec<&str> = Vec::new();

    for (column, value) in [
        ("category", &filter.category),
        ("subject", &filter.subject),
        ("attribute", &filter.attribute),
    ] {
        if let Some(value) = value {
            sql.push_str(&format!(" AND {} = ?", column));
            binds.push(value);
        }
    }
    sql.push_str(" ORDER BY created_at ASC");

    let book_id = book_id.to_string();
    let mut query = sqlx::query(&sql).bind(&book_id);
    for value in binds {
        query = query.bind(value);
    }

    let rows = query.fetch_all(pool).await?;
    rows.iter().map(row_to_fact).collect()
}

pub async fn get_fact(pool: &SqlitePool, book_id: Uuid, fact_id: Uuid) -> Result<Option<StoryFact>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM story_facts WHERE id = ? AND book_id = ?",
        FACT_COLUMNS
    ))
    .bind(fact_id.to_string())
    .bind(book_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(row_to_fact).transpose()
}

/// Write back the mutable columns of a fact
pub async fn update_fact(pool: &SqlitePool, fact: &StoryFact) -> Result<()> {
    let history = history_json(fact)?;

    sqlx::query(
        r#"
        UPDATE story_facts
        SET current_value = ?, confidence = ?, importance = ?, history = ?, updated_at = ?
        WHERE id = ? AND book_id = ?
        "#,
    )
    .bind(&fact.current_value)
    .bind(fact.confidence.as_str())
    .bind(fact.importance.as_str())
    .bind(&history)
    .bind(time::to_db(&fact.updated_at))
    .bind(fact.id.to_string())
    .bind(fact.book_id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

/// Returns `false` when no such fact exists in the book
pub async fn delete_fact(pool: &SqlitePool, book_id: Uuid, fact_id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM story_facts WHERE id = ? AND book_id = ?")
        .bind(fact_id.to_string())
        .bind(book_id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Facts to check new text against, most important first
pub async fn list_context_facts(pool: &SqlitePool, book_id: Uuid) -> Result<Vec<ContextFact>> {
    let rows = sqlx::query(
        r#"
        SELECT f.subject, f.attribute, f.current_value, c.title AS chapter_title
        FROM story_facts f
        LEFT JOIN chapters c ON c.id = f.established_in
        WHERE f.book_id = ?
        ORDER BY
            CASE f.importance
                WHEN 'critical' THEN 0
                WHEN 'significant' THEN 1
                ELSE 2
            END ASC,
            f.created_at ASC
        LIMIT ?
        "#,
    )
    .bind(book_id.to_string())
    .bind(MAX_CONTEXT_FACTS)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| ContextFact {
            subject: row.get("subject"),
            attribute: row.get("attribute"),
            current_value: row.get("current_value"),
            chapter_title: row.get("chapter_title"),
        })
        .collect())
}

pub async fn count_facts(pool: &SqlitePool, book_id: Uuid) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM story_facts WHERE book_id = ?")
        .bind(book_id.to_string())
        .fetch_one(pool)
        .await?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::books::{create_book, create_chapter};
    use crate::models::NewFact;
    use bf_common::db::init_memory_database;
    use chrono::{Duration, Utc};

    fn new_fact(subject: &str, importance: FactImportance) -> NewFact {
        NewFact {
            category: "character".to_string(),
            subject: subject.to_string(),
            attribute: "eye color".to_string(),
            value: "green".to_string(),
            current_value: None,
            established_in: None,
            confidence: FactConfidence::default(),
            importance,
            source: FactSource::default(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_roundtrip_history() {
        let pool = init_memory_database().await.unwrap();
        let book = create_book(&pool, "alice", "Book").await.unwrap();
        let mut fact =
            StoryFact::create(book.id, new_fact("Mara", FactImportance::Minor), Utc::now());
        insert_fact(&pool, &fact).await.unwrap();

        fact.revise("grey", None, Utc::now());
        update_fact(&pool, &fact).await.unwrap();

        let loaded = get_fact(&pool, book.id, fact.id).await.unwrap().unwrap();
        assert_eq!(loaded.current_value, "grey");
        assert_eq!(loaded.value, "green");
        assert_eq!(loaded.history.len(), 1);
        assert_eq!(loaded.history[0].value, "green");
        assert_eq!(loaded.importance, FactImportance::Minor);
    }

    #[tokio::test]
    async fn test_get_fact_scoped_by_book() {
        let pool = init_memory_database().await.unwrap();
        let book = create_book(&pool, "alice", "Book").await.unwrap();
        let other = create_book(&pool, "alice", "Other").await.unwrap();
        let fact =
            StoryFact::create(book.id, new_fact("Mara", FactImportance::Minor), Utc::now());
        insert_fact(&pool, &fact).await.unwrap();

        assert!(get_fact(&pool, other.id, fact.id).await.unwrap().is_none());
        assert!(!delete_fact(&pool, other.id, fact.id).await.unwrap());
        assert!(delete_fact(&pool, book.id, fact.id).await.unwrap());
        assert_eq!(count_facts(&pool, book.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_facts_filters() {
        let pool = init_memory_database().await.unwrap();
        let book = create_book(&pool, "alice", "Book").await.unwrap();
        for subject in ["Mara", "Tomas", "Mara"] {
            let fact = StoryFact::create(
                book.id,
                new_fact(subject, FactImportance::Significant),
                Utc::now(),
            );
            insert_fact(&pool, &fact).await.unwrap();
        }

        let filter = FactFilter {
            subject: Some("Mara".to_string()),
            ..Default::default()
        };
        assert_eq!(list_facts(&pool, book.id, &filter).await.unwrap().len(), 2);
        assert_eq!(
            list_facts(&pool, book.id, &FactFilter::default())
                .await
                .unwrap()
                .len(),
            3
        );
    }

    #[tokio::test]
    async fn test_context_facts_ordered_by_importance_then_age() {
        let pool = init_memory_database().await.unwrap();
        let book = create_book(&pool, "alice", "Book").await.unwrap();
        let chapter = create_chapter(&pool, book.id, "Arrival", None).await.unwrap();
        let start = Utc::now();

        let specs = [
            ("minor-old", FactImportance::Minor, 0),
            ("significant", FactImportance::Significant, 1),
            ("critical-new", FactImportance::Critical, 3),
            ("critical-old", FactImportance::Critical, 2),
        ];
        for (subject, importance, offset) in specs {
            let mut new = new_fact(subject, importance);
            if subject == "significant" {
                new.established_in = Some(chapter.id);
            }
            let fact = StoryFact::create(book.id, new, start + Duration::seconds(offset));
            insert_fact(&pool, &fact).await.unwrap();
        }

        let context = list_context_facts(&pool, book.id).await.unwrap();
        let subjects: Vec<&str> = context.iter().map(|f| f.subject.as_str()).collect();
        assert_eq!(
            subjects,
            vec!["critical-old", "critical-new", "significant", "minor-old"]
        );
        assert_eq!(context[2].chapter_title.as_deref(), Some("Arrival"));
        assert_eq!(context[3].chapter_title, None);
    }

    #[tokio::test]
    async fn test_context_facts_capped() {
        let pool = init_memory_database().await.unwrap();
        let book = create_book(&pool, "alice", "Book").await.unwrap();
        for i in 0..(MAX_CONTEXT_FACTS + 5) {
            let fact = StoryFact::create(
                book.id,
                new_fact(&format!("subject-{}", i), FactImportance::Minor),
                Utc::now(),
            );
            insert_fact(&pool, &fact).await.unwrap();
        }

        let context = list_context_facts(&pool, book.id).await.unwrap();
        assert_eq!(context.len() as i64, MAX_CONTEXT_FACTS);
    }
}
