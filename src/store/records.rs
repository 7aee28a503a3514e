use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use sqlx::{
    sqlite::{SqlitePool, SqliteRow},
    FromRow, Row,
};
use thiserror::Error;
use tokio::time::sleep;

const APPEND_RETRY_BACKOFF: Duration = Duration::from_millis(200);

#[derive(Debug, Error)]
#[error("journal store unavailable: {0}")]
pub struct StoreError(#[from] sqlx::Error);

/// Record to append: the resolved classification alongside the raw text.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub text: String,
    pub emotion: String,
    pub confidence: f64,
}

#[derive(Debug, Clone)]
pub struct JournalEntry {
    pub id: i64,
    pub text: String,
    pub emotion: String,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct EmotionCount {
    pub emotion: String,
    pub count: i64,
}

/// Seam for the durable journal so the pipeline can be exercised with fakes.
pub trait RecordStore: Send + Sync {
    fn append<'a>(&'a self, entry: &'a NewEntry) -> BoxFuture<'a, Result<(), StoreError>>;
    fn list<'a>(&'a self) -> BoxFuture<'a, Result<Vec<JournalEntry>, StoreError>>;
    fn recent<'a>(&'a self, limit: usize)
        -> BoxFuture<'a, Result<Vec<JournalEntry>, StoreError>>;
    fn distribution<'a>(&'a self) -> BoxFuture<'a, Result<Vec<EmotionCount>, StoreError>>;
}

#[derive(Clone)]
pub struct EntryRepository {
    pool: SqlitePool,
}

impl EntryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Appends one record, retrying once after a short backoff so a
    /// transient store hiccup does not lose the user's text.
    pub async fn append(&self, entry: &NewEntry) -> Result<(), StoreError> {
        match self.insert(entry).await {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::warn!(
                    target: "store",
                    error = %err,
                    "entry append failed; retrying once"
                );
                sleep(APPEND_RETRY_BACKOFF).await;
                self.insert(entry).await.map_err(StoreError::from)
            }
        }
    }

    async fn insert(&self, entry: &NewEntry) -> Result<(), sqlx::Error> {
        sqlx::query(r#"INSERT INTO entries (text, emotion, confidence) VALUES (?1, ?2, ?3)"#)
            .bind(&entry.text)
            .bind(&entry.emotion)
            .bind(entry.confidence)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// All records in insertion order.
    pub async fn list(&self) -> Result<Vec<JournalEntry>, StoreError> {
        let rows = sqlx::query_as::<_, JournalEntry>(
            r#"SELECT id, text, emotion, confidence, created_at FROM entries ORDER BY id ASC"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// The `limit` newest records, oldest first.
    pub async fn recent(&self, limit: usize) -> Result<Vec<JournalEntry>, StoreError> {
        let mut rows = sqlx::query_as::<_, JournalEntry>(
            r#"SELECT id, text, emotion, confidence, created_at FROM entries
                ORDER BY id DESC LIMIT ?1"#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.reverse();
        Ok(rows)
    }

    pub async fn distribution(&self) -> Result<Vec<EmotionCount>, StoreError> {
        let rows = sqlx::query_as::<_, EmotionCount>(
            r#"SELECT emotion, COUNT(*) AS count FROM entries
                GROUP BY emotion ORDER BY count DESC, emotion ASC"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

impl RecordStore for EntryRepository {
    fn append<'a>(&'a self, entry: &'a NewEntry) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(self.append(entry))
    }

    fn list<'a>(&'a self) -> BoxFuture<'a, Result<Vec<JournalEntry>, StoreError>> {
        Box::pin(self.list())
    }

    fn recent<'a>(
        &'a self,
        limit: usize,
    ) -> BoxFuture<'a, Result<Vec<JournalEntry>, StoreError>> {
        Box::pin(self.recent(limit))
    }

    fn distribution<'a>(&'a self) -> BoxFuture<'a, Result<Vec<EmotionCount>, StoreError>> {
        Box::pin(self.distribution())
    }
}

impl<'r> FromRow<'r, SqliteRow> for JournalEntry {
    fn from_row(row: &'r SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            text: row.try_get("text")?,
            emotion: row.try_get("emotion")?,
            confidence: row.try_get("confidence")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl<'r> FromRow<'r, SqliteRow> for EmotionCount {
    fn from_row(row: &'r SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(Self {
            emotion: row.try_get("emotion")?,
            count: row.try_get("count")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::init_pool;

    async fn repository(dir: &tempfile::TempDir) -> EntryRepository {
        let pool = init_pool(&dir.path().join("test.db")).await.unwrap();
        EntryRepository::new(pool)
    }

    fn entry(text: &str, emotion: &str, confidence: f64) -> NewEntry {
        NewEntry {
            text: text.to_string(),
            emotion: emotion.to_string(),
            confidence,
        }
    }

    #[tokio::test]
    async fn append_then_list_round_trips_in_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repository(&dir).await;

        repo.append(&entry("first", "happy", 0.8)).await.unwrap();
        repo.append(&entry("second", "sad", 0.6)).await.unwrap();

        let rows = repo.list().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].text, "first");
        let last = rows.last().unwrap();
        assert_eq!(last.text, "second");
        assert_eq!(last.emotion, "sad");
        assert_eq!(last.confidence, 0.6);
    }

    #[tokio::test]
    async fn duplicates_are_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repository(&dir).await;

        repo.append(&entry("same", "happy", 0.5)).await.unwrap();
        repo.append(&entry("same", "happy", 0.5)).await.unwrap();

        assert_eq!(repo.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn recent_returns_newest_entries_oldest_first() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repository(&dir).await;

        for i in 0..5 {
            repo.append(&entry(&format!("entry {i}"), "neutral", 0.1))
                .await
                .unwrap();
        }

        let rows = repo.recent(2).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].text, "entry 3");
        assert_eq!(rows[1].text, "entry 4");
    }

    #[tokio::test]
    async fn distribution_counts_per_emotion() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repository(&dir).await;

        repo.append(&entry("a", "happy", 0.9)).await.unwrap();
        repo.append(&entry("b", "happy", 0.8)).await.unwrap();
        repo.append(&entry("c", "sad", 0.7)).await.unwrap();

        let counts = repo.distribution().await.unwrap();
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].emotion, "happy");
        assert_eq!(counts[0].count, 2);
        assert_eq!(counts[1].emotion, "sad");
        assert_eq!(counts[1].count, 1);
    }
}
