//! SQLite-backed [`Store`] implementation.
//!
//! Maps each [`Store`] operation onto the `entries`, `entry_dates`, and
//! `search_models` tables created by [`crate::migrate`]. Owner filters use
//! `owner IS ?` so the anonymous (NULL) owner matches only itself.

use std::collections::HashSet;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use corpus_sync_core::embedding::{blob_to_vec, vec_to_blob};
use corpus_sync_core::models::{DateIndexRecord, FileType, NewEntry, PersistedEntry};
use corpus_sync_core::store::Store;

/// Hashes bound per `IN (...)` statement, well under SQLite's variable limit.
const HASHES_PER_STATEMENT: usize = 500;

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn row_to_entry(row: &SqliteRow) -> Result<PersistedEntry> {
    let file_type: String = row.try_get("file_type")?;
    let file_source: String = row.try_get("file_source")?;
    let corpus_id: String = row.try_get("corpus_id")?;
    let embedding: Vec<u8> = row.try_get("embedding")?;
    let created_at: i64 = row.try_get("created_at")?;

    Ok(PersistedEntry {
        id: row.try_get("id")?,
        owner: row.try_get("owner")?,
        compiled: row.try_get("compiled")?,
        raw: row.try_get("raw")?,
        heading: row.try_get("heading")?,
        file_path: row.try_get("file_path")?,
        file_type: file_type.parse()?,
        file_source: file_source.parse()?,
        hashed_value: row.try_get("hashed_value")?,
        corpus_id: Uuid::parse_str(&corpus_id)
            .with_context(|| format!("Invalid corpus_id in entries: {}", corpus_id))?,
        embedding: blob_to_vec(&embedding),
        created_at: DateTime::from_timestamp(created_at, 0).unwrap_or_default(),
    })
}

#[async_trait]
impl Store for SqliteStore {
    async fn existing_hashes(
        &self,
        owner: Option<&str>,
        hashes: &[String],
        file_type: FileType,
    ) -> Result<HashSet<String>> {
        let mut found = HashSet::new();
        for chunk in hashes.chunks(HASHES_PER_STATEMENT) {
            let sql = format!(
                "SELECT hashed_value FROM entries \
                 WHERE owner IS ? AND file_type = ? AND hashed_value IN ({})",
                placeholders(chunk.len())
            );
            let mut query = sqlx::query_scalar::<_, String>(&sql)
                .bind(owner)
                .bind(file_type.as_str());
            for hash in chunk {
                query = query.bind(hash);
            }
            found.extend(query.fetch_all(&self.pool).await?);
        }
        Ok(found)
    }

    async fn insert_entries(&self, entries: Vec<NewEntry>) -> Result<Vec<PersistedEntry>> {
        let now = Utc::now().timestamp();
        let created_at = DateTime::from_timestamp(now, 0).unwrap_or_default();
        let mut tx = self.pool.begin().await?;
        let mut inserted = Vec::with_capacity(entries.len());

        for entry in entries {
            let id = sqlx::query(
                r#"
                INSERT INTO entries (owner, compiled, raw, heading, file_path, file_type,
                                     file_source, hashed_value, corpus_id, embedding, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&entry.owner)
            .bind(&entry.compiled)
            .bind(&entry.raw)
            .bind(&entry.heading)
            .bind(&entry.file_path)
            .bind(entry.file_type.as_str())
            .bind(entry.file_source.as_str())
            .bind(&entry.hashed_value)
            .bind(entry.corpus_id.to_string())
            .bind(vec_to_blob(&entry.embedding))
            .bind(now)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to insert entry from {}", entry.file_path))?
            .last_insert_rowid();

            inserted.push(PersistedEntry::from_new(id, entry, created_at));
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn insert_dates(&self, dates: &[DateIndexRecord]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        for record in dates {
            sqlx::query("INSERT INTO entry_dates (date, entry_id) VALUES (?, ?)")
                .bind(&record.date)
                .bind(record.entry_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(dates.len())
    }

    async fn delete_entries_by_hashes(
        &self,
        owner: Option<&str>,
        hashes: &[String],
        file_type: FileType,
    ) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        let mut removed = 0u64;
        for chunk in hashes.chunks(HASHES_PER_STATEMENT) {
            let sql = format!(
                "DELETE FROM entries WHERE owner IS ? AND file_type = ? AND hashed_value IN ({})",
                placeholders(chunk.len())
            );
            let mut query = sqlx::query(&sql).bind(owner).bind(file_type.as_str());
            for hash in chunk {
                query = query.bind(hash);
            }
            removed += query.execute(&mut *tx).await?.rows_affected();
        }
        tx.commit().await?;
        Ok(removed as usize)
    }

    async fn delete_entries_by_type(
        &self,
        owner: Option<&str>,
        file_type: FileType,
    ) -> Result<usize> {
        let result = sqlx::query("DELETE FROM entries WHERE owner IS ? AND file_type = ?")
            .bind(owner)
            .bind(file_type.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() as usize)
    }

    async fn delete_entries_by_file(
        &self,
        owner: Option<&str>,
        file_path: &str,
        file_type: FileType,
    ) -> Result<usize> {
        let result = sqlx::query(
            "DELETE FROM entries WHERE owner IS ? AND file_type = ? AND file_path = ?",
        )
        .bind(owner)
        .bind(file_type.as_str())
        .bind(file_path)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() as usize)
    }

    async fn entry_hashes_by_file(
        &self,
        owner: Option<&str>,
        file_path: &str,
        file_type: FileType,
    ) -> Result<Vec<String>> {
        let hashes = sqlx::query_scalar(
            "SELECT hashed_value FROM entries \
             WHERE owner IS ? AND file_type = ? AND file_path = ? ORDER BY id",
        )
        .bind(owner)
        .bind(file_type.as_str())
        .bind(file_path)
        .fetch_all(&self.pool)
        .await?;
        Ok(hashes)
    }

    async fn file_paths_by_type(
        &self,
        owner: Option<&str>,
        file_type: FileType,
    ) -> Result<Vec<String>> {
        let paths = sqlx::query_scalar(
            "SELECT DISTINCT file_path FROM entries \
             WHERE owner IS ? AND file_type = ? ORDER BY file_path",
        )
        .bind(owner)
        .bind(file_type.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(paths)
    }

    async fn entries_by_type(
        &self,
        owner: Option<&str>,
        file_type: FileType,
    ) -> Result<Vec<PersistedEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, owner, compiled, raw, heading, file_path, file_type, file_source,
                   hashed_value, corpus_id, embedding, created_at
            FROM entries
            WHERE owner IS ? AND file_type = ?
            ORDER BY id
            "#,
        )
        .bind(owner)
        .bind(file_type.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_entry).collect()
    }

    async fn dates_for_entry(&self, entry_id: i64) -> Result<Vec<String>> {
        let dates = sqlx::query_scalar("SELECT date FROM entry_dates WHERE entry_id = ? ORDER BY id")
            .bind(entry_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(dates)
    }

    async fn search_model(&self, owner: Option<&str>) -> Result<Option<String>> {
        let Some(owner) = owner else {
            return Ok(None);
        };
        let model = sqlx::query_scalar("SELECT model FROM search_models WHERE owner = ?")
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?;
        Ok(model)
    }

    async fn set_search_model(&self, owner: &str, model: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO search_models (owner, model, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(owner) DO UPDATE SET
                model = excluded.model,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(owner)
        .bind(model)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
