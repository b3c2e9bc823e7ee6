use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create every table and index. Safe to run repeatedly.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    // Create entries table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner TEXT,
            compiled TEXT NOT NULL,
            raw TEXT NOT NULL,
            heading TEXT NOT NULL DEFAULT '',
            file_path TEXT NOT NULL,
            file_type TEXT NOT NULL,
            file_source TEXT NOT NULL,
            hashed_value TEXT NOT NULL,
            corpus_id TEXT NOT NULL,
            embedding BLOB NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create entry_dates table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS entry_dates (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            date TEXT NOT NULL,
            entry_id INTEGER NOT NULL,
            FOREIGN KEY (entry_id) REFERENCES entries(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create search_models table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS search_models (
            owner TEXT PRIMARY KEY,
            model TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // One row per content per owner and type; NULL owner is its own owner.
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_entries_owner_hash_type \
         ON entries(COALESCE(owner, ''), hashed_value, file_type)",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_entries_owner_type_file ON entries(owner, file_type, file_path)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_entries_owner_type ON entries(owner, file_type)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_entry_dates_entry_id ON entry_dates(entry_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_entry_dates_date ON entry_dates(date)")
        .execute(pool)
        .await?;

    Ok(())
}
