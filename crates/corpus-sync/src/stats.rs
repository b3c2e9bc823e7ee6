//! Index statistics.
//!
//! A quick summary of what's indexed: entry and date counts per file
//! type, plus the owner's embedding model. Used by `csync stats`.

use anyhow::Result;
use sqlx::{Row, SqlitePool};

use crate::config::Config;
use crate::db;

/// Per-type entry and date counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeStats {
    pub file_type: String,
    pub entries: i64,
    pub files: i64,
    pub dates: i64,
}

/// Counts for one owner, grouped by file type.
pub async fn collect_stats(pool: &SqlitePool, owner: Option<&str>) -> Result<Vec<TypeStats>> {
    let rows = sqlx::query(
        r#"
        SELECT
            e.file_type,
            COUNT(DISTINCT e.id) AS entry_count,
            COUNT(DISTINCT e.file_path) AS file_count,
            COUNT(d.id) AS date_count
        FROM entries e
        LEFT JOIN entry_dates d ON d.entry_id = e.id
        WHERE e.owner IS ?
        GROUP BY e.file_type
        ORDER BY e.file_type
        "#,
    )
    .bind(owner)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| TypeStats {
            file_type: row.get("file_type"),
            entries: row.get("entry_count"),
            files: row.get("file_count"),
            dates: row.get("date_count"),
        })
        .collect())
}

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config, owner: Option<&str>) -> Result<()> {
    let pool = db::connect(config).await?;
    let by_type = collect_stats(&pool, owner).await?;

    let model: Option<String> = match owner {
        Some(owner) => {
            sqlx::query_scalar("SELECT model FROM search_models WHERE owner = ?")
                .bind(owner)
                .fetch_optional(&pool)
                .await?
        }
        None => None,
    };

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);
    let total_entries: i64 = by_type.iter().map(|s| s.entries).sum();
    let total_dates: i64 = by_type.iter().map(|s| s.dates).sum();

    println!("corpus-sync Index Stats");
    println!("=========================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!("  Owner:       {}", owner.unwrap_or("(anonymous)"));
    let model = model
        .or_else(|| config.embedding.model.clone())
        .unwrap_or_else(|| config.embedding.provider.clone());
    println!("  Model:       {}", model);
    println!();
    println!("  Entries:     {}", total_entries);
    println!("  Dates:       {}", total_dates);

    if !by_type.is_empty() {
        println!();
        println!("  By type:");
        println!(
            "  {:<12} {:>8} {:>8} {:>8}",
            "TYPE", "ENTRIES", "FILES", "DATES"
        );
        println!("  {}", "-".repeat(40));
        for s in &by_type {
            println!(
                "  {:<12} {:>8} {:>8} {:>8}",
                s.file_type, s.entries, s.files, s.dates
            );
        }
    }

    println!();

    pool.close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
