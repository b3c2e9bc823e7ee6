//! Export indexed entries as JSONL.
//!
//! One JSON object per entry (`compiled`, `raw`, `heading`, `file`,
//! `corpus_id`) in insertion order. Embedding vectors are not exported.

use anyhow::Result;
use std::path::Path;

use corpus_sync_core::jsonl::convert_entries_to_jsonl;
use corpus_sync_core::models::Entry;
use corpus_sync_core::store::Store;
use corpus_sync_core::FileType;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

/// JSONL for the owner's entries of `file_type`.
pub async fn export_jsonl(store: &dyn Store, owner: Option<&str>, file_type: FileType) -> Result<(String, usize)> {
    let entries: Vec<Entry> = store
        .entries_by_type(owner, file_type)
        .await?
        .iter()
        .map(|e| e.to_entry())
        .collect();
    Ok((convert_entries_to_jsonl(&entries)?, entries.len()))
}

/// Export entries as JSONL.
///
/// If `output` is `Some`, writes to that file path. Otherwise writes
/// to stdout for piping.
pub async fn run_export(
    config: &Config,
    file_type: FileType,
    owner: Option<&str>,
    output: Option<&Path>,
) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let (jsonl, count) = export_jsonl(&store, owner, file_type).await?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &jsonl)?;
            eprintln!("Exported {} {} entries to {}", count, file_type, path.display());
        }
        None => {
            print!("{}", jsonl);
        }
    }

    pool.close().await;
    Ok(())
}
