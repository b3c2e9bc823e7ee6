//! `csync model`: choose the embedding model an owner's entries use.
//!
//! The name must match a model the configured provider serves, or later
//! `csync index` runs for that owner fail before touching the index.

use anyhow::Result;

use corpus_sync_core::store::Store;

use crate::config::Config;
use crate::db;
use crate::ingest;
use crate::sqlite_store::SqliteStore;

pub async fn run_set_model(config: &Config, owner: &str, model: &str) -> Result<()> {
    ingest::check_owner(Some(owner))?;
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let previous = store.search_model(Some(owner)).await?;
    store.set_search_model(owner, model).await?;

    match previous {
        Some(prev) if prev != model => println!(
            "Search model for {}: {} → {} (run `csync index --regenerate` to re-embed)",
            owner, prev, model
        ),
        _ => println!("Search model for {}: {}", owner, model),
    }

    pool.close().await;
    Ok(())
}
