//! In-memory [`Store`] implementation for tests and embedding the engine
//! without a database.
//!
//! Uses `Vec` and `HashMap` behind `std::sync::RwLock` for thread safety.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::Utc;

use crate::models::{DateIndexRecord, FileType, NewEntry, PersistedEntry};

use super::Store;

/// In-memory store for tests.
pub struct InMemoryStore {
    entries: RwLock<Vec<PersistedEntry>>,
    dates: RwLock<Vec<DateIndexRecord>>,
    search_models: RwLock<HashMap<String, String>>,
    next_id: RwLock<i64>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            dates: RwLock::new(Vec::new()),
            search_models: RwLock::new(HashMap::new()),
            next_id: RwLock::new(1),
        }
    }

    /// Total rows across all owners and types.
    pub fn len(&self) -> Result<usize> {
        Ok(read(&self.entries)?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Total date index rows.
    pub fn date_count(&self) -> Result<usize> {
        Ok(read(&self.dates)?.len())
    }

    /// Remove rows matching `pred` along with their date rows.
    fn remove_where(&self, pred: impl Fn(&PersistedEntry) -> bool) -> Result<usize> {
        let mut entries = write(&self.entries)?;
        let removed: HashSet<i64> = entries.iter().filter(|e| pred(e)).map(|e| e.id).collect();
        entries.retain(|e| !removed.contains(&e.id));
        write(&self.dates)?.retain(|d| !removed.contains(&d.entry_id));
        Ok(removed.len())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| anyhow!("in-memory store lock poisoned"))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| anyhow!("in-memory store lock poisoned"))
}

#[async_trait]
impl Store for InMemoryStore {
    async fn existing_hashes(
        &self,
        owner: Option<&str>,
        hashes: &[String],
        file_type: FileType,
    ) -> Result<HashSet<String>> {
        let wanted: HashSet<&str> = hashes.iter().map(String::as_str).collect();
        Ok(read(&self.entries)?
            .iter()
            .filter(|e| {
                e.owner.as_deref() == owner
                    && e.file_type == file_type
                    && wanted.contains(e.hashed_value.as_str())
            })
            .map(|e| e.hashed_value.clone())
            .collect())
    }

    async fn insert_entries(&self, new_entries: Vec<NewEntry>) -> Result<Vec<PersistedEntry>> {
        let mut entries = write(&self.entries)?;
        let mut next_id = write(&self.next_id)?;
        let mut seen: HashSet<(Option<String>, String, FileType)> = entries
            .iter()
            .map(|e| (e.owner.clone(), e.hashed_value.clone(), e.file_type))
            .collect();

        let now = Utc::now();
        let mut inserted = Vec::with_capacity(new_entries.len());
        for new in new_entries {
            let key = (new.owner.clone(), new.hashed_value.clone(), new.file_type);
            if !seen.insert(key) {
                bail!(
                    "entry {} already stored for this owner and file type {}",
                    new.hashed_value,
                    new.file_type
                );
            }
            let row = PersistedEntry::from_new(*next_id, new, now);
            *next_id += 1;
            inserted.push(row);
        }
        entries.extend(inserted.iter().cloned());
        Ok(inserted)
    }

    async fn insert_dates(&self, dates: &[DateIndexRecord]) -> Result<usize> {
        let known: HashSet<i64> = read(&self.entries)?.iter().map(|e| e.id).collect();
        if let Some(orphan) = dates.iter().find(|d| !known.contains(&d.entry_id)) {
            bail!("date row references unknown entry {}", orphan.entry_id);
        }
        write(&self.dates)?.extend(dates.iter().cloned());
        Ok(dates.len())
    }

    async fn delete_entries_by_hashes(
        &self,
        owner: Option<&str>,
        hashes: &[String],
        file_type: FileType,
    ) -> Result<usize> {
        if hashes.is_empty() {
            return Ok(0);
        }
        let targets: HashSet<&str> = hashes.iter().map(String::as_str).collect();
        self.remove_where(|e| {
            e.owner.as_deref() == owner
                && e.file_type == file_type
                && targets.contains(e.hashed_value.as_str())
        })
    }

    async fn delete_entries_by_type(
        &self,
        owner: Option<&str>,
        file_type: FileType,
    ) -> Result<usize> {
        self.remove_where(|e| e.owner.as_deref() == owner && e.file_type == file_type)
    }

    async fn delete_entries_by_file(
        &self,
        owner: Option<&str>,
        file_path: &str,
        file_type: FileType,
    ) -> Result<usize> {
        self.remove_where(|e| {
            e.owner.as_deref() == owner && e.file_type == file_type && e.file_path == file_path
        })
    }

    async fn entry_hashes_by_file(
        &self,
        owner: Option<&str>,
        file_path: &str,
        file_type: FileType,
    ) -> Result<Vec<String>> {
        Ok(read(&self.entries)?
            .iter()
            .filter(|e| {
                e.owner.as_deref() == owner && e.file_type == file_type && e.file_path == file_path
            })
            .map(|e| e.hashed_value.clone())
            .collect())
    }

    async fn file_paths_by_type(
        &self,
        owner: Option<&str>,
        file_type: FileType,
    ) -> Result<Vec<String>> {
        let paths: BTreeSet<String> = read(&self.entries)?
            .iter()
            .filter(|e| e.owner.as_deref() == owner && e.file_type == file_type)
            .map(|e| e.file_path.clone())
            .collect();
        Ok(paths.into_iter().collect())
    }

    async fn entries_by_type(
        &self,
        owner: Option<&str>,
        file_type: FileType,
    ) -> Result<Vec<PersistedEntry>> {
        let mut rows: Vec<PersistedEntry> = read(&self.entries)?
            .iter()
            .filter(|e| e.owner.as_deref() == owner && e.file_type == file_type)
            .cloned()
            .collect();
        rows.sort_by_key(|e| e.id);
        Ok(rows)
    }

    async fn dates_for_entry(&self, entry_id: i64) -> Result<Vec<String>> {
        Ok(read(&self.dates)?
            .iter()
            .filter(|d| d.entry_id == entry_id)
            .map(|d| d.date.clone())
            .collect())
    }

    async fn search_model(&self, owner: Option<&str>) -> Result<Option<String>> {
        let Some(owner) = owner else {
            return Ok(None);
        };
        Ok(read(&self.search_models)?.get(owner).cloned())
    }

    async fn set_search_model(&self, owner: &str, model: &str) -> Result<()> {
        write(&self.search_models)?.insert(owner.to_string(), model.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FileSource;
    use uuid::Uuid;

    fn new_entry(owner: Option<&str>, hash: &str, file: &str, file_type: FileType) -> NewEntry {
        NewEntry {
            owner: owner.map(String::from),
            compiled: format!("compiled {}", hash),
            raw: format!("raw {}", hash),
            heading: "h".to_string(),
            file_path: file.to_string(),
            file_type,
            file_source: FileSource::Computer,
            hashed_value: hash.to_string(),
            corpus_id: Uuid::new_v4(),
            embedding: vec![0.5, 0.5],
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_ids_and_rejects_duplicates() {
        let store = InMemoryStore::new();
        let rows = store
            .insert_entries(vec![
                new_entry(Some("ann"), "h1", "a.md", FileType::Markdown),
                new_entry(Some("ann"), "h2", "a.md", FileType::Markdown),
            ])
            .await
            .unwrap();
        assert_eq!(rows[0].id + 1, rows[1].id);

        // Same hash, different type or owner is fine.
        store
            .insert_entries(vec![
                new_entry(Some("ann"), "h1", "a.org", FileType::Org),
                new_entry(None, "h1", "a.md", FileType::Markdown),
            ])
            .await
            .unwrap();

        let dup = store
            .insert_entries(vec![new_entry(Some("ann"), "h1", "b.md", FileType::Markdown)])
            .await;
        assert!(dup.is_err());
        assert_eq!(store.len().unwrap(), 4);
    }

    #[tokio::test]
    async fn test_deletes_are_owner_scoped_and_cascade_dates() {
        let store = InMemoryStore::new();
        let rows = store
            .insert_entries(vec![
                new_entry(Some("ann"), "h1", "a.md", FileType::Markdown),
                new_entry(Some("bob"), "h1", "a.md", FileType::Markdown),
            ])
            .await
            .unwrap();
        store
            .insert_dates(&[
                DateIndexRecord {
                    date: "2024-01-01".to_string(),
                    entry_id: rows[0].id,
                },
                DateIndexRecord {
                    date: "2024-01-02".to_string(),
                    entry_id: rows[1].id,
                },
            ])
            .await
            .unwrap();

        let removed = store
            .delete_entries_by_file(Some("ann"), "a.md", FileType::Markdown)
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.date_count().unwrap(), 1);
        assert_eq!(
            store
                .entry_hashes_by_file(Some("bob"), "a.md", FileType::Markdown)
                .await
                .unwrap(),
            vec!["h1".to_string()]
        );
    }

    #[tokio::test]
    async fn test_file_deletes_are_type_scoped() {
        let store = InMemoryStore::new();
        store
            .insert_entries(vec![
                new_entry(Some("ann"), "h1", "notes", FileType::Markdown),
                new_entry(Some("ann"), "h2", "notes", FileType::Plaintext),
                new_entry(Some("ann"), "h3", "other", FileType::Plaintext),
            ])
            .await
            .unwrap();

        let hashes = vec!["h1".to_string(), "h2".to_string()];
        let removed = store
            .delete_entries_by_hashes(Some("ann"), &hashes, FileType::Plaintext)
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(
            store
                .file_paths_by_type(Some("ann"), FileType::Plaintext)
                .await
                .unwrap(),
            vec!["other".to_string()]
        );

        store
            .delete_entries_by_file(Some("ann"), "notes", FileType::Plaintext)
            .await
            .unwrap();
        assert_eq!(
            store
                .entry_hashes_by_file(Some("ann"), "notes", FileType::Markdown)
                .await
                .unwrap(),
            vec!["h1".to_string()]
        );
    }

    #[tokio::test]
    async fn test_anonymous_owner_is_separate() {
        let store = InMemoryStore::new();
        store
            .insert_entries(vec![new_entry(None, "h1", "a.md", FileType::Markdown)])
            .await
            .unwrap();
        let hashes = vec!["h1".to_string()];
        assert!(store
            .existing_hashes(Some("ann"), &hashes, FileType::Markdown)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            store
                .existing_hashes(None, &hashes, FileType::Markdown)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_orphan_dates_rejected() {
        let store = InMemoryStore::new();
        let result = store
            .insert_dates(&[DateIndexRecord {
                date: "2024-01-01".to_string(),
                entry_id: 42,
            }])
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_search_model_roundtrip() {
        let store = InMemoryStore::new();
        assert_eq!(store.search_model(Some("ann")).await.unwrap(), None);
        store.set_search_model("ann", "bge-small").await.unwrap();
        assert_eq!(
            store.search_model(Some("ann")).await.unwrap().as_deref(),
            Some("bge-small")
        );
        assert_eq!(store.search_model(None).await.unwrap(), None);
    }
}
