//! Incremental embedding update engine.
//!
//! [`EntryIndexer::update_embeddings`] takes the freshly parsed entries of
//! one owner and file type and brings the persisted index in line with
//! them, embedding only content that is not already stored.
//!
//! # Stages
//!
//! 1. Resolve the owner's embedding model (fails before any mutation).
//! 2. Fingerprint current entries and group the fingerprints by file.
//! 3. On `regenerate`, delete every stored entry of the file type.
//! 4. Per file, collect fingerprints not yet stored for owner + type.
//! 5. Embed those in batches of `min(batch_size, n)`, persist each batch,
//!    and index the dates found in each new entry's raw text.
//! 6. Per file, delete stored hashes that were not seen this run.
//! 7. Delete every entry of explicitly requested files.
//!
//! There is no rollback: a failure mid-way leaves earlier batches
//! stored. Re-running with the same input is safe, since stored content
//! is detected and skipped.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tracing::{debug, info};

use crate::dates::DateExtractor;
use crate::embedding::ModelRegistry;
use crate::error::IndexError;
use crate::hash::HashStrategy;
use crate::models::{DateIndexRecord, Entry, FileSource, FileType, IndexStats, NewEntry};
use crate::store::Store;

/// Upper bound on entries embedded and inserted per batch.
pub const DEFAULT_BATCH_SIZE: usize = 200;

/// Storage limit on persisted headings, in characters.
pub const DEFAULT_HEADING_LIMIT: usize = 1000;

#[derive(Debug, Clone, Copy)]
pub struct IndexOptions {
    pub strategy: HashStrategy,
    pub batch_size: usize,
    pub heading_limit: usize,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            strategy: HashStrategy::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            heading_limit: DEFAULT_HEADING_LIMIT,
        }
    }
}

/// Which partition of the index an invocation touches.
#[derive(Debug, Clone, Copy)]
pub struct IndexScope<'a> {
    pub owner: Option<&'a str>,
    pub file_type: FileType,
    pub file_source: FileSource,
}

/// Reconciles parsed entries with the persisted index.
///
/// Invocations for the same owner and file type must not run
/// concurrently; different owners or types never touch the same rows.
pub struct EntryIndexer {
    store: Arc<dyn Store>,
    models: Arc<ModelRegistry>,
    dates: Arc<dyn DateExtractor>,
    options: IndexOptions,
}

impl EntryIndexer {
    pub fn new(
        store: Arc<dyn Store>,
        models: Arc<ModelRegistry>,
        dates: Arc<dyn DateExtractor>,
        options: IndexOptions,
    ) -> Self {
        Self {
            store,
            models,
            dates,
            options,
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn options(&self) -> &IndexOptions {
        &self.options
    }

    /// Sync the persisted index for `scope` with `current_entries`.
    ///
    /// Returns how many entries were added and deleted. Files named in
    /// `deletion_filenames` lose all their entries and are not also
    /// diffed, so each removed row is counted once.
    ///
    /// # Errors
    ///
    /// - [`IndexError::UnknownModel`] if the owner's model is not registered.
    /// - [`IndexError::EmbeddingCountMismatch`] if the model returns a
    ///   different number of vectors than texts it was given.
    /// - Any store or embedding provider failure.
    pub async fn update_embeddings(
        &self,
        current_entries: &[Entry],
        scope: &IndexScope<'_>,
        deletion_filenames: Option<&HashSet<String>>,
        regenerate: bool,
    ) -> Result<IndexStats> {
        let owner = scope.owner;
        let file_type = scope.file_type;
        let strategy = &self.options.strategy;

        let configured = self.store.search_model(owner).await?;
        let model = self.models.resolve(configured.as_deref())?;

        let started = Instant::now();
        let current_hashes = strategy.fingerprint_all(current_entries);
        let mut hash_to_entry: HashMap<&str, &Entry> = HashMap::new();
        let mut hashes_by_file: BTreeMap<&str, HashSet<&str>> = BTreeMap::new();
        for (entry, hash) in current_entries.iter().zip(&current_hashes) {
            hash_to_entry.entry(hash.as_str()).or_insert(entry);
            hashes_by_file
                .entry(entry.file.as_str())
                .or_default()
                .insert(hash.as_str());
        }
        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            entries = current_entries.len(),
            files = hashes_by_file.len(),
            "constructed current entry hashes"
        );

        let mut stats = IndexStats::default();

        if regenerate {
            let stage = Instant::now();
            stats.deleted += self.store.delete_entries_by_type(owner, file_type).await?;
            debug!(
                elapsed_ms = stage.elapsed().as_millis() as u64,
                deleted = stats.deleted,
                file_type = %file_type,
                "cleared existing entries for regeneration"
            );
        }

        let stage = Instant::now();
        let mut unseen: HashSet<&str> = HashSet::new();
        for file_hashes in hashes_by_file.values() {
            let wanted: Vec<String> = file_hashes.iter().map(|h| h.to_string()).collect();
            let existing = self
                .store
                .existing_hashes(owner, &wanted, file_type)
                .await?;
            unseen.extend(file_hashes.iter().filter(|h| !existing.contains(**h)));
        }
        // First-occurrence order keeps batches deterministic.
        let mut hashes_to_process: Vec<&str> = Vec::with_capacity(unseen.len());
        for hash in &current_hashes {
            if unseen.remove(hash.as_str()) {
                hashes_to_process.push(hash.as_str());
            }
        }
        debug!(
            elapsed_ms = stage.elapsed().as_millis() as u64,
            new = hashes_to_process.len(),
            "identified entries to add"
        );

        let stage = Instant::now();
        let mut dates_indexed = 0usize;
        if !hashes_to_process.is_empty() {
            let batch_size = self.options.batch_size.max(1).min(hashes_to_process.len());
            for batch in hashes_to_process.chunks(batch_size) {
                let texts: Vec<String> = batch
                    .iter()
                    .map(|h| hash_to_entry[h].compiled.clone())
                    .collect();
                let vectors = model.embed_documents(&texts).await?;
                if vectors.len() != batch.len() {
                    return Err(IndexError::EmbeddingCountMismatch {
                        expected: batch.len(),
                        actual: vectors.len(),
                    }
                    .into());
                }

                let rows: Vec<NewEntry> = batch
                    .iter()
                    .zip(vectors)
                    .map(|(hash, embedding)| {
                        let entry = hash_to_entry[hash];
                        NewEntry {
                            owner: owner.map(String::from),
                            compiled: entry.compiled.clone(),
                            raw: entry.raw.clone(),
                            heading: entry.heading.chars().take(self.options.heading_limit).collect(),
                            file_path: entry.file.clone(),
                            file_type,
                            file_source: scope.file_source,
                            hashed_value: hash.to_string(),
                            corpus_id: entry.corpus_id,
                            embedding,
                        }
                    })
                    .collect();
                let inserted = self.store.insert_entries(rows).await?;
                stats.added += inserted.len();

                let date_rows: Vec<DateIndexRecord> = inserted
                    .iter()
                    .flat_map(|e| {
                        self.dates
                            .extract_dates(&e.raw)
                            .into_iter()
                            .filter(|d| !d.trim().is_empty())
                            .map(move |date| DateIndexRecord {
                                date,
                                entry_id: e.id,
                            })
                    })
                    .collect();
                if !date_rows.is_empty() {
                    dates_indexed += self.store.insert_dates(&date_rows).await?;
                }
            }
        }
        debug!(
            elapsed_ms = stage.elapsed().as_millis() as u64,
            added = stats.added,
            dates = dates_indexed,
            model = model.model_name(),
            "embedded and stored new entries"
        );

        let stage = Instant::now();
        let requested = |file: &str| deletion_filenames.is_some_and(|d| d.contains(file));
        for (file, seen) in &hashes_by_file {
            if requested(*file) {
                continue;
            }
            let stale: Vec<String> = self
                .store
                .entry_hashes_by_file(owner, file, file_type)
                .await?
                .into_iter()
                .filter(|h| !seen.contains(h.as_str()))
                .collect();
            if !stale.is_empty() {
                stats.deleted += self
                    .store
                    .delete_entries_by_hashes(owner, &stale, file_type)
                    .await?;
            }
        }
        debug!(
            elapsed_ms = stage.elapsed().as_millis() as u64,
            "deleted entries no longer in their files"
        );

        if let Some(files) = deletion_filenames {
            let stage = Instant::now();
            let mut files: Vec<&String> = files.iter().collect();
            files.sort();
            for file in files {
                stats.deleted += self
                    .store
                    .delete_entries_by_file(owner, file, file_type)
                    .await?;
            }
            debug!(
                elapsed_ms = stage.elapsed().as_millis() as u64,
                "deleted entries of requested files"
            );
        }

        info!(
            file_type = %file_type,
            owner = owner.unwrap_or("-"),
            added = stats.added,
            deleted = stats.deleted,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "updated entry embeddings"
        );
        Ok(stats)
    }
}
