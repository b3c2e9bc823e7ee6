//! Storage abstraction for the entry index.
//!
//! The [`Store`] trait is the persistence contract the indexer depends
//! on, enabling pluggable backends (SQLite in the app crate, in-memory
//! for tests). Every operation is scoped to one owner; `None` is the
//! anonymous owner and never matches a named one.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{DateIndexRecord, FileType, NewEntry, PersistedEntry};

/// Abstract storage backend for persisted entries.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`existing_hashes`](Store::existing_hashes) | Which of these hashes are stored for owner + type |
/// | [`insert_entries`](Store::insert_entries) | Bulk insert new rows |
/// | [`insert_dates`](Store::insert_dates) | Bulk insert date index rows |
/// | [`delete_entries_by_hashes`](Store::delete_entries_by_hashes) | Bulk delete by owner + type + hashes |
/// | [`delete_entries_by_type`](Store::delete_entries_by_type) | Wipe one file type for an owner |
/// | [`delete_entries_by_file`](Store::delete_entries_by_file) | Delete every row of one file and type |
/// | [`entry_hashes_by_file`](Store::entry_hashes_by_file) | Hashes on record for one file and type |
/// | [`file_paths_by_type`](Store::file_paths_by_type) | Distinct files on record for one type |
/// | [`entries_by_type`](Store::entries_by_type) | All rows of one file type |
/// | [`dates_for_entry`](Store::dates_for_entry) | Date index rows of one entry |
/// | [`search_model`](Store::search_model) | Owner's configured embedding model |
///
/// Deleting an entry also deletes its date index rows.
#[async_trait]
pub trait Store: Send + Sync {
    /// Subset of `hashes` already stored for `owner` and `file_type`.
    async fn existing_hashes(
        &self,
        owner: Option<&str>,
        hashes: &[String],
        file_type: FileType,
    ) -> Result<HashSet<String>>;

    /// Insert rows and return them with their assigned ids, in input
    /// order. Fails if a row collides with an existing
    /// `(owner, hashed_value, file_type)`.
    async fn insert_entries(&self, entries: Vec<NewEntry>) -> Result<Vec<PersistedEntry>>;

    /// Insert date index rows, returning how many were written.
    async fn insert_dates(&self, dates: &[DateIndexRecord]) -> Result<usize>;

    /// Delete the owner's rows of `file_type` whose hash is in `hashes`.
    /// Returns rows removed.
    async fn delete_entries_by_hashes(
        &self,
        owner: Option<&str>,
        hashes: &[String],
        file_type: FileType,
    ) -> Result<usize>;

    /// Delete all of the owner's rows of `file_type`. Returns rows removed.
    async fn delete_entries_by_type(&self, owner: Option<&str>, file_type: FileType)
        -> Result<usize>;

    /// Delete all of the owner's `file_type` rows from `file_path`.
    /// Returns rows removed.
    async fn delete_entries_by_file(
        &self,
        owner: Option<&str>,
        file_path: &str,
        file_type: FileType,
    ) -> Result<usize>;

    /// Hashes currently on record for the owner's `file_path` of `file_type`.
    async fn entry_hashes_by_file(
        &self,
        owner: Option<&str>,
        file_path: &str,
        file_type: FileType,
    ) -> Result<Vec<String>>;

    /// Distinct file paths the owner has rows for under `file_type`, sorted.
    async fn file_paths_by_type(
        &self,
        owner: Option<&str>,
        file_type: FileType,
    ) -> Result<Vec<String>>;

    /// The owner's rows of `file_type`, ordered by id.
    async fn entries_by_type(
        &self,
        owner: Option<&str>,
        file_type: FileType,
    ) -> Result<Vec<PersistedEntry>>;

    /// Dates indexed for one entry, in insertion order.
    async fn dates_for_entry(&self, entry_id: i64) -> Result<Vec<String>>;

    /// The embedding model configured for `owner`, if any.
    async fn search_model(&self, owner: Option<&str>) -> Result<Option<String>>;

    /// Configure the embedding model for `owner`.
    async fn set_search_model(&self, owner: &str, model: &str) -> Result<()>;
}
