//! # corpus-sync
//!
//! **Incremental indexing of personal notes into an embedded entry store.**
//!
//! corpus-sync parses Markdown, Org, and plain-text files into entries,
//! fingerprints them, and keeps a SQLite index in step with the files:
//! only new content is sent to the embedding model, content that vanished
//! from a file is deleted, and dates mentioned in each entry are indexed.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────┐
//! │ [sources.*] │──▶│  Processor   │──▶│ EntryIndexer │──▶│  SQLite  │
//! │  walkdir    │   │ parse+chunk  │   │ diff + embed │   │ entries  │
//! └─────────────┘   └──────────────┘   └──────┬───────┘   │ dates    │
//!                                             │           └──────────┘
//!                                             ▼
//!                                    ┌──────────────────┐
//!                                    │ OpenAI / Ollama  │
//!                                    │ / fastembed      │
//!                                    └──────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! csync init                          # create database
//! csync index markdown --owner ann    # sync [sources.markdown]
//! csync delete markdown old.md        # drop one file's entries
//! csync export markdown > notes.jsonl
//! csync stats
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`db`] | SQLite connection pool with WAL mode and foreign keys |
//! | [`migrate`] | Database schema migrations (idempotent) |
//! | [`sqlite_store`] | SQLite implementation of the core `Store` trait |
//! | [`embedding`] | Disabled, OpenAI, Ollama, and local embedding providers |
//! | [`ingest`] | File collection and the `index` / `delete` commands |
//! | [`export`] | JSONL export (`csync export`) |
//! | [`stats`] | Entry and date counts per file type |
//! | [`model_cmd`] | Per-owner embedding model selection |
//!
//! The storage-agnostic engine lives in `corpus-sync-core`.

pub mod config;
pub mod db;
pub mod embedding;
pub mod export;
pub mod ingest;
pub mod migrate;
pub mod model_cmd;
pub mod sqlite_store;
pub mod stats;

pub use corpus_sync_core::store;
pub use sqlite_store::SqliteStore;
