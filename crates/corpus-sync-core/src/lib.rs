//! # corpus-sync core
//!
//! Storage-agnostic logic for corpus-sync: entry models, chunking,
//! content fingerprints, snapshot reconciliation, the store abstraction,
//! the embedding provider contract, and the incremental embedding
//! update engine that ties them together.
//!
//! This crate contains no sqlx, HTTP client, or filesystem I/O. Concrete
//! stores and embedding backends live in the `corpus-sync` app crate.
//!
//! ## Data Flow
//!
//! ```text
//! raw entries ─▶ chunk ─▶ hash/reconcile ─▶ embed + persist ─▶ date index
//!                                               │
//!                                               └─▶ delete stale rows
//! ```

pub mod chunk;
pub mod dates;
pub mod embedding;
pub mod error;
pub mod hash;
pub mod index;
pub mod jsonl;
pub mod models;
pub mod processor;
pub mod reconcile;
pub mod store;

pub use error::IndexError;
pub use index::{EntryIndexer, IndexOptions, IndexScope};
pub use models::{Entry, FileSource, FileType, IndexStats, PersistedEntry};
