//! Fatal conditions raised by the indexing engine.
//!
//! These travel inside `anyhow::Error`; callers that need to tell them
//! apart can `downcast_ref::<IndexError>()`.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexError {
    #[error("embedding model returned {actual} vectors for {expected} entries")]
    EmbeddingCountMismatch { expected: usize, actual: usize },

    #[error("unknown embedding model: '{model}'")]
    UnknownModel { model: String },

    #[error("embedding provider is disabled")]
    EmbeddingDisabled,
}
