//! Embedding provider trait, model registry, and vector encoding.
//!
//! Defines the [`EmbeddingProvider`] trait that all embedding backends
//! implement and the [`ModelRegistry`] the indexer resolves an owner's
//! model through. Concrete providers (OpenAI, Ollama, fastembed) live in
//! the `corpus-sync` app crate.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::error::IndexError;

/// Trait for embedding providers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `1536`).
    fn dims(&self) -> usize;
    /// Embed `texts`, returning one vector per input in input order.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Named embedding providers plus the default used for owners with no
/// configured model.
///
/// Built once by the caller and handed to the indexer; there is no
/// process-wide instance.
pub struct ModelRegistry {
    models: HashMap<String, Arc<dyn EmbeddingProvider>>,
    default_model: String,
}

impl ModelRegistry {
    /// Create a registry whose default is `provider`.
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        let default_model = provider.model_name().to_string();
        let mut models = HashMap::new();
        models.insert(default_model.clone(), provider);
        Self {
            models,
            default_model,
        }
    }

    /// Register an additional provider under its model name.
    pub fn register(&mut self, provider: Arc<dyn EmbeddingProvider>) {
        self.models
            .insert(provider.model_name().to_string(), provider);
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Resolve the owner's configured model, or the default when `None`.
    pub fn resolve(&self, configured: Option<&str>) -> Result<Arc<dyn EmbeddingProvider>> {
        let name = configured.unwrap_or(&self.default_model);
        self.models.get(name).cloned().ok_or_else(|| {
            IndexError::UnknownModel {
                model: name.to_string(),
            }
            .into()
        })
    }
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// # Example
///
/// ```rust
/// use corpus_sync_core::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12); // 3 × 4 bytes
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    #[async_trait]
    impl EmbeddingProvider for Named {
        fn model_name(&self) -> &str {
            self.0
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![0.0, 1.0]).collect())
        }
    }

    #[test]
    fn test_resolve_default_and_configured() {
        let mut registry = ModelRegistry::new(Arc::new(Named("base")));
        registry.register(Arc::new(Named("large")));

        assert_eq!(registry.resolve(None).unwrap().model_name(), "base");
        assert_eq!(registry.resolve(Some("large")).unwrap().model_name(), "large");
    }

    #[test]
    fn test_resolve_unknown_model_is_typed_error() {
        let registry = ModelRegistry::new(Arc::new(Named("base")));
        let err = registry.resolve(Some("missing")).err().unwrap();
        assert_eq!(
            err.downcast_ref::<IndexError>(),
            Some(&IndexError::UnknownModel {
                model: "missing".to_string()
            })
        );
    }

    #[test]
    fn test_blob_truncates_partial_trailing_bytes() {
        let mut blob = vec_to_blob(&[1.5]);
        blob.push(0xff);
        assert_eq!(blob_to_vec(&blob), vec![1.5]);
    }
}
