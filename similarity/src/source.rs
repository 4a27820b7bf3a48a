//! Sources of document embeddings.
//!
//! [`DocumentEmbedder`] computes an embedding from scratch on every call.
//! [`CachedEmbeddingSource`] decorates any source with a single-flight,
//! process-lifetime cache keyed by document id.

use std::sync::Arc;

use async_trait::async_trait;
use docsim_documents::{DocumentId, DocumentNormalizer};
use docsim_embeddings::{
    CacheStats, Embedding, EmbeddingCache, EmbeddingError, EmbeddingModel, EmbeddingRequest,
    RetryPolicy,
};
use tracing::{debug, info};

use crate::error::{Result, SimilarityError};

/// Something that can produce the embedding of a document.
#[async_trait]
pub trait EmbeddingSource: Send + Sync {
    /// Get the embedding for a document.
    async fn embed(&self, id: &DocumentId) -> Result<Arc<Embedding>>;

    /// Cache statistics, for sources that cache.
    fn cache_stats(&self) -> Option<CacheStats> {
        None
    }
}

/// Normalizes a document and sends the text to the embedding model.
///
/// Only the model call is retried; normalization failures surface
/// immediately.
pub struct DocumentEmbedder {
    normalizer: DocumentNormalizer,
    model: Arc<dyn EmbeddingModel>,
    retry: RetryPolicy,
    model_name: Option<String>,
    dimensions: Option<usize>,
    expected_dimension: Option<usize>,
}

impl DocumentEmbedder {
    /// Create an embedder using the model's default model name.
    pub fn new(normalizer: DocumentNormalizer, model: Arc<dyn EmbeddingModel>) -> Self {
        Self {
            normalizer,
            model,
            retry: RetryPolicy::default(),
            model_name: None,
            dimensions: None,
            expected_dimension: None,
        }
    }

    /// Set the retry policy for model calls.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Request a specific model.
    pub fn with_model_name(mut self, model: impl Into<String>) -> Self {
        self.model_name = Some(model.into());
        self
    }

    /// Request a specific output dimension from the model.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    /// Reject model output of any other length.
    pub fn with_expected_dimension(mut self, dimension: usize) -> Self {
        self.expected_dimension = Some(dimension);
        self
    }

    fn request(&self, text: String) -> EmbeddingRequest {
        let mut request = EmbeddingRequest::new(text);
        if let Some(model) = &self.model_name {
            request = request.with_model(model.clone());
        }
        if let Some(dimensions) = self.dimensions {
            request = request.with_dimensions(dimensions);
        }
        request
    }
}

#[async_trait]
impl EmbeddingSource for DocumentEmbedder {
    async fn embed(&self, id: &DocumentId) -> Result<Arc<Embedding>> {
        let text = self
            .normalizer
            .normalize(id)
            .await
            .map_err(|source| SimilarityError::Document {
                id: id.clone(),
                source,
            })?;

        let request = self.request(text);
        let embedding_error = |source: EmbeddingError| SimilarityError::Embedding {
            id: id.clone(),
            source,
        };

        let response = self
            .retry
            .run(self.model.name(), || self.model.embed(request.clone()))
            .await
            .map_err(embedding_error)?;

        if let Some(expected) = self
            .expected_dimension
            .filter(|&expected| expected != response.dimension())
        {
            return Err(embedding_error(EmbeddingError::DimensionMismatch {
                expected,
                actual: response.dimension(),
            }));
        }

        info!(
            "Embedded document {id} with {} ({} dimensions)",
            response.model,
            response.dimension()
        );
        Ok(Arc::new(response.embedding))
    }
}

/// Caching decorator over another [`EmbeddingSource`].
///
/// At most one computation per document id runs at a time; concurrent
/// callers share its outcome. Failures are not cached.
pub struct CachedEmbeddingSource<S> {
    inner: Arc<S>,
    cache: EmbeddingCache<DocumentId, SimilarityError>,
}

impl<S> CachedEmbeddingSource<S>
where
    S: EmbeddingSource + 'static,
{
    pub fn new(inner: S) -> Self {
        Self::from_shared(Arc::new(inner))
    }

    pub fn from_shared(inner: Arc<S>) -> Self {
        Self {
            inner,
            cache: EmbeddingCache::new(),
        }
    }

    /// Return the cached embedding for `id`, computing it through the inner
    /// source on a miss.
    pub async fn get_or_compute(&self, id: &DocumentId) -> Result<Arc<Embedding>> {
        let inner = Arc::clone(&self.inner);
        let key = id.clone();
        self.cache
            .get_or_compute(id.clone(), move || async move {
                debug!("Computing embedding for document {key}");
                inner.embed(&key).await.map(Arc::unwrap_or_clone)
            })
            .await
    }

    /// Check if an embedding is cached for `id`.
    pub fn contains(&self, id: &DocumentId) -> bool {
        self.cache.contains(id)
    }

    /// Get the underlying cache.
    pub fn cache(&self) -> &EmbeddingCache<DocumentId, SimilarityError> {
        &self.cache
    }
}

#[async_trait]
impl<S> EmbeddingSource for CachedEmbeddingSource<S>
where
    S: EmbeddingSource + 'static,
{
    async fn embed(&self, id: &DocumentId) -> Result<Arc<Embedding>> {
        self.get_or_compute(id).await
    }

    fn cache_stats(&self) -> Option<CacheStats> {
        Some(self.cache.stats())
    }
}
