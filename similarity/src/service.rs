//! Similarity service implementation.

use std::sync::Arc;

use docsim_documents::{
    BlobStore, DocumentExtractor, DocumentId, DocumentNormalizer, DocumentStore,
    ImageTextExtractor, OcrService,
};
use docsim_embeddings::{CacheStats, Embedding, EmbeddingModel, OpenAIModel, cosine_similarity};
use tracing::{debug, info};

use crate::config::SimilarityConfig;
use crate::error::{Result, SimilarityError};
use crate::source::{CachedEmbeddingSource, DocumentEmbedder, EmbeddingSource};

/// Computes the semantic similarity of two documents.
///
/// Both embeddings are fetched concurrently through the configured
/// [`EmbeddingSource`]. If both fail, the error for the first id is
/// reported.
#[derive(Clone)]
pub struct SimilarityService {
    source: Arc<dyn EmbeddingSource>,
}

impl SimilarityService {
    /// Create a service over an existing embedding source.
    pub fn new(source: Arc<dyn EmbeddingSource>) -> Self {
        Self { source }
    }

    /// Create a new service builder.
    pub fn builder() -> SimilarityServiceBuilder {
        SimilarityServiceBuilder::new()
    }

    /// Cosine similarity of the embeddings of two documents.
    pub async fn similarity(&self, id1: &DocumentId, id2: &DocumentId) -> Result<f32> {
        debug!("Computing similarity of {id1} and {id2}");

        let (first, second) = tokio::join!(self.source.embed(id1), self.source.embed(id2));
        let (first, second) = (first?, second?);

        let score = cosine_similarity(&first, &second)?;
        info!("Similarity of {id1} and {id2}: {score:.4}");
        Ok(score)
    }

    /// The embedding of a single document.
    pub async fn embedding(&self, id: &DocumentId) -> Result<Arc<Embedding>> {
        self.source.embed(id).await
    }

    /// Cache statistics, if the service caches embeddings.
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.source.cache_stats()
    }
}

/// Builder wiring the external collaborators into a [`SimilarityService`].
#[derive(Default)]
pub struct SimilarityServiceBuilder {
    config: SimilarityConfig,
    documents: Option<Arc<dyn DocumentStore>>,
    blobs: Option<Arc<dyn BlobStore>>,
    ocr: Option<Arc<dyn OcrService>>,
    model: Option<Arc<dyn EmbeddingModel>>,
    openai_api_key: Option<String>,
}

impl SimilarityServiceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: SimilarityConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_document_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.documents = Some(store);
        self
    }

    pub fn with_blob_store(mut self, store: Arc<dyn BlobStore>) -> Self {
        self.blobs = Some(store);
        self
    }

    pub fn with_ocr(mut self, ocr: Arc<dyn OcrService>) -> Self {
        self.ocr = Some(ocr);
        self
    }

    /// Use a custom embedding model.
    pub fn with_model(mut self, model: Arc<dyn EmbeddingModel>) -> Self {
        self.model = Some(model);
        self
    }

    /// Use the OpenAI-compatible API from the embedding configuration.
    pub fn with_openai(mut self, api_key: impl Into<String>) -> Self {
        self.openai_api_key = Some(api_key.into());
        self
    }

    /// Build the service.
    pub fn build(self) -> Result<SimilarityService> {
        let config = self.config;
        let missing = |what: &str| SimilarityError::Config(format!("{what} not set"));

        let documents = self.documents.ok_or_else(|| missing("document store"))?;
        let blobs = self.blobs.ok_or_else(|| missing("blob store"))?;
        let ocr = self.ocr.ok_or_else(|| missing("OCR service"))?;

        let model: Arc<dyn EmbeddingModel> = match (self.model, self.openai_api_key) {
            (Some(model), _) => model,
            (None, Some(api_key)) => Arc::new(
                OpenAIModel::new()
                    .with_api_key(api_key)
                    .with_base_url(config.embedding.base_url.as_str())
                    .with_model(config.embedding.model.as_str()),
            ),
            (None, None) => return Err(missing("embedding model")),
        };

        let normalizer = DocumentNormalizer::new(
            DocumentExtractor::new(documents),
            ImageTextExtractor::new(blobs, ocr),
        )
        .with_policy(config.image_failure_policy);

        let mut embedder = DocumentEmbedder::new(normalizer, model)
            .with_retry(config.retry.policy())
            .with_model_name(config.embedding.model.as_str());
        if let Some(dimensions) = config.embedding.dimensions {
            embedder = embedder.with_dimensions(dimensions);
        }
        if let Some(expected) = config.embedding.expected_dimension {
            embedder = embedder.with_expected_dimension(expected);
        }

        let source: Arc<dyn EmbeddingSource> = if config.cache_enabled {
            Arc::new(CachedEmbeddingSource::new(embedder))
        } else {
            Arc::new(embedder)
        };

        info!(
            "Similarity service ready (model: {}, cache: {})",
            config.embedding.model, config.cache_enabled
        );
        Ok(SimilarityService::new(source))
    }
}
