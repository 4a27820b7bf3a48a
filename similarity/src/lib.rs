//! # Document Similarity
//!
//! Semantic similarity between two documents, measured as the cosine of
//! the angle between their embeddings.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Similarity Service                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  similarity(id1, id2)                                           │
//! │       │            (both ids concurrently)                      │
//! │       ▼                                                         │
//! │  CachedEmbeddingSource ──► DocumentEmbedder                     │
//! │                               │          │                      │
//! │                               ▼          ▼                      │
//! │                     DocumentNormalizer  RetryPolicy(model)      │
//! │                                                                 │
//! │  cosine_similarity(a, b) ──► f32                                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use docsim_similarity::SimilarityService;
//!
//! let service = SimilarityService::builder()
//!     .with_document_store(documents)
//!     .with_blob_store(blobs)
//!     .with_ocr(ocr)
//!     .with_openai(api_key)
//!     .build()?;
//!
//! let score = service.similarity(&"contract-a".into(), &"contract-b".into()).await?;
//! ```

pub mod config;
pub mod error;
pub mod service;
pub mod source;

pub use config::{EmbeddingConfig, RetryConfig, SimilarityConfig};
pub use error::{Result, SimilarityError};
pub use service::{SimilarityService, SimilarityServiceBuilder};
pub use source::{CachedEmbeddingSource, DocumentEmbedder, EmbeddingSource};

// Re-export from dependencies for convenience
pub use docsim_documents::{
    BlobStore, DocumentError, DocumentId, DocumentParts, DocumentStore, ImageFailurePolicy,
    ImageReference, OcrService,
};
pub use docsim_embeddings::{
    CacheStats, Embedding, EmbeddingError, EmbeddingModel, EmbeddingRequest, EmbeddingResponse,
    RetryPolicy, cosine_similarity,
};
