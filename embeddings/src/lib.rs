//! # Embeddings
//!
//! Embedding vectors and everything needed to obtain them cheaply and
//! reliably for document similarity.
//!
//! ## Features
//!
//! - **Similarity Math**: Cosine similarity between two embeddings
//! - **Embedding Models**: Trait for external models plus an OpenAI-compatible client
//! - **Retry**: Exponential backoff for transient model failures
//! - **Caching**: Single-flight, process-lifetime memoization of embeddings
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Embeddings System                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  EmbeddingModel ──► RetryPolicy ──► EmbeddingCache             │
//! │       │                                   │                     │
//! │       ▼                                   ▼                     │
//! │  OpenAIModel                      cosine_similarity             │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod error;
pub mod model;
pub mod retry;
pub mod similarity;

pub use cache::{CacheStats, EmbeddingCache};
pub use error::{EmbeddingError, Result};
pub use model::{EmbeddingModel, EmbeddingRequest, EmbeddingResponse, OpenAIModel};
pub use retry::RetryPolicy;
pub use similarity::cosine_similarity;

/// A dense vector embedding.
pub type Embedding = Vec<f32>;

/// Dimension of embeddings produced by the default model.
pub const DEFAULT_DIMENSION: usize = 1536; // text-embedding-ada-002
