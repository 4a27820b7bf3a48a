//! Error types for the similarity service.

use docsim_documents::{DocumentError, DocumentId};
use docsim_embeddings::EmbeddingError;
use thiserror::Error;

/// Result type alias for similarity operations.
pub type Result<T> = std::result::Result<T, SimilarityError>;

/// Errors that can occur while computing a similarity.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimilarityError {
    /// Extracting or normalizing a document failed.
    #[error("document {id}: {source}")]
    Document {
        id: DocumentId,
        source: DocumentError,
    },

    /// Obtaining the embedding of a document failed.
    #[error("embedding for document {id}: {source}")]
    Embedding {
        id: DocumentId,
        source: EmbeddingError,
    },

    /// The two embeddings could not be compared.
    #[error("similarity error: {0}")]
    Similarity(#[from] EmbeddingError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl SimilarityError {
    /// The document the failure belongs to, if any.
    pub fn document_id(&self) -> Option<&DocumentId> {
        match self {
            Self::Document { id, .. } | Self::Embedding { id, .. } => Some(id),
            Self::Similarity(_) | Self::Config(_) => None,
        }
    }
}
