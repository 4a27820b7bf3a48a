//! Error types for document extraction and normalization.

use thiserror::Error;

use crate::document::{DocumentId, ImageReference};

/// Result type alias for document operations.
pub type Result<T> = std::result::Result<T, DocumentError>;

/// Errors that can occur while turning a document into text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocumentError {
    /// The document store does not know the id.
    #[error("document not found: {id}")]
    DocumentNotFound { id: DocumentId },

    /// The document exists but could not be read or parsed.
    #[error("failed to extract document {id}: {message}")]
    ExtractionFailure { id: DocumentId, message: String },

    /// The blob store has no image under the reference.
    #[error("image not found: {reference}")]
    BlobNotFound { reference: ImageReference },

    /// The blob store failed while reading an image.
    #[error("failed to read image {reference}: {message}")]
    StorageFailure {
        reference: ImageReference,
        message: String,
    },

    /// OCR rejected the image or the service failed.
    #[error("OCR failed for image {reference}: {message}")]
    OcrFailure {
        reference: ImageReference,
        message: String,
    },
}
