//! # Documents
//!
//! Turns a document id into the single text blob that gets embedded.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Document Normalization                       │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  DocumentStore ──► DocumentExtractor ──┐                        │
//! │                                        ▼                        │
//! │                              DocumentNormalizer ──► text        │
//! │                                        ▲                        │
//! │  BlobStore + OcrService ──► ImageTextExtractor (fan-out)        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The stores and the OCR service are external collaborators and are
//! modelled as traits. In-memory and filesystem stores are provided.

pub mod document;
pub mod error;
pub mod extractor;
pub mod normalizer;
pub mod store;

pub use document::{DocumentId, DocumentParts, ImageReference};
pub use error::{DocumentError, Result};
pub use extractor::{DocumentExtractor, ImageTextExtractor};
pub use normalizer::{DocumentNormalizer, ImageFailurePolicy};
pub use store::{
    BlobStore, DocumentStore, FsBlobStore, InMemoryBlobStore, InMemoryDocumentStore, OcrService,
};
