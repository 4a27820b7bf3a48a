//! External collaborators: document store, blob store and OCR service.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::debug;

use crate::document::{DocumentId, DocumentParts, ImageReference};
use crate::error::{DocumentError, Result};

/// Source of raw document content.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch the text and image references of a document.
    ///
    /// Unknown ids fail with [`DocumentError::DocumentNotFound`].
    async fn get(&self, id: &DocumentId) -> Result<DocumentParts>;
}

/// Source of raw image bytes.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch the bytes behind an image reference.
    async fn get(&self, reference: &ImageReference) -> Result<Vec<u8>>;
}

/// Optical character recognition.
#[async_trait]
pub trait OcrService: Send + Sync {
    /// Extract the text shown in an image. An image without text yields an
    /// empty string, not an error.
    async fn recognize(&self, reference: &ImageReference, image: &[u8]) -> Result<String>;
}

/// Document store backed by a map.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<HashMap<DocumentId, DocumentParts>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document while building the store.
    pub fn with_document(mut self, id: impl Into<DocumentId>, parts: DocumentParts) -> Self {
        self.documents.get_mut().insert(id.into(), parts);
        self
    }

    /// Add or replace a document.
    pub async fn insert(&self, id: impl Into<DocumentId>, parts: DocumentParts) {
        self.documents.write().await.insert(id.into(), parts);
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, id: &DocumentId) -> Result<DocumentParts> {
        self.documents
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| DocumentError::DocumentNotFound { id: id.clone() })
    }
}

/// Blob store backed by a map.
#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<ImageReference, Vec<u8>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a blob while building the store.
    pub fn with_blob(mut self, reference: impl Into<ImageReference>, bytes: Vec<u8>) -> Self {
        self.blobs.get_mut().insert(reference.into(), bytes);
        self
    }

    /// Add or replace a blob.
    pub async fn insert(&self, reference: impl Into<ImageReference>, bytes: Vec<u8>) {
        self.blobs.write().await.insert(reference.into(), bytes);
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn get(&self, reference: &ImageReference) -> Result<Vec<u8>> {
        self.blobs
            .read()
            .await
            .get(reference)
            .cloned()
            .ok_or_else(|| DocumentError::BlobNotFound {
                reference: reference.clone(),
            })
    }
}

/// Blob store reading images from a directory. References are paths
/// relative to the root and may not leave it.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn blob_path(&self, reference: &ImageReference) -> Result<PathBuf> {
        let relative = Path::new(reference.as_str());
        let contained = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !contained || relative.as_os_str().is_empty() {
            return Err(DocumentError::StorageFailure {
                reference: reference.clone(),
                message: "reference must be a relative path inside the blob root".to_string(),
            });
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn get(&self, reference: &ImageReference) -> Result<Vec<u8>> {
        let path = self.blob_path(reference)?;
        debug!("Reading image {reference} from {}", path.display());

        fs::read(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => DocumentError::BlobNotFound {
                reference: reference.clone(),
            },
            _ => DocumentError::StorageFailure {
                reference: reference.clone(),
                message: format!("{}: {e}", path.display()),
            },
        })
    }
}
