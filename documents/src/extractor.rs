//! Document and image text extraction.

use std::sync::Arc;

use tracing::debug;

use crate::document::{DocumentId, DocumentParts, ImageReference};
use crate::error::Result;
use crate::store::{BlobStore, DocumentStore, OcrService};

/// Fetches the text and image references of a document. Every call goes
/// to the store; nothing is cached here.
#[derive(Clone)]
pub struct DocumentExtractor {
    store: Arc<dyn DocumentStore>,
}

impl DocumentExtractor {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Extract the native text and ordered image references of a document.
    pub async fn extract_parts(&self, id: &DocumentId) -> Result<DocumentParts> {
        let parts = self.store.get(id).await?;
        debug!(
            "Extracted document {id}: {} chars, {} images",
            parts.text.len(),
            parts.images.len()
        );
        Ok(parts)
    }
}

/// Reads an image from the blob store and runs OCR on it.
#[derive(Clone)]
pub struct ImageTextExtractor {
    blobs: Arc<dyn BlobStore>,
    ocr: Arc<dyn OcrService>,
}

impl ImageTextExtractor {
    pub fn new(blobs: Arc<dyn BlobStore>, ocr: Arc<dyn OcrService>) -> Self {
        Self { blobs, ocr }
    }

    /// Extract the text shown in one image.
    pub async fn extract_image_text(&self, reference: &ImageReference) -> Result<String> {
        let bytes = self.blobs.get(reference).await?;
        let text = self.ocr.recognize(reference, &bytes).await?;
        debug!(
            "OCR for {reference}: {} bytes in, {} chars out",
            bytes.len(),
            text.len()
        );
        Ok(text)
    }
}
