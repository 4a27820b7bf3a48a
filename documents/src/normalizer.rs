//! Normalization of a document into one text blob.
//!
//! The native text comes first, followed by the OCR output of every image
//! in document order, all joined by single spaces. Images are processed
//! concurrently; their completion order does not affect the result.

use futures::future::{join_all, try_join_all};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::document::DocumentId;
use crate::error::Result;
use crate::extractor::{DocumentExtractor, ImageTextExtractor};

/// What to do when text extraction fails for one image of a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFailurePolicy {
    /// Fail the whole normalization with the image's error.
    #[default]
    FailFast,

    /// Log the failure and leave the image out of the text.
    Skip,
}

/// Composes document and image extraction into [`DocumentNormalizer::normalize`].
#[derive(Clone)]
pub struct DocumentNormalizer {
    documents: DocumentExtractor,
    images: ImageTextExtractor,
    policy: ImageFailurePolicy,
}

impl DocumentNormalizer {
    pub fn new(documents: DocumentExtractor, images: ImageTextExtractor) -> Self {
        Self {
            documents,
            images,
            policy: ImageFailurePolicy::default(),
        }
    }

    /// Set the image failure policy.
    pub fn with_policy(mut self, policy: ImageFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> ImageFailurePolicy {
        self.policy
    }

    /// Produce the text to embed for a document.
    pub async fn normalize(&self, id: &DocumentId) -> Result<String> {
        let parts = self.documents.extract_parts(id).await?;

        let extractions = parts
            .images
            .iter()
            .map(|reference| self.images.extract_image_text(reference));

        let image_texts = match self.policy {
            ImageFailurePolicy::FailFast => try_join_all(extractions).await?,
            ImageFailurePolicy::Skip => join_all(extractions)
                .await
                .into_iter()
                .zip(&parts.images)
                .filter_map(|(result, reference)| match result {
                    Ok(text) => Some(text),
                    Err(e) => {
                        warn!("Skipping image {reference} of document {id}: {e}");
                        None
                    }
                })
                .collect(),
        };

        let text = std::iter::once(parts.text)
            .chain(image_texts)
            .collect::<Vec<_>>()
            .join(" ");

        debug!("Normalized document {id} to {} chars", text.len());
        Ok(text)
    }
}
