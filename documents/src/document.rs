//! Document identifiers and raw document content.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for DocumentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Opaque reference to an image asset of a document (a path or blob key).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageReference(String);

impl ImageReference {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImageReference {
    fn from(reference: &str) -> Self {
        Self::new(reference)
    }
}

impl From<String> for ImageReference {
    fn from(reference: String) -> Self {
        Self(reference)
    }
}

/// Native text of a document plus its images, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentParts {
    /// Text content of the document.
    pub text: String,

    /// Images belonging to the document, in the order they appear.
    pub images: Vec<ImageReference>,
}

impl DocumentParts {
    /// Create document parts with text only.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            images: Vec::new(),
        }
    }

    /// Append an image reference.
    pub fn with_image(mut self, reference: impl Into<ImageReference>) -> Self {
        self.images.push(reference.into());
        self
    }
}
