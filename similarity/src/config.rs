//! Configuration for the similarity service.
//!
//! Credentials are not part of the configuration; API keys are handed to
//! the builder.

use std::time::Duration;

use docsim_documents::ImageFailurePolicy;
use docsim_embeddings::RetryPolicy;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimilarityError};

/// Configuration for the similarity service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    /// Embedding model configuration.
    pub embedding: EmbeddingConfig,

    /// Retry policy for model calls.
    pub retry: RetryConfig,

    /// Whether to cache embeddings per document.
    pub cache_enabled: bool,

    /// What to do when OCR fails for one image.
    pub image_failure_policy: ImageFailurePolicy,
}

impl SimilarityConfig {
    /// Parse a TOML configuration. Missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| SimilarityError::Config(e.to_string()))
    }

    /// Disable the embedding cache.
    pub fn without_cache(mut self) -> Self {
        self.cache_enabled = false;
        self
    }

    /// Set the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set the embedding configuration.
    pub fn with_embedding(mut self, embedding: EmbeddingConfig) -> Self {
        self.embedding = embedding;
        self
    }

    /// Set the image failure policy.
    pub fn with_image_failure_policy(mut self, policy: ImageFailurePolicy) -> Self {
        self.image_failure_policy = policy;
        self
    }
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            embedding: EmbeddingConfig::default(),
            retry: RetryConfig::default(),
            cache_enabled: true,
            image_failure_policy: ImageFailurePolicy::default(),
        }
    }
}

/// Configuration for the embedding model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Model identifier sent with every request.
    pub model: String,

    /// Base URL of an OpenAI-compatible API.
    pub base_url: String,

    /// Output dimensions to request (if supported by the model).
    pub dimensions: Option<usize>,

    /// Reject embeddings whose length differs from this.
    pub expected_dimension: Option<usize>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-ada-002".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            dimensions: None,
            expected_dimension: None,
        }
    }
}

/// Configuration for retrying transient model failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,

    /// Exponential base of the backoff.
    pub backoff_base: f64,

    /// Length of one backoff unit in milliseconds.
    pub backoff_unit_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: 2.0,
            backoff_unit_ms: 1000,
        }
    }
}

impl RetryConfig {
    /// Build the retry policy.
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries)
            .with_backoff_base(self.backoff_base)
            .with_backoff_unit(Duration::from_millis(self.backoff_unit_ms))
    }
}
