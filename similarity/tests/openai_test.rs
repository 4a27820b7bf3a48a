//! Similarity over an OpenAI-compatible embeddings endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use docsim_documents::{InMemoryBlobStore, InMemoryDocumentStore};
use docsim_similarity::{
    DocumentError, DocumentId, DocumentParts, EmbeddingConfig, EmbeddingError, ImageReference,
    OcrService, RetryConfig, SimilarityConfig, SimilarityError, SimilarityService,
};
use pretty_assertions::assert_eq;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct NoTextOcr;

#[async_trait]
impl OcrService for NoTextOcr {
    async fn recognize(
        &self,
        _reference: &ImageReference,
        _image: &[u8],
    ) -> Result<String, DocumentError> {
        Ok(String::new())
    }
}

fn service(server: &MockServer) -> SimilarityService {
    let config = SimilarityConfig::default()
        .with_embedding(EmbeddingConfig {
            model: "text-embedding-3-small".to_string(),
            base_url: server.uri(),
            ..EmbeddingConfig::default()
        })
        .with_retry(RetryConfig {
            backoff_unit_ms: 1,
            ..RetryConfig::default()
        });

    let documents = InMemoryDocumentStore::new()
        .with_document("alpha", DocumentParts::new("invoice"))
        .with_document("beta", DocumentParts::new("receipt"));

    SimilarityService::builder()
        .with_config(config)
        .with_document_store(Arc::new(documents))
        .with_blob_store(Arc::new(InMemoryBlobStore::new()))
        .with_ocr(Arc::new(NoTextOcr))
        .with_openai("sk-test")
        .build()
        .unwrap()
}

fn embedding_body(embedding: &[f32]) -> serde_json::Value {
    serde_json::json!({
        "data": [{ "embedding": embedding, "index": 0 }],
        "model": "text-embedding-3-small",
        "usage": { "prompt_tokens": 1, "total_tokens": 1 }
    })
}

#[tokio::test]
async fn test_similarity_through_http_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .and(header("Authorization", "Bearer sk-test"))
        .and(body_partial_json(serde_json::json!({
            "input": "invoice",
            "model": "text-embedding-3-small"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(embedding_body(&[1.0, 0.0])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .and(body_partial_json(serde_json::json!({ "input": "receipt" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(embedding_body(&[1.0, 1.0])))
        .expect(1)
        .mount(&server)
        .await;

    let service = service(&server);
    let alpha = DocumentId::new("alpha");
    let beta = DocumentId::new("beta");

    for _ in 0..3 {
        let score = service.similarity(&alpha, &beta).await.unwrap();
        assert!((score - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
    }
}

#[tokio::test]
async fn test_rejected_request_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad input"))
        .expect(1)
        .mount(&server)
        .await;

    let err = service(&server)
        .embedding(&DocumentId::new("alpha"))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        SimilarityError::Embedding {
            id: DocumentId::new("alpha"),
            source: EmbeddingError::ApiRequest {
                status: 400,
                message: "bad input".to_string(),
            },
        }
    );
}

#[tokio::test]
async fn test_server_errors_exhaust_retries() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(503))
        .expect(4)
        .mount(&server)
        .await;

    let err = service(&server)
        .embedding(&DocumentId::new("beta"))
        .await
        .unwrap_err();

    assert!(
        matches!(
            err,
            SimilarityError::Embedding {
                source: EmbeddingError::EmbeddingUnavailable { attempts: 4, .. },
                ..
            }
        ),
        "unexpected error: {err}"
    );
}
