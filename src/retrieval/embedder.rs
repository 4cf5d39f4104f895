//! Query embedding for the Qdrant retriever.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::{RetrievalError, RetrievalResult};

const EMBEDDING_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
/// Turns query text into a search vector.
pub trait QueryEmbedder: Send + Sync {
    async fn embed(&self, text: &str) -> RetrievalResult<Vec<f32>>;
}

/// Client for an OpenAI-compatible `/v1/embeddings` endpoint.
#[derive(Debug, Clone)]
pub struct HttpEmbedder {
    http: HttpClient,
    url: String,
    model: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    pub fn new(url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: HttpClient::builder()
                .timeout(EMBEDDING_TIMEOUT)
                .build()
                .unwrap_or_else(|_| HttpClient::new()),
            url: url.into(),
            model: model.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl QueryEmbedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> RetrievalResult<Vec<f32>> {
        let response = self
            .http
            .post(&self.url)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: text,
            })
            .send()
            .await
            .map_err(|e| RetrievalError::Embedding {
                message: format!("request to {} failed: {e}", self.url),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RetrievalError::Embedding {
                message: format!("{} returned {status}", self.url),
            });
        }

        let body: EmbeddingResponse =
            response.json().await.map_err(|e| RetrievalError::Embedding {
                message: format!("unreadable response: {e}"),
            })?;

        let embedding = body
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| RetrievalError::Embedding {
                message: "response contained no embedding".to_string(),
            })?;

        debug!(dim = embedding.len(), model = %self.model, "Query embedded");
        Ok(embedding)
    }
}
