//! Embedding provider implementations.

use crate::config::EmbedConfig;
use crate::error::{EmbedError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Trait for embedding providers that can generate embeddings from text.
///
/// Implementations return exactly one vector per input, all of equal
/// dimensionality, associated with inputs by position.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embeddings for a batch of texts.
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Name/identifier of this provider.
    fn provider_name(&self) -> &str;
}

/// Provider backed by an external HTTP embedding service.
pub struct RemoteEmbedProvider {
    config: EmbedConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingRow {
    embedding: Vec<f32>,
}

impl RemoteEmbedProvider {
    pub fn new(config: EmbedConfig) -> Result<Self> {
        if config.api_base.is_empty() {
            return Err(EmbedError::invalid_config("api_base must not be empty"));
        }
        Ok(Self {
            config,
            client: reqwest::Client::new(),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for RemoteEmbedProvider {
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!("Requesting embeddings for {} texts", texts.len());
        let response = self
            .client
            .post(self.config.embeddings_url())
            .bearer_auth(&self.config.api_key)
            .json(&serde_json::json!({
                "model": self.config.model,
                "input": texts,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EmbedError::Backend {
                status: status.as_u16(),
                message,
            });
        }

        let body: EmbeddingsResponse = response.json().await?;
        let vectors: Vec<Vec<f32>> = body.data.into_iter().map(|row| row.embedding).collect();

        if vectors.len() != texts.len() {
            return Err(EmbedError::CountMismatch {
                expected: texts.len(),
                got: vectors.len(),
            });
        }
        if let Some(first) = vectors.first() {
            let dimension = first.len();
            for vector in &vectors {
                if vector.len() != dimension {
                    return Err(EmbedError::DimensionMismatch {
                        expected: dimension,
                        got: vector.len(),
                    });
                }
            }
        }
        Ok(vectors)
    }

    fn provider_name(&self) -> &str {
        "remote"
    }
}

/// Deterministic provider for tests: hashed bag-of-words vectors.
///
/// Tokens (split on non-alphanumeric boundaries and camelCase humps) are
/// hashed into a fixed number of buckets and the resulting count vector is
/// L2-normalized, so texts sharing vocabulary genuinely score higher under
/// cosine similarity. No network, no model files.
pub struct MockEmbedProvider {
    dimension: usize,
}

impl MockEmbedProvider {
    pub fn new() -> Self {
        Self { dimension: 256 }
    }

    pub fn with_dimension(dimension: usize) -> Self {
        Self { dimension }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in tokenize(text) {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let bucket = (hasher.finish() % self.dimension as u64) as usize;
            vector[bucket] += 1.0;
        }
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

impl Default for MockEmbedProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbedProvider {
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn provider_name(&self) -> &str {
        "mock"
    }
}

/// Lowercased word tokens, with camelCase identifiers split into their humps.
fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for word in text.split(|c: char| !c.is_alphanumeric()) {
        if word.is_empty() {
            continue;
        }
        let mut current = String::new();
        let mut prev_lower = false;
        for c in word.chars() {
            if c.is_uppercase() && prev_lower && !current.is_empty() {
                tokens.push(current.to_lowercase());
                current = String::new();
            }
            prev_lower = c.is_lowercase();
            current.push(c);
        }
        if !current.is_empty() {
            tokens.push(current.to_lowercase());
        }
    }
    tokens
}
