//! Configuration for the remote embedding backend.

use serde::Deserialize;

/// Connection settings for an external embedding service.
///
/// The backend is expected to expose an OpenAI-style `/embeddings` endpoint
/// and to enforce its own deadlines; the provider propagates failures upward.
#[derive(Debug, Clone, Deserialize)]
pub struct EmbedConfig {
    /// Base URL of the service, e.g. `https://api.example.com/v1`.
    pub api_base: String,
    /// Bearer token sent with every request.
    pub api_key: String,
    /// Model identifier forwarded to the backend.
    pub model: String,
}

impl EmbedConfig {
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            api_key: api_key.into(),
            model: "text-embedding-3-small".to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Full URL of the embeddings endpoint.
    pub fn embeddings_url(&self) -> String {
        format!("{}/embeddings", self.api_base.trim_end_matches('/'))
    }
}
