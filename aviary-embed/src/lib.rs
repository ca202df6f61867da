//! aviary-embed: embedding providers for the knowledge engine.
//!
//! Exposes the [`EmbeddingProvider`] trait consumed by the indexing and
//! retrieval pipeline, a [`RemoteEmbedProvider`] that calls an external
//! embedding service over HTTP, and a [`MockEmbedProvider`] producing
//! deterministic vectors for offline tests.

pub mod config;
pub mod error;
pub mod provider;

pub use config::EmbedConfig;
pub use error::{EmbedError, Result};
pub use provider::{EmbeddingProvider, MockEmbedProvider, RemoteEmbedProvider};
