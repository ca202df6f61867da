//! aviary-retriever: structural code knowledge for TypeScript server projects.
//!
//! This crate owns the persistent side of the engine and the operations built
//! on top of it:
//!
//! - **[`storage`]**: the SQLite store holding the file registry, dependency
//!   edges and embedded code chunks
//! - **[`retrieval`]**: change detection, per-file analysis, the indexing
//!   passes, vector search, graph lookups and the context report
//!
//! ## Architecture
//!
//! ```text
//! Files → Analyzer → (Registry rows, Edge buffer, Chunk buffer) → SQLite
//!                                                                    ↓
//! Query text → EmbeddingProvider → cosine scan → grouped hits → report
//! ```

pub mod retrieval;
pub mod storage;
