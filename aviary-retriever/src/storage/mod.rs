//! Storage layer for aviary-retriever.
//!
//! Three persistent relations back the engine:
//!
//! - **files**: one row per indexed source file (content hash, last-indexed
//!   timestamp, cached skeleton document)
//! - **edges**: directed dependency relations between file paths, unique by
//!   (source, target, relation), additive with insert-or-ignore semantics
//! - **chunks**: embeddable code fragments with their vectors and metadata,
//!   upserted by their 128-bit random identifier
//!
//! All paths stored here are project-root-relative and forward-slash
//! normalized regardless of host OS.

use aviary_context::{ChunkKind, ChunkMetadata, Skeleton};
use uuid::Uuid;

pub mod sqlite_store;

/// Registry row for one source file.
#[derive(Debug, Clone)]
pub struct FileRecord {
    /// Normalized project-root-relative path (primary key).
    pub path: String,
    /// 128-bit content fingerprint, hex encoded.
    pub hash: String,
    /// Unix epoch seconds of the last successful registration.
    pub last_indexed: i64,
    /// Cached skeleton document; absent until first analysis.
    pub skeleton: Option<Skeleton>,
}

/// Kind of a dependency edge. Only `Import` is emitted today; the remaining
/// variants are reserved in the schema and callers tolerate their absence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    Import,
    Extends,
    Implements,
    Injects,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::Import => "import",
            RelationKind::Extends => "extends",
            RelationKind::Implements => "implements",
            RelationKind::Injects => "injects",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "import" => Some(RelationKind::Import),
            "extends" => Some(RelationKind::Extends),
            "implements" => Some(RelationKind::Implements),
            "injects" => Some(RelationKind::Injects),
            _ => None,
        }
    }
}

/// Directed dependency between two file paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEdge {
    pub source: String,
    /// May point outside the scanned scope; no registry row is required.
    pub target: String,
    pub relation: RelationKind,
}

/// A chunk as persisted: content, vector and metadata.
#[derive(Debug, Clone)]
pub struct StoredChunk {
    pub id: Uuid,
    pub file_path: String,
    pub kind: ChunkKind,
    pub content: String,
    /// For `method` chunks, the `class_signature` chunk of the same file.
    pub parent_id: Option<Uuid>,
    pub vector: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// Row counts across the three relations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub files: usize,
    pub edges: usize,
    pub chunks: usize,
}
