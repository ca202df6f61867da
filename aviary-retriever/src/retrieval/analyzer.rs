//! Per-file analysis: chunking plus dependency-edge resolution.

use anyhow::Result;
use std::path::Path;
use tracing::debug;

use super::hashing::fingerprint;
use super::paths;
use crate::storage::{DependencyEdge, RelationKind};
use aviary_context::{ProcessedChunk, Skeleton, SourceAnalysis};

/// Everything the indexer needs to know about one analyzed file.
#[derive(Debug, Clone)]
pub struct FileAnalysis {
    /// Normalized root-relative path.
    pub path: String,
    /// 128-bit content fingerprint, hex encoded.
    pub hash: String,
    pub chunks: Vec<ProcessedChunk>,
    pub edges: Vec<DependencyEdge>,
    pub skeleton: Skeleton,
}

/// Analyze one file: classify and chunk it via the AST, then resolve its
/// relative import specifiers to physical files. Package and alias specifiers
/// are dropped; unresolvable relative specifiers drop their edge.
pub fn analyze_file(
    root: &Path,
    relative_path: &str,
    content: &str,
    source_extension: &str,
) -> Result<FileAnalysis> {
    let path = paths::normalize_relative(relative_path);
    let analysis: SourceAnalysis = aviary_context::analyze_source(&path, content)?;

    let mut edges = Vec::new();
    for specifier in &analysis.import_specifiers {
        if !specifier.starts_with('.') {
            continue;
        }
        match paths::resolve_import(root, &path, specifier, source_extension) {
            Some(target) => edges.push(DependencyEdge {
                source: path.clone(),
                target,
                relation: RelationKind::Import,
            }),
            None => debug!("dropping unresolved import {specifier} in {path}"),
        }
    }

    Ok(FileAnalysis {
        hash: fingerprint(content.as_bytes()),
        chunks: analysis.chunks,
        edges,
        skeleton: analysis.skeleton,
        path,
    })
}
