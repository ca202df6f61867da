//! The indexing orchestrator and public engine façade.
//!
//! `index_project` brings the store into sync with the on-disk tree in three
//! passes:
//!
//! 1. **Pass A (analyze & register).** Changed files are read, hashed and
//!    analyzed; each file's registry row (with its fresh skeleton) is
//!    upserted before its edges or chunks are buffered, so every persisted
//!    edge has a registered source.
//! 2. **Pass B (persist graph).** All buffered edges go into one
//!    insert-or-ignore transaction, ahead of the long embedding phase so the
//!    graph is queryable while vectors are still in flight.
//! 3. **Pass C (embed & persist chunks).** The chunk buffer is embedded in
//!    fixed-size batches; each batch is upserted in its own transaction, and
//!    a failed batch is logged and skipped without aborting the run.
//!
//! Single-file failures (unreadable, unparsable) are logged and skipped; the
//! registry row is left untouched so the next run retries them.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::analyzer;
use super::file_registry::FileRegistry;
use super::graph::{Direction, DependencyRef, GraphQuery};
use super::paths;
use super::search::{Retriever, SearchHit};
use crate::storage::sqlite_store::SqliteStore;
use crate::storage::{DependencyEdge, StoredChunk};
use aviary_context::{ProcessedChunk, Skeleton};
use aviary_embed::EmbeddingProvider;

/// Configuration for the knowledge engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Project root; the store lives under `<root>/.agent`.
    pub root: PathBuf,
    /// Directory scanned for sources, relative to the root.
    pub source_dir: String,
    /// Source file extension, without the dot.
    pub source_extension: String,
    /// File-name suffix excluding co-located test specs.
    pub spec_suffix: String,
    /// Number of chunks embedded per backend request.
    pub embed_batch_size: usize,
}

impl EngineConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            source_dir: "src".to_string(),
            source_extension: "ts".to_string(),
            spec_suffix: ".spec.ts".to_string(),
            embed_batch_size: 10,
        }
    }

    pub fn with_source_dir(mut self, source_dir: impl Into<String>) -> Self {
        self.source_dir = source_dir.into();
        self
    }

    pub fn with_embed_batch_size(mut self, batch_size: usize) -> Self {
        self.embed_batch_size = batch_size.max(1);
        self
    }

    /// Whether a file name is a candidate source: right extension, not a
    /// co-located test spec. The spec rule is by suffix only, regardless of
    /// directory.
    fn is_candidate(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        name.ends_with(&format!(".{}", self.source_extension))
            && !name.ends_with(&self.spec_suffix)
    }
}

/// Counters for one `index_project` run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessingStats {
    /// Candidate files found under the source directory.
    pub files_scanned: usize,
    /// Changed files successfully analyzed and registered.
    pub files_analyzed: usize,
    /// Edges handed to the graph pass (before dedup by the unique key).
    pub edges_recorded: usize,
    /// Chunks embedded and persisted.
    pub chunks_embedded: usize,
    /// Logged-and-skipped failures of any kind.
    pub errors: usize,
}

/// The engine façade: indexing plus the query-side operations.
pub struct KnowledgeEngine {
    config: EngineConfig,
    store: SqliteStore,
    registry: FileRegistry,
    provider: Arc<dyn EmbeddingProvider>,
}

impl KnowledgeEngine {
    /// Open the engine over the persistent store under the project root.
    pub async fn new(config: EngineConfig, provider: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        let store = SqliteStore::open(&config.root).await?;
        Ok(Self::with_store(config, provider, store))
    }

    /// Engine over an in-memory store, for tests.
    pub async fn new_memory(
        config: EngineConfig,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        let store = SqliteStore::open_memory().await?;
        Ok(Self::with_store(config, provider, store))
    }

    fn with_store(
        config: EngineConfig,
        provider: Arc<dyn EmbeddingProvider>,
        store: SqliteStore,
    ) -> Self {
        let registry = FileRegistry::new(config.root.clone(), store.clone());
        Self {
            config,
            store,
            registry,
            provider,
        }
    }

    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    /// Idempotently bring the store into sync with the on-disk tree.
    pub async fn index_project(&self) -> Result<ProcessingStats> {
        let source_root = self.config.root.join(&self.config.source_dir);
        info!(
            "Indexing {} (provider: {})",
            source_root.display(),
            self.provider.provider_name()
        );

        let mut stats = ProcessingStats::default();
        let candidates = self.enumerate_sources(&source_root).await?;
        stats.files_scanned = candidates.len();

        // Pass A: analyze changed files and register them.
        let mut edge_buffer: Vec<DependencyEdge> = Vec::new();
        let mut chunk_buffer: Vec<(String, ProcessedChunk)> = Vec::new();
        for relative in candidates {
            match self.registry.is_changed(&relative).await {
                Ok(false) => continue,
                Ok(true) => {}
                Err(e) => {
                    warn!("change check failed for {relative}: {e:#}");
                    stats.errors += 1;
                    continue;
                }
            }

            let content = match tokio::fs::read_to_string(self.config.root.join(&relative)).await {
                Ok(content) => content,
                Err(e) => {
                    warn!("failed to read {relative}: {e}");
                    stats.errors += 1;
                    continue;
                }
            };
            let analysis = match analyzer::analyze_file(
                &self.config.root,
                &relative,
                &content,
                &self.config.source_extension,
            ) {
                Ok(analysis) => analysis,
                Err(e) => {
                    // Registry row stays stale so the next run retries.
                    warn!("skipping {relative}: {e:#}");
                    stats.errors += 1;
                    continue;
                }
            };

            if let Err(e) = self.registry.update(&analysis.path, analysis.skeleton).await {
                error!("failed to register {}: {e:#}", analysis.path);
                stats.errors += 1;
                continue;
            }
            // Chunk ids are regenerated per run; drop the previous generation.
            if let Err(e) = self.store.delete_chunks_for_file(&analysis.path).await {
                warn!("failed to drop stale chunks of {}: {e:#}", analysis.path);
                stats.errors += 1;
            }

            debug!(
                "analyzed {} ({} chunks, {} edges)",
                analysis.path,
                analysis.chunks.len(),
                analysis.edges.len()
            );
            edge_buffer.extend(analysis.edges);
            let path = analysis.path;
            chunk_buffer.extend(analysis.chunks.into_iter().map(|c| (path.clone(), c)));
            stats.files_analyzed += 1;
        }

        // Pass B: persist the dependency graph before the embedding phase.
        if !edge_buffer.is_empty() {
            match self.store.insert_edges(&edge_buffer).await {
                Ok(()) => stats.edges_recorded = edge_buffer.len(),
                Err(e) => {
                    error!("failed to persist dependency edges: {e:#}");
                    stats.errors += 1;
                }
            }
        }

        // Pass C: embed and persist chunks batch by batch.
        for batch in chunk_buffer.chunks(self.config.embed_batch_size) {
            let inputs: Vec<String> = batch
                .iter()
                .map(|(_, chunk)| embedding_input(chunk))
                .collect();
            let vectors = match self.provider.embed_texts(&inputs).await {
                Ok(vectors) => vectors,
                Err(e) => {
                    error!("embedding batch failed: {e}");
                    stats.errors += 1;
                    continue;
                }
            };
            if vectors.len() != batch.len() {
                error!(
                    "embedding batch returned {} vectors for {} chunks",
                    vectors.len(),
                    batch.len()
                );
                stats.errors += 1;
                continue;
            }

            let stored: Vec<StoredChunk> = batch
                .iter()
                .zip(vectors)
                .map(|((path, chunk), vector)| StoredChunk {
                    id: chunk.id,
                    file_path: path.clone(),
                    kind: chunk.kind,
                    content: chunk.content.clone(),
                    parent_id: chunk.parent_id,
                    vector,
                    metadata: chunk.metadata.clone(),
                })
                .collect();
            match self.store.upsert_chunks(&stored).await {
                Ok(()) => stats.chunks_embedded += stored.len(),
                Err(e) => {
                    error!("failed to persist chunk batch: {e:#}");
                    stats.errors += 1;
                }
            }
        }

        info!(
            "Indexing complete: {}/{} files analyzed, {} chunks embedded, {} errors",
            stats.files_analyzed, stats.files_scanned, stats.chunks_embedded, stats.errors
        );
        Ok(stats)
    }

    /// Top-`limit` chunks for a natural-language query.
    pub async fn query(&self, text: &str, limit: usize) -> Result<Vec<SearchHit>> {
        self.retriever().query(text, limit).await
    }

    /// Formatted context report for a query.
    pub async fn context_report(&self, text: &str) -> Result<String> {
        self.retriever().context_report(text).await
    }

    /// Rendered skeleton for one file plus a usage tip.
    pub async fn analyze_structure(&self, path: &str) -> Result<String> {
        self.ensure_in_root(path)?;
        self.retriever().analyze_structure(path).await
    }

    /// 1-hop dependency lookup in either direction.
    pub async fn dependencies_of(
        &self,
        path: &str,
        direction: Direction,
    ) -> Result<Vec<DependencyRef>> {
        self.ensure_in_root(path)?;
        GraphQuery::new(self.store.clone())
            .dependencies_of(path, direction)
            .await
    }

    /// Stored skeleton for one file, if any.
    pub async fn skeleton(&self, path: &str) -> Result<Option<Skeleton>> {
        self.ensure_in_root(path)?;
        self.registry.skeleton(path).await
    }

    fn retriever(&self) -> Retriever {
        Retriever::new(
            self.store.clone(),
            self.provider.clone(),
            self.registry.clone(),
        )
    }

    fn ensure_in_root(&self, path: &str) -> Result<()> {
        paths::resolve_within_root(&self.config.root, Path::new(&paths::to_forward_slashes(path)))
            .map(|_| ())
    }

    /// Candidate source files under `source_root`, in directory-walk order.
    async fn enumerate_sources(&self, source_root: &Path) -> Result<Vec<String>> {
        let mut found = Vec::new();
        if !source_root.is_dir() {
            debug!("source directory {} does not exist", source_root.display());
            return Ok(found);
        }

        let mut dir_stack = vec![source_root.to_path_buf()];
        while let Some(current_dir) = dir_stack.pop() {
            let mut read_dir = match tokio::fs::read_dir(&current_dir).await {
                Ok(read_dir) => read_dir,
                Err(e) => {
                    warn!("failed to read directory {}: {e}", current_dir.display());
                    continue;
                }
            };
            while let Some(entry) = read_dir.next_entry().await? {
                let path = entry.path();
                let Ok(file_type) = entry.file_type().await else {
                    continue;
                };
                if file_type.is_dir() {
                    dir_stack.push(path);
                } else if file_type.is_file() && self.config.is_candidate(&path) {
                    found.push(paths::relative_to_root(&self.config.root, &path)?);
                }
            }
        }
        Ok(found)
    }
}

/// Embedding input for one chunk: a structural prefix lifts the semantic
/// weight of the fragment so queries about *what* is sought reach terse code.
/// The stored content stays raw; only the embedded text is prefixed.
pub fn embedding_input(chunk: &ProcessedChunk) -> String {
    if let Some(method) = &chunk.metadata.method_name {
        format!("Method: {method}\n{}", chunk.content)
    } else if let Some(class) = &chunk.metadata.class_name {
        format!("Class: {class}\n{}", chunk.content)
    } else {
        chunk.content.clone()
    }
}
