//! Query-time retrieval: vector search and context enrichment.
//!
//! The scan is linear over every stored vector. At project scale (hundreds to
//! low thousands of chunks) this stays fast, dependency-free and
//! deterministic; an ANN index could replace it without changing the
//! contract.

use anyhow::{bail, Result};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

use super::file_registry::FileRegistry;
use super::graph::{Direction, GraphQuery};
use super::paths;
use super::report::{self, FileSection, Snippet};
use super::vector_math::cosine_similarity;
use crate::storage::sqlite_store::SqliteStore;
use crate::storage::StoredChunk;
use aviary_embed::EmbeddingProvider;

const CLASS_STRUCTURE_LABEL: &str = "Class Structure";
const REPORT_HIT_LIMIT: usize = 4;

/// One scored retrieval result.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub score: f32,
    pub chunk: StoredChunk,
}

pub struct Retriever {
    store: SqliteStore,
    provider: Arc<dyn EmbeddingProvider>,
    registry: FileRegistry,
    graph: GraphQuery,
}

impl Retriever {
    pub fn new(
        store: SqliteStore,
        provider: Arc<dyn EmbeddingProvider>,
        registry: FileRegistry,
    ) -> Self {
        Self {
            graph: GraphQuery::new(store.clone()),
            store,
            provider,
            registry,
        }
    }

    /// Embed the query and score every stored chunk by cosine similarity.
    /// Returns the top `limit` hits; ties keep insertion order.
    pub async fn query(&self, text: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let vectors = self.provider.embed_texts(&[text.to_string()]).await?;
        let Some(query_vector) = vectors.into_iter().next() else {
            bail!("embedding backend returned no vector for the query");
        };

        let chunks = self.store.all_chunks().await?;
        debug!("scoring {} chunks for query", chunks.len());

        let mut hits = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let score = cosine_similarity(&query_vector, &chunk.vector)?;
            hits.push(SearchHit { score, chunk });
        }
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        hits.truncate(limit);
        Ok(hits)
    }

    /// Rich context for a query: top hits grouped by file and enriched with
    /// the file's outbound imports and stored skeleton.
    pub async fn context_report(&self, text: &str) -> Result<String> {
        let hits = self.query(text, REPORT_HIT_LIMIT).await?;

        let mut sections: Vec<FileSection> = Vec::new();
        for hit in &hits {
            let snippet = Snippet {
                label: hit
                    .chunk
                    .metadata
                    .method_name
                    .clone()
                    .unwrap_or_else(|| CLASS_STRUCTURE_LABEL.to_string()),
                content: hit.chunk.content.trim().to_string(),
            };
            match sections
                .iter_mut()
                .find(|section| section.path == hit.chunk.file_path)
            {
                Some(section) => {
                    section.relevance = section.relevance.max(hit.score);
                    section.snippets.push(snippet);
                }
                None => sections.push(FileSection {
                    path: hit.chunk.file_path.clone(),
                    relevance: hit.score,
                    imports: Vec::new(),
                    skeleton: None,
                    snippets: vec![snippet],
                }),
            }
        }

        for section in &mut sections {
            section.imports = self
                .graph
                .dependencies_of(&section.path, Direction::Outbound)
                .await?
                .into_iter()
                .map(|dependency| dependency.other)
                .collect();
            section.skeleton = self.registry.skeleton(&section.path).await?;
        }
        sections.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(Ordering::Equal)
        });

        Ok(report::format_context_report(text, &sections))
    }

    /// Rendered skeleton for one file, for targeted structural introspection.
    pub async fn analyze_structure(&self, path: &str) -> Result<String> {
        let normalized = paths::normalize_relative(path);
        match self.registry.skeleton(&normalized).await? {
            Some(skeleton) => Ok(format!(
                "Skeleton for {normalized}:\n{}\n\n💡 Tip: query a method name to retrieve its implementation chunk.",
                skeleton.to_string().trim_end()
            )),
            None => Ok(format!(
                "No skeleton stored for {normalized}. Index the project first."
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FileRecord;
    use aviary_context::{ChunkKind, ChunkMetadata};
    use aviary_embed::MockEmbedProvider;
    use tempfile::tempdir;
    use uuid::Uuid;

    async fn retriever_with_chunks(contents: &[(&str, &str)]) -> (Retriever, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open_memory().await.unwrap();
        let provider = Arc::new(MockEmbedProvider::new());

        store
            .upsert_file(&FileRecord {
                path: "src/users.service.ts".to_string(),
                hash: "0".repeat(32),
                last_indexed: 0,
                skeleton: None,
            })
            .await
            .unwrap();

        let texts: Vec<String> = contents.iter().map(|(_, c)| c.to_string()).collect();
        let vectors = provider.embed_texts(&texts).await.unwrap();
        let chunks: Vec<StoredChunk> = contents
            .iter()
            .zip(vectors)
            .map(|((name, content), vector)| StoredChunk {
                id: Uuid::new_v4(),
                file_path: "src/users.service.ts".to_string(),
                kind: ChunkKind::Method,
                content: content.to_string(),
                parent_id: None,
                vector,
                metadata: ChunkMetadata {
                    start_line: 1,
                    end_line: 1,
                    class_name: Some("UsersService".to_string()),
                    method_name: Some(name.to_string()),
                    decorators: None,
                },
            })
            .collect();
        store.upsert_chunks(&chunks).await.unwrap();

        let registry = FileRegistry::new(dir.path().to_path_buf(), store.clone());
        (Retriever::new(store, provider, registry), dir)
    }

    #[tokio::test]
    async fn query_ranks_shared_vocabulary_first() {
        let (retriever, _dir) = retriever_with_chunks(&[
            ("findAll", "findAll() { return this.usersRepository.find(); }"),
            (
                "create",
                "create(dto: CreateUserDto) { return this.usersRepository.save(dto); }",
            ),
        ])
        .await;

        let hits = retriever.query("create user with repository", 5).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.metadata.method_name.as_deref(), Some("create"));
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn query_respects_limit() {
        let (retriever, _dir) = retriever_with_chunks(&[
            ("a", "alpha beta"),
            ("b", "beta gamma"),
            ("c", "gamma delta"),
        ])
        .await;

        let hits = retriever.query("beta", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn analyze_structure_reports_missing_skeleton() {
        let (retriever, _dir) = retriever_with_chunks(&[]).await;
        let rendered = retriever
            .analyze_structure("src\\unknown.service.ts")
            .await
            .unwrap();
        assert!(rendered.contains("No skeleton stored for src/unknown.service.ts"));
    }
}
