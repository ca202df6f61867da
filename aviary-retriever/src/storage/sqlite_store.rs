//! SQLite implementation of the three core relations.
//!
//! The database file lives at `<root>/.agent/knowledge.db` and is created
//! together with its directory on first use. WAL journaling keeps write
//! throughput reasonable while queries interleave with indexing runs.
//!
//! Transaction grouping follows the indexing passes: all dependency edges of
//! a run go in one transaction, and each embedding batch is upserted in its
//! own transaction, so an aborted pass leaves no partial batch behind.

use anyhow::{anyhow, Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use uuid::Uuid;

use super::{DependencyEdge, FileRecord, RelationKind, StoreStats, StoredChunk};
use aviary_context::ChunkKind;

const STORE_DIR: &str = ".agent";
const STORE_FILE: &str = "knowledge.db";

/// Handle to the embedded store. Cheap to clone; clones share the pool.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (and if needed create) the store under the given project root.
    pub async fn open(root: &Path) -> Result<Self> {
        let dir = root.join(STORE_DIR);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create store directory {}", dir.display()))?;

        let pool = SqlitePool::connect_with(
            SqliteConnectOptions::new()
                .filename(dir.join(STORE_FILE))
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
                .busy_timeout(std::time::Duration::from_secs(5))
                .foreign_keys(true)
                .create_if_missing(true),
        )
        .await?;
        Self::new_with_pool(pool).await
    }

    /// In-memory store for tests. A single connection keeps every query on
    /// the same database instance.
    pub async fn open_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::new_with_pool(pool).await
    }

    async fn new_with_pool(pool: SqlitePool) -> Result<Self> {
        Self::create_tables(&pool).await?;
        Ok(Self { pool })
    }

    async fn create_tables(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS files (
                path TEXT PRIMARY KEY,
                hash TEXT NOT NULL,
                last_indexed INTEGER NOT NULL,
                skeleton TEXT
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS edges (
                source TEXT NOT NULL,
                target TEXT NOT NULL,
                relation TEXT NOT NULL,
                UNIQUE(source, target, relation),
                FOREIGN KEY (source) REFERENCES files(path) ON DELETE CASCADE
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                id TEXT PRIMARY KEY,
                file_path TEXT NOT NULL,
                kind TEXT NOT NULL,
                content TEXT NOT NULL,
                parent_id TEXT,
                vector TEXT NOT NULL,
                metadata TEXT NOT NULL,
                FOREIGN KEY (file_path) REFERENCES files(path) ON DELETE CASCADE
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(source)")
            .execute(pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_file_path ON chunks(file_path)")
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Insert or update a registry row.
    pub async fn upsert_file(&self, record: &FileRecord) -> Result<()> {
        let skeleton = record
            .skeleton
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO files (path, hash, last_indexed, skeleton)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(path) DO UPDATE SET
                hash = excluded.hash,
                last_indexed = excluded.last_indexed,
                skeleton = excluded.skeleton
            "#,
        )
        .bind(&record.path)
        .bind(&record.hash)
        .bind(record.last_indexed)
        .bind(skeleton)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_file(&self, path: &str) -> Result<Option<FileRecord>> {
        let row = sqlx::query("SELECT path, hash, last_indexed, skeleton FROM files WHERE path = ?1")
            .bind(path)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let skeleton: Option<String> = row.get("skeleton");
        let skeleton = skeleton
            .map(|s| serde_json::from_str(&s))
            .transpose()
            .with_context(|| format!("corrupt skeleton document for {path}"))?;

        Ok(Some(FileRecord {
            path: row.get("path"),
            hash: row.get("hash"),
            last_indexed: row.get("last_indexed"),
            skeleton,
        }))
    }

    /// Persist a run's dependency edges in one transaction. Duplicates of the
    /// (source, target, relation) key are silently ignored.
    pub async fn insert_edges(&self, edges: &[DependencyEdge]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for edge in edges {
            sqlx::query(
                "INSERT OR IGNORE INTO edges (source, target, relation) VALUES (?1, ?2, ?3)",
            )
            .bind(&edge.source)
            .bind(&edge.target)
            .bind(edge.relation.as_str())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn edges_from(&self, source: &str) -> Result<Vec<DependencyEdge>> {
        let rows = sqlx::query("SELECT source, target, relation FROM edges WHERE source = ?1")
            .bind(source)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(edge_from_row).collect()
    }

    pub async fn edges_to(&self, target: &str) -> Result<Vec<DependencyEdge>> {
        let rows = sqlx::query("SELECT source, target, relation FROM edges WHERE target = ?1")
            .bind(target)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(edge_from_row).collect()
    }

    /// Upsert one embedding batch of chunks in a single transaction.
    pub async fn upsert_chunks(&self, chunks: &[StoredChunk]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for chunk in chunks {
            let vector = serde_json::to_string(&chunk.vector)?;
            let metadata = serde_json::to_string(&chunk.metadata)?;
            sqlx::query(
                r#"
                INSERT INTO chunks (id, file_path, kind, content, parent_id, vector, metadata)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(id) DO UPDATE SET
                    file_path = excluded.file_path,
                    kind = excluded.kind,
                    content = excluded.content,
                    parent_id = excluded.parent_id,
                    vector = excluded.vector,
                    metadata = excluded.metadata
                "#,
            )
            .bind(chunk.id.to_string())
            .bind(&chunk.file_path)
            .bind(chunk.kind.as_str())
            .bind(&chunk.content)
            .bind(chunk.parent_id.map(|id| id.to_string()))
            .bind(vector)
            .bind(metadata)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Remove all chunks belonging to a file. Used when a changed file is
    /// re-analyzed, since chunk ids are regenerated per run.
    pub async fn delete_chunks_for_file(&self, path: &str) -> Result<usize> {
        let result = sqlx::query("DELETE FROM chunks WHERE file_path = ?1")
            .bind(path)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() as usize)
    }

    /// Every stored chunk, in insertion order.
    pub async fn all_chunks(&self) -> Result<Vec<StoredChunk>> {
        let rows = sqlx::query(
            "SELECT id, file_path, kind, content, parent_id, vector, metadata
             FROM chunks ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(chunk_from_row).collect()
    }

    pub async fn stats(&self) -> Result<StoreStats> {
        let files: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files")
            .fetch_one(&self.pool)
            .await?;
        let edges: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM edges")
            .fetch_one(&self.pool)
            .await?;
        let chunks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        Ok(StoreStats {
            files: files as usize,
            edges: edges as usize,
            chunks: chunks as usize,
        })
    }
}

fn edge_from_row(row: sqlx::sqlite::SqliteRow) -> Result<DependencyEdge> {
    let relation: String = row.get("relation");
    Ok(DependencyEdge {
        source: row.get("source"),
        target: row.get("target"),
        relation: RelationKind::parse(&relation)
            .ok_or_else(|| anyhow!("unknown edge relation {relation}"))?,
    })
}

fn chunk_from_row(row: sqlx::sqlite::SqliteRow) -> Result<StoredChunk> {
    let id: String = row.get("id");
    let kind: String = row.get("kind");
    let parent_id: Option<String> = row.get("parent_id");
    let vector: String = row.get("vector");
    let metadata: String = row.get("metadata");

    Ok(StoredChunk {
        id: Uuid::parse_str(&id)?,
        file_path: row.get("file_path"),
        kind: ChunkKind::parse(&kind).ok_or_else(|| anyhow!("unknown chunk kind {kind}"))?,
        content: row.get("content"),
        parent_id: parent_id.map(|p| Uuid::parse_str(&p)).transpose()?,
        vector: serde_json::from_str(&vector)?,
        metadata: serde_json::from_str(&metadata)?,
    })
}
