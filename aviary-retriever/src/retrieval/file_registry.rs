//! Hash-based change detection over the file registry.
//!
//! Hashing is cheaper than parsing, and comparing fingerprints keeps
//! `index_project` idempotent across runs: unchanged files are skipped
//! without ever being re-analyzed.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use super::hashing::fingerprint;
use super::paths;
use crate::storage::sqlite_store::SqliteStore;
use crate::storage::FileRecord;
use aviary_context::Skeleton;

#[derive(Clone, Debug)]
pub struct FileRegistry {
    root: PathBuf,
    store: SqliteStore,
}

impl FileRegistry {
    pub fn new(root: PathBuf, store: SqliteStore) -> Self {
        Self { root, store }
    }

    /// True when the file is new, its content hash differs from the stored
    /// one, or it can no longer be read (missing files need attention too).
    pub async fn is_changed(&self, path: &str) -> Result<bool> {
        let normalized = paths::normalize_relative(path);
        let Some(record) = self.store.get_file(&normalized).await? else {
            return Ok(true);
        };
        match tokio::fs::read(self.root.join(&normalized)).await {
            Ok(content) => Ok(fingerprint(&content) != record.hash),
            Err(_) => Ok(true),
        }
    }

    /// Re-read the file, recompute its hash and upsert the registry row with
    /// the fresh skeleton and the current timestamp.
    pub async fn update(&self, path: &str, skeleton: Skeleton) -> Result<()> {
        let normalized = paths::normalize_relative(path);
        let content = tokio::fs::read(self.root.join(&normalized))
            .await
            .with_context(|| format!("failed to read {normalized} for registration"))?;

        self.store
            .upsert_file(&FileRecord {
                path: normalized,
                hash: fingerprint(&content),
                last_indexed: now_epoch(),
                skeleton: Some(skeleton),
            })
            .await
    }

    /// Stored skeleton for a path in either native or forward-slash form.
    pub async fn skeleton(&self, path: &str) -> Result<Option<Skeleton>> {
        let normalized = paths::normalize_relative(path);
        Ok(self
            .store
            .get_file(&normalized)
            .await?
            .and_then(|record| record.skeleton))
    }
}

fn now_epoch() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
