//! 1-hop dependency graph lookups.
//!
//! The edge set is a directed multigraph and may contain cycles (module A
//! importing module B importing module A is legal in the target ecosystem);
//! queries here never traverse beyond one hop.

use anyhow::Result;

use super::paths;
use crate::storage::sqlite_store::SqliteStore;
use crate::storage::RelationKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outbound,
    Inbound,
}

/// One neighbor of a file in the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRef {
    pub other: String,
    pub relation: RelationKind,
}

#[derive(Clone, Debug)]
pub struct GraphQuery {
    store: SqliteStore,
}

impl GraphQuery {
    pub fn new(store: SqliteStore) -> Self {
        Self { store }
    }

    /// Edges touching `path`. Both the forward-slash-normalized and the
    /// caller-supplied form are tried, to tolerate mixed storage.
    pub async fn dependencies_of(
        &self,
        path: &str,
        direction: Direction,
    ) -> Result<Vec<DependencyRef>> {
        let normalized = paths::normalize_relative(path);
        let mut candidates = vec![normalized];
        if !candidates.contains(&path.to_string()) {
            candidates.push(path.to_string());
        }

        let mut refs: Vec<DependencyRef> = Vec::new();
        for candidate in &candidates {
            let edges = match direction {
                Direction::Outbound => self.store.edges_from(candidate).await?,
                Direction::Inbound => self.store.edges_to(candidate).await?,
            };
            for edge in edges {
                let dependency = DependencyRef {
                    other: match direction {
                        Direction::Outbound => edge.target,
                        Direction::Inbound => edge.source,
                    },
                    relation: edge.relation,
                };
                if !refs.contains(&dependency) {
                    refs.push(dependency);
                }
            }
        }
        Ok(refs)
    }
}
