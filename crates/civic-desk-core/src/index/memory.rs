//! In-memory [`VectorIndex`] implementation for tests and small deployments.
//!
//! Uses a `Vec` behind `std::sync::RwLock`. Queries are brute-force cosine
//! similarity over every stored vector.

use std::collections::HashSet;
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::models::IndexMatch;

use super::{IndexEntry, VectorIndex};

/// In-memory vector index.
pub struct InMemoryIndex {
    entries: RwLock<Vec<IndexEntry>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow::anyhow!("in-memory index lock poisoned")
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    fn backend(&self) -> &str {
        "memory"
    }

    async fn upsert(&self, entries: &[IndexEntry]) -> Result<()> {
        let mut stored = self.entries.write().map_err(poisoned)?;
        for entry in entries {
            match stored.iter_mut().find(|e| e.id == entry.id) {
                Some(existing) => *existing = entry.clone(),
                None => stored.push(entry.clone()),
            }
        }
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>> {
        let stored = self.entries.read().map_err(poisoned)?;
        let mut matches: Vec<IndexMatch> = stored
            .iter()
            .map(|e| IndexMatch {
                id: e.id.clone(),
                score: cosine_similarity(vector, &e.vector),
                metadata: e.metadata.clone(),
            })
            .collect();
        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn existing_ids(&self, ids: &[String]) -> Result<HashSet<String>> {
        let stored = self.entries.read().map_err(poisoned)?;
        Ok(stored
            .iter()
            .filter(|e| ids.contains(&e.id))
            .map(|e| e.id.clone())
            .collect())
    }
}
