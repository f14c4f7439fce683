//! Vector index abstraction.
//!
//! The [`VectorIndex`] trait is the contract every similarity backend
//! implements (SQLite and Pinecone in the app crate, [`memory::InMemoryIndex`]
//! here). Indexes store `(id, vector, metadata)` triples and answer top-K
//! nearest-neighbour queries with the stored metadata attached.

pub mod memory;

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{IndexMatch, IndexMetadata};

/// One vector to write into an index.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: IndexMetadata,
}

/// Abstract vector index.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`upsert`](VectorIndex::upsert) | Insert or replace entries by id |
/// | [`query`](VectorIndex::query) | Top-K matches by similarity, best first |
/// | [`existing_ids`](VectorIndex::existing_ids) | Which of the given ids are already stored |
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Short backend name for logs (e.g. `"sqlite"`).
    fn backend(&self) -> &str;

    /// Insert or replace entries, keyed by id.
    async fn upsert(&self, entries: &[IndexEntry]) -> Result<()>;

    /// Return up to `top_k` matches ordered by descending score.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>>;

    /// Return the subset of `ids` already present in the index.
    async fn existing_ids(&self, ids: &[String]) -> Result<HashSet<String>>;
}
