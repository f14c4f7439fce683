//! Document store abstraction.
//!
//! The document store is the flat collection of records the site publishes.
//! It is read wholesale for fallback scans and "latest" lookups, and by id
//! for conversation continuations. The serving path never writes to it.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::Document;

/// Read-only access to the persisted document collection.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Load every document, in store order.
    async fn load_all(&self) -> Result<Vec<Document>>;

    /// Look a document up by identifier.
    ///
    /// The default implementation scans [`load_all`](DocumentStore::load_all)
    /// and returns the first record with a matching id.
    async fn find(&self, id: &str) -> Result<Option<Document>> {
        let docs = self.load_all().await?;
        Ok(docs.into_iter().find(|d| d.id == id))
    }
}
