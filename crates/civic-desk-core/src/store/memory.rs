//! In-memory [`DocumentStore`] for tests and embedding callers.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::Document;

use super::DocumentStore;

/// A fixed, in-memory document collection.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocumentStore {
    docs: Vec<Document>,
}

impl InMemoryDocumentStore {
    pub fn new(docs: Vec<Document>) -> Self {
        Self { docs }
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn load_all(&self) -> Result<Vec<Document>> {
        Ok(self.docs.clone())
    }
}
