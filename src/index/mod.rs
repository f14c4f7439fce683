//! Vector index backends.
//!
//! | Backend | Type |
//! |---------|------|
//! | `sqlite` | [`sqlite::SqliteIndex`] (brute-force cosine over BLOB vectors) |
//! | `pinecone` | [`pinecone::PineconeIndex`] (HTTP data plane) |

pub mod pinecone;
pub mod sqlite;

use std::sync::Arc;

use anyhow::{bail, Result};

use civic_desk_core::index::VectorIndex;

use crate::config::IndexConfig;

/// Open the index backend named by the configuration.
pub async fn create_index(config: &IndexConfig) -> Result<Arc<dyn VectorIndex>> {
    match config.backend.as_str() {
        "sqlite" => Ok(Arc::new(sqlite::SqliteIndex::open(&config.path).await?)),
        "pinecone" => Ok(Arc::new(pinecone::PineconeIndex::new(config)?)),
        other => bail!("Unknown index backend: {}", other),
    }
}
