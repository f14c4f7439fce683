//! `civic index`: embed store documents into the vector index.
//!
//! Documents already present in the index are skipped unless `--full` is
//! given. Texts are embedded in `embedding.batch_size` batches and written
//! in upsert batches of [`UPSERT_BATCH`].

use std::collections::HashSet;

use anyhow::{bail, Result};
use tracing::warn;

use civic_desk_core::embedding::EmbeddingProvider;
use civic_desk_core::index::{IndexEntry, VectorIndex};
use civic_desk_core::models::{Document, IndexMetadata};
use civic_desk_core::store::DocumentStore;

use crate::config::Config;
use crate::store::JsonDocumentStore;
use crate::{embedding, index};

/// Vectors per upsert request.
pub const UPSERT_BATCH: usize = 100;

/// Counters reported by an indexing run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IndexStats {
    pub total: usize,
    pub skipped: usize,
    pub embedded: usize,
    pub failed: usize,
}

pub async fn run_index(config: &Config, full: bool, dry_run: bool) -> Result<()> {
    if !config.embedding.is_enabled() {
        bail!("Embedding provider is disabled. Set [embedding] provider in config.");
    }

    let provider = embedding::create_provider(&config.embedding)?;
    let index = index::create_index(&config.index).await?;
    let store = JsonDocumentStore::from_config(&config.store);

    let stats = index_documents(
        &store,
        provider.as_ref(),
        index.as_ref(),
        config.embedding.batch_size,
        full,
        dry_run,
    )
    .await?;

    if dry_run {
        println!("index (dry-run)");
        println!("  documents: {}", stats.total);
        println!("  already indexed: {}", stats.skipped);
        println!("  to embed: {}", stats.total - stats.skipped);
        return Ok(());
    }

    println!("index");
    println!("  documents: {}", stats.total);
    println!("  already indexed: {}", stats.skipped);
    println!("  embedded: {}", stats.embedded);
    println!("  failed: {}", stats.failed);
    Ok(())
}

/// Embed and upsert every document not yet in the index.
pub async fn index_documents(
    store: &dyn DocumentStore,
    provider: &dyn EmbeddingProvider,
    index: &dyn VectorIndex,
    batch_size: usize,
    full: bool,
    dry_run: bool,
) -> Result<IndexStats> {
    let docs = dedup_by_id(store.load_all().await?);
    let mut stats = IndexStats {
        total: docs.len(),
        ..Default::default()
    };

    let existing = if full {
        HashSet::new()
    } else {
        let ids: Vec<String> = docs.iter().map(|d| d.id.clone()).collect();
        let mut found = HashSet::new();
        for batch in ids.chunks(UPSERT_BATCH) {
            found.extend(index.existing_ids(batch).await?);
        }
        found
    };

    let pending: Vec<&Document> = docs.iter().filter(|d| !existing.contains(&d.id)).collect();
    stats.skipped = stats.total - pending.len();
    if dry_run || pending.is_empty() {
        return Ok(stats);
    }

    let mut buffer: Vec<IndexEntry> = Vec::with_capacity(UPSERT_BATCH);
    for batch in pending.chunks(batch_size.max(1)) {
        let texts: Vec<String> = batch.iter().map(|d| d.embedding_text()).collect();
        match provider.embed(&texts).await {
            Ok(vectors) if vectors.len() == batch.len() => {
                for (doc, vector) in batch.iter().zip(vectors) {
                    buffer.push(IndexEntry {
                        id: doc.id.clone(),
                        vector,
                        metadata: IndexMetadata::from_document(doc),
                    });
                    if buffer.len() >= UPSERT_BATCH {
                        index.upsert(&buffer).await?;
                        stats.embedded += buffer.len();
                        buffer.clear();
                    }
                }
            }
            Ok(vectors) => {
                warn!(
                    expected = batch.len(),
                    got = vectors.len(),
                    "embedding batch returned the wrong number of vectors"
                );
                stats.failed += batch.len();
            }
            Err(e) => {
                warn!(error = %e, size = batch.len(), "embedding batch failed");
                stats.failed += batch.len();
            }
        }
    }
    if !buffer.is_empty() {
        index.upsert(&buffer).await?;
        stats.embedded += buffer.len();
    }

    Ok(stats)
}

/// Keep the first record for each id, in store order.
fn dedup_by_id(docs: Vec<Document>) -> Vec<Document> {
    let mut seen = HashSet::new();
    docs.into_iter()
        .filter(|d| seen.insert(d.id.clone()))
        .collect()
}
