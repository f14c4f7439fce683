//! `civic search`: list raw index matches for a query.
//!
//! A debugging aid for retrieval quality: prints each match's id, score and
//! a short preview, and optionally flags which matches contain a keyword.

use anyhow::{bail, Result};

use civic_desk_core::embedding::{embed_query, EmbeddingProvider};
use civic_desk_core::index::VectorIndex;
use civic_desk_core::models::IndexMatch;
use civic_desk_core::query::{normalize, text_contains};

use crate::config::Config;
use crate::{embedding, index};

const PREVIEW_CHARS: usize = 120;

pub async fn run_search(
    config: &Config,
    query: &str,
    top_k: Option<usize>,
    keyword: Option<&str>,
) -> Result<()> {
    if query.trim().is_empty() {
        bail!("query must not be empty");
    }
    if !config.embedding.is_enabled() {
        bail!("Embedding provider is disabled. Set [embedding] provider in config.");
    }

    let provider = embedding::create_provider(&config.embedding)?;
    let index = index::create_index(&config.index).await?;
    let top_k = top_k.unwrap_or(config.retrieval.top_k);

    let matches = search(provider.as_ref(), index.as_ref(), query, top_k).await?;
    if matches.is_empty() {
        println!("No results.");
        return Ok(());
    }

    let keyword = keyword.map(normalize).filter(|k| !k.is_empty());
    let mut keyword_hits = 0;
    for (i, m) in matches.iter().enumerate() {
        let text = m.metadata.text.as_deref().unwrap_or("");
        let flagged = keyword.as_deref().is_some_and(|k| text_contains(text, k));
        if flagged {
            keyword_hits += 1;
        }
        println!(
            "{}. [{:.4}] id={}{}",
            i + 1,
            m.score,
            m.id,
            if flagged { "  <-- keyword" } else { "" }
        );
        println!("    {}", preview(text));
    }

    if let Some(k) = keyword {
        if keyword_hits == 0 {
            println!("\nKeyword '{}' not found in any of the top {} results.", k, top_k);
        } else {
            println!("\nKeyword '{}' found in {} result(s).", k, keyword_hits);
        }
    }
    Ok(())
}

/// Embed `query` and return the top-K raw matches.
pub async fn search(
    provider: &dyn EmbeddingProvider,
    index: &dyn VectorIndex,
    query: &str,
    top_k: usize,
) -> Result<Vec<IndexMatch>> {
    let vector = embed_query(provider, query).await?;
    index.query(&vector, top_k).await
}

fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_CHARS {
        flat
    } else {
        let cut: String = flat.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", cut)
    }
}
