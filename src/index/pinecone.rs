//! Pinecone-backed [`VectorIndex`] over the HTTP data-plane API.
//!
//! Only the data plane is used (`/query`, `/vectors/upsert`,
//! `/vectors/fetch`); the index itself is created out of band. Requires the
//! `PINECONE_API_KEY` environment variable.

use std::collections::HashSet;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use civic_desk_core::index::{IndexEntry, VectorIndex};
use civic_desk_core::models::{IndexMatch, IndexMetadata};

use crate::config::IndexConfig;

const API_VERSION: &str = "2024-07";

/// Maximum ids per fetch request (ids travel in the query string).
const FETCH_BATCH: usize = 100;

pub struct PineconeIndex {
    host: String,
    namespace: Option<String>,
    api_key: String,
    client: reqwest::Client,
}

impl PineconeIndex {
    pub fn new(config: &IndexConfig) -> Result<Self> {
        let host = config
            .host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| anyhow!("index.host required for Pinecone backend"))?;
        let host = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{}", host)
        };
        let api_key = std::env::var("PINECONE_API_KEY")
            .map_err(|_| anyhow!("PINECONE_API_KEY environment variable not set"))?;

        Ok(Self {
            host: host.trim_end_matches('/').to_string(),
            namespace: config.namespace.clone().filter(|n| !n.is_empty()),
            api_key,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()?,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.host, path))
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }

    async fn send(&self, request: reqwest::RequestBuilder, what: &str) -> Result<serde_json::Value> {
        let response = request
            .send()
            .await
            .with_context(|| format!("Pinecone {} request failed", what))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Pinecone {} error {}: {}", what, status, body);
        }
        Ok(response.json().await?)
    }
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<IndexMetadata>,
}

fn parse_query_response(json: serde_json::Value) -> Result<Vec<IndexMatch>> {
    let parsed: QueryResponse =
        serde_json::from_value(json).context("Invalid Pinecone query response")?;
    Ok(parsed
        .matches
        .into_iter()
        .map(|m| IndexMatch {
            id: m.id,
            score: m.score,
            metadata: m.metadata.unwrap_or_default(),
        })
        .collect())
}

fn parse_fetch_response(json: &serde_json::Value) -> HashSet<String> {
    json.get("vectors")
        .and_then(|v| v.as_object())
        .map(|vectors| vectors.keys().cloned().collect())
        .unwrap_or_default()
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    fn backend(&self) -> &str {
        "pinecone"
    }

    async fn upsert(&self, entries: &[IndexEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let vectors: Vec<serde_json::Value> = entries
            .iter()
            .map(|e| {
                json!({
                    "id": e.id,
                    "values": e.vector,
                    "metadata": e.metadata,
                })
            })
            .collect();
        let mut body = json!({ "vectors": vectors });
        if let Some(ns) = &self.namespace {
            body["namespace"] = json!(ns);
        }

        self.send(
            self.request(reqwest::Method::POST, "/vectors/upsert").json(&body),
            "upsert",
        )
        .await?;
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>> {
        let mut body = json!({
            "vector": vector,
            "topK": top_k,
            "includeMetadata": true,
            "includeValues": false,
        });
        if let Some(ns) = &self.namespace {
            body["namespace"] = json!(ns);
        }

        let json = self
            .send(
                self.request(reqwest::Method::POST, "/query").json(&body),
                "query",
            )
            .await?;
        parse_query_response(json)
    }

    async fn existing_ids(&self, ids: &[String]) -> Result<HashSet<String>> {
        let mut found = HashSet::new();
        for batch in ids.chunks(FETCH_BATCH) {
            let mut params: Vec<(&str, &str)> = batch.iter().map(|id| ("ids", id.as_str())).collect();
            if let Some(ns) = &self.namespace {
                params.push(("namespace", ns.as_str()));
            }
            let json = self
                .send(
                    self.request(reqwest::Method::GET, "/vectors/fetch").query(&params),
                    "fetch",
                )
                .await?;
            found.extend(parse_fetch_response(&json));
        }
        Ok(found)
    }
}
