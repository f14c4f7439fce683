//! JSON-file-backed [`DocumentStore`].
//!
//! The site's content exports live as one JSON array per content type
//! (`<data_dir>/circular.json`, `<data_dir>/rti_act.json`, ...). Files are
//! read fresh on every call so that re-exports are picked up without a
//! restart. A missing or malformed file is logged and contributes no
//! documents; it never fails the whole load.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use civic_desk_core::links::first_link;
use civic_desk_core::models::{string_or_number, Document};
use civic_desk_core::store::DocumentStore;

use crate::config::StoreConfig;

/// Documents loaded from `<data_dir>/<content_type>.json` files.
pub struct JsonDocumentStore {
    data_dir: PathBuf,
    content_types: Vec<String>,
}

impl JsonDocumentStore {
    pub fn new(data_dir: impl Into<PathBuf>, content_types: Vec<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            content_types,
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.data_dir.clone(), config.content_types.clone())
    }

    fn file_for(&self, content_type: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", content_type))
    }
}

/// One exported record. Field names follow the site's listing API.
#[derive(Debug, Deserialize)]
struct StoreRecord {
    #[serde(default, deserialize_with = "string_or_number")]
    nid: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    display_date: Option<String>,
    #[serde(default)]
    file: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    external_link: Option<String>,
}

impl StoreRecord {
    fn into_document(self, content_type: &str) -> Option<Document> {
        let id = self
            .nid
            .or(self.id)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())?;
        let body = [self.body, self.text, self.description]
            .into_iter()
            .flatten()
            .find(|s| !s.trim().is_empty())
            .unwrap_or_default();
        Some(Document {
            id,
            title: self.title.unwrap_or_default().trim().to_string(),
            body,
            display_date: self.display_date.filter(|d| !d.trim().is_empty()),
            link: first_link(&[
                self.file.as_deref(),
                self.url.as_deref(),
                self.link.as_deref(),
                self.external_link.as_deref(),
            ]),
            content_type: content_type.to_string(),
        })
    }
}

/// Parse one exported file's content. Records that do not deserialize or
/// carry no identifier are skipped.
fn parse_records(content: &str, content_type: &str, path: &Path) -> Result<Vec<Document>> {
    let values: Vec<serde_json::Value> = serde_json::from_str(content)
        .with_context(|| format!("{} is not a JSON array", path.display()))?;

    let mut docs = Vec::with_capacity(values.len());
    for (i, value) in values.into_iter().enumerate() {
        match serde_json::from_value::<StoreRecord>(value) {
            Ok(record) => match record.into_document(content_type) {
                Some(doc) => docs.push(doc),
                None => debug!(file = %path.display(), index = i, "skipping record without id"),
            },
            Err(e) => {
                debug!(file = %path.display(), index = i, error = %e, "skipping malformed record")
            }
        }
    }
    Ok(docs)
}

#[async_trait]
impl DocumentStore for JsonDocumentStore {
    async fn load_all(&self) -> Result<Vec<Document>> {
        let mut all = Vec::new();
        for content_type in &self.content_types {
            let path = self.file_for(content_type);
            let content = match tokio::fs::read_to_string(&path).await {
                Ok(c) => c,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    warn!(file = %path.display(), "document store file missing");
                    continue;
                }
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "cannot read document store file");
                    continue;
                }
            };
            match parse_records(&content, content_type, &path) {
                Ok(docs) => all.extend(docs),
                Err(e) => warn!(error = %e, "ignoring malformed document store file"),
            }
        }
        Ok(all)
    }
}
