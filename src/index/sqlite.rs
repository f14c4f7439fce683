//! SQLite-backed [`VectorIndex`].
//!
//! Vectors are stored as little-endian f32 BLOBs next to their JSON
//! metadata. Queries load every vector and rank by cosine similarity in
//! process, which is fine for the few thousand documents a municipal site
//! publishes.

use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Row, Sqlite};

use civic_desk_core::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use civic_desk_core::index::{IndexEntry, VectorIndex};
use civic_desk_core::models::{IndexMatch, IndexMetadata};

/// Maximum ids per `IN (...)` lookup.
const ID_LOOKUP_BATCH: usize = 100;

pub struct SqliteIndex {
    pool: SqlitePool,
}

impl SqliteIndex {
    /// Open (creating if missing) the index database at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open vector index: {}", path.display()))?;

        let index = Self { pool };
        index.migrate().await?;
        Ok(index)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS vectors (
                id TEXT PRIMARY KEY,
                dims INTEGER NOT NULL,
                embedding BLOB NOT NULL,
                metadata_json TEXT NOT NULL DEFAULT '{}',
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Number of stored vectors.
    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM vectors")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }
}

#[async_trait]
impl VectorIndex for SqliteIndex {
    fn backend(&self) -> &str {
        "sqlite"
    }

    async fn upsert(&self, entries: &[IndexEntry]) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        for entry in entries {
            let metadata = serde_json::to_string(&entry.metadata)?;
            sqlx::query(
                r#"
                INSERT INTO vectors (id, dims, embedding, metadata_json, updated_at)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    dims = excluded.dims,
                    embedding = excluded.embedding,
                    metadata_json = excluded.metadata_json,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(&entry.id)
            .bind(entry.vector.len() as i64)
            .bind(vec_to_blob(&entry.vector))
            .bind(metadata)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>> {
        let rows = sqlx::query("SELECT id, embedding, metadata_json FROM vectors")
            .fetch_all(&self.pool)
            .await?;

        let mut matches: Vec<IndexMatch> = rows
            .iter()
            .map(|row| {
                let id: String = row.get("id");
                let blob: Vec<u8> = row.get("embedding");
                let metadata_json: String = row.get("metadata_json");
                let metadata = serde_json::from_str::<IndexMetadata>(&metadata_json)
                    .unwrap_or_else(|e| {
                        tracing::warn!(%id, error = %e, "unreadable vector metadata");
                        IndexMetadata::default()
                    });
                IndexMatch {
                    score: cosine_similarity(vector, &blob_to_vec(&blob)),
                    id,
                    metadata,
                }
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
        let mut found = HashSet::new();
        for batch in ids.chunks(ID_LOOKUP_BATCH) {
            let mut builder: QueryBuilder<Sqlite> =
                QueryBuilder::new("SELECT id FROM vectors WHERE id IN (");
            let mut separated = builder.separated(", ");
            for id in batch {
                separated.push_bind(id.as_str());
            }
            separated.push_unseparated(")");

            let rows = builder.build().fetch_all(&self.pool).await?;
            found.extend(rows.iter().map(|row| row.get::<String, _>("id")));
        }
        Ok(found)
    }
}
