//! revqa-vector
//!
//! Persistent dense index over review documents, stored as a LanceDB table.
//! One row per review: position, content, metadata columns and the embedding.

pub mod schema;
pub mod search;
pub mod table;
pub mod writer;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use revqa_core::timing::PhaseTimer;
use revqa_core::traits::{Embedder, Retriever};
use revqa_core::types::{ReviewDocument, ScoredDocument, SourceKind};
use revqa_core::{RagError, Result};

use crate::table::{open_db, table_exists};

pub struct DenseIndex {
    location: PathBuf,
    table_name: String,
    embedder: Arc<dyn Embedder>,
}

impl DenseIndex {
    /// Bind to a persisted store. Nothing is read until the first search, so a
    /// missing store surfaces as [`RagError::IndexUnavailable`] at query time.
    pub fn open(location: impl Into<PathBuf>, table_name: impl Into<String>, embedder: Arc<dyn Embedder>) -> Self {
        Self { location: location.into(), table_name: table_name.into(), embedder }
    }

    /// Embed every document and persist a fresh store at `location`, replacing
    /// whatever was there. Running it twice over the same input yields the
    /// same store.
    pub async fn build(documents: &[ReviewDocument], embedder: Arc<dyn Embedder>, location: &Path, table_name: &str) -> Result<Self> {
        let _timer = PhaseTimer::start("dense index build");
        if location.exists() {
            tracing::info!("Removing existing dense store at {}", location.display());
            std::fs::remove_dir_all(location).map_err(|e| RagError::Backend(e.into()))?;
        }
        std::fs::create_dir_all(location).map_err(|e| RagError::Backend(e.into()))?;
        let conn = open_db(location).await?;
        writer::write_table(&conn, table_name, documents, Arc::clone(&embedder)).await?;
        Ok(Self::open(location, table_name, embedder))
    }

    pub fn location(&self) -> &Path { &self.location }

    pub fn table_name(&self) -> &str { &self.table_name }

    /// Number of stored reviews, or `IndexUnavailable` when nothing was built.
    pub async fn count(&self) -> Result<usize> {
        let table = self.open_table().await?;
        Ok(table.count_rows(None).await.map_err(anyhow::Error::from)?)
    }

    async fn open_table(&self) -> Result<lancedb::Table> {
        if !self.location.exists() {
            return Err(RagError::IndexUnavailable(format!("no dense store at {}", self.location.display())));
        }
        let conn = open_db(&self.location).await?;
        if !table_exists(&conn, &self.table_name).await? {
            return Err(RagError::IndexUnavailable(format!("table '{}' not found in {}", self.table_name, self.location.display())));
        }
        Ok(conn.open_table(&self.table_name).execute().await.map_err(anyhow::Error::from)?)
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let embedder = Arc::clone(&self.embedder);
        let text = query.to_string();
        let vector = tokio::task::spawn_blocking(move || embedder.embed(&text))
            .await
            .map_err(|e| RagError::Embedding(e.to_string()))?
            .map_err(|e| RagError::Embedding(e.to_string()))?;
        Ok(vector)
    }
}

#[async_trait]
impl Retriever for DenseIndex {
    fn kind(&self) -> SourceKind { SourceKind::Dense }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredDocument>> {
        if k == 0 { return Ok(Vec::new()); }
        let table = self.open_table().await?;
        if table.count_rows(None).await.map_err(anyhow::Error::from)? == 0 { return Ok(Vec::new()); }
        let query_vec = self.embed_query(query).await?;
        let hits = search::vector_search(&table, query_vec, k).await?;
        tracing::debug!("Dense search returned {} hits for '{}'", hits.len(), query);
        Ok(hits)
    }
}
