//! Building the retrieval stack from configuration.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use revqa_core::config::Settings;
use revqa_core::corpus::load_corpus;
use revqa_core::timing::PhaseTimer;
use revqa_core::traits::Embedder;
use revqa_core::types::ReviewDocument;
use revqa_core::{RagError, Result};
use revqa_embed::get_default_embedder;
use revqa_hybrid::HybridRetriever;
use revqa_text::SparseIndex;
use revqa_vector::DenseIndex;

/// Produces the hybrid retriever the orchestrator serves from.
#[async_trait]
pub trait IndexLoader: Send + Sync {
    async fn load(&self) -> Result<HybridRetriever>;
}

/// Rebuilds the sparse index from the corpus and opens the persisted dense store.
pub struct ReviewIndexLoader {
    settings: Settings,
}

impl ReviewIndexLoader {
    pub fn new(settings: Settings) -> Self { Self { settings } }
}

#[async_trait]
impl IndexLoader for ReviewIndexLoader {
    async fn load(&self) -> Result<HybridRetriever> {
        let data = &self.settings.data;
        let corpus = read_corpus(Path::new(&data.corpus_path)).await?;
        let embedder = load_embedder(&self.settings).await?;
        let sparse = tokio::task::spawn_blocking(move || SparseIndex::build(corpus))
            .await
            .map_err(|e| RagError::Backend(e.into()))??;
        let dense = DenseIndex::open(&data.lancedb_dir, data.lancedb_table.as_str(), embedder);
        tracing::info!("Retrieval ready: {} reviews, dense store at {}", sparse.len(), data.lancedb_dir);
        Ok(HybridRetriever::from_indexes(dense, sparse, self.settings.retrieval.clone()))
    }
}

/// Embed the corpus and replace the persisted dense store. Returns the number
/// of indexed reviews.
pub async fn ingest(settings: &Settings) -> Result<usize> {
    let _timer = PhaseTimer::start("ingestion");
    let corpus = read_corpus(Path::new(&settings.data.corpus_path)).await?;
    let embedder = load_embedder(settings).await?;
    let location = Path::new(&settings.data.lancedb_dir);
    let index = DenseIndex::build(&corpus, embedder, location, &settings.data.lancedb_table).await?;
    let count = index.count().await?;
    tracing::info!("Dense store at {} holds {} reviews", location.display(), count);
    Ok(count)
}

async fn read_corpus(path: &Path) -> Result<Vec<ReviewDocument>> {
    let path = path.to_path_buf();
    let _timer = PhaseTimer::start("corpus loading");
    tokio::task::spawn_blocking(move || load_corpus(&path)).await.map_err(|e| RagError::Backend(e.into()))?
}

async fn load_embedder(settings: &Settings) -> Result<Arc<dyn Embedder>> {
    let embedding = settings.embedding.clone();
    let embedder = tokio::task::spawn_blocking(move || get_default_embedder(&embedding))
        .await
        .map_err(|e| RagError::Backend(e.into()))?
        .map_err(|e| RagError::Embedding(e.to_string()))?;
    Ok(Arc::from(embedder))
}
