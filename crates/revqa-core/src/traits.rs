use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ScoredDocument, SourceKind};

/// Maps text to fixed-dimension vectors. Must be deterministic for a given `id`.
pub trait Embedder: Send + Sync {
    /// Stable identifier for the provider/model (e.g. `bert:bge-base-en-v1.5:d768`).
    fn id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector"))
    }
}

/// A ranked search capability over the review corpus.
///
/// Implementations return at most `k` documents ordered best-first with a
/// deterministic tie-break on corpus position.
#[async_trait]
pub trait Retriever: Send + Sync {
    fn kind(&self) -> SourceKind;
    async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredDocument>>;
}
