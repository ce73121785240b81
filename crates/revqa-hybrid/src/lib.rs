//! revqa-hybrid
//!
//! Runs the dense and sparse retrievers concurrently and merges their ranked
//! lists with weighted reciprocal-rank fusion. A single failing source degrades
//! to the other one; both failing is an error.

pub mod fusion;

use std::sync::Arc;
use std::time::Duration;

use revqa_core::config::RetrievalSettings;
use revqa_core::traits::Retriever;
use revqa_core::types::{RetrievedCandidate, ReviewDocument, SourceKind};
use revqa_core::{RagError, Result};
use revqa_text::SparseIndex;
use revqa_vector::DenseIndex;

pub use fusion::{reciprocal_rank_fusion, FusedDocument, FusionParams};

pub struct HybridRetriever {
    dense: Arc<dyn Retriever>,
    sparse: Arc<dyn Retriever>,
    settings: RetrievalSettings,
}

impl HybridRetriever {
    pub fn new(dense: Arc<dyn Retriever>, sparse: Arc<dyn Retriever>, settings: RetrievalSettings) -> Self {
        Self { dense, sparse, settings }
    }

    pub fn from_indexes(dense: DenseIndex, sparse: SparseIndex, settings: RetrievalSettings) -> Self {
        Self::new(Arc::new(dense), Arc::new(sparse), settings)
    }

    pub fn settings(&self) -> &RetrievalSettings { &self.settings }

    /// Fused documents, best first, at most `fused_k` of them.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<ReviewDocument>> {
        Ok(self.retrieve_fused(query).await?.into_iter().map(|f| f.document).collect())
    }

    /// Same as [`retrieve`](Self::retrieve) but keeps fused scores and per-source ranks.
    pub async fn retrieve_fused(&self, query: &str) -> Result<Vec<FusedDocument>> {
        let (dense, sparse) = tokio::join!(
            self.search_source(self.dense.as_ref(), query, self.settings.dense_k),
            self.search_source(self.sparse.as_ref(), query, self.settings.sparse_k),
        );

        let (dense, sparse) = match (dense, sparse) {
            (Ok(d), Ok(s)) => (d, s),
            (Err(e), Ok(s)) => {
                log_degraded(SourceKind::Dense, &e);
                (Vec::new(), s)
            }
            (Ok(d), Err(e)) => {
                log_degraded(SourceKind::Sparse, &e);
                (d, Vec::new())
            }
            (Err(dense_err), Err(sparse_err)) => {
                tracing::error!("Both retrievers failed: dense: {}; sparse: {}", dense_err, sparse_err);
                return Err(RagError::RetrievalFailed(dense_err.to_string()));
            }
        };
        tracing::debug!("Retrieved {} dense and {} sparse candidates", dense.len(), sparse.len());

        let params = FusionParams {
            dense_weight: self.settings.dense_weight,
            sparse_weight: self.settings.sparse_weight,
            rrf_constant: self.settings.rrf_constant,
            top_k: self.settings.fused_k(),
        };
        Ok(reciprocal_rank_fusion(dense, sparse, params))
    }

    async fn search_source(&self, retriever: &dyn Retriever, query: &str, k: usize) -> Result<Vec<RetrievedCandidate>> {
        let kind = retriever.kind();
        let millis = self.settings.search_timeout_ms;
        match tokio::time::timeout(Duration::from_millis(millis), retriever.search(query, k)).await {
            Ok(Ok(hits)) => Ok(RetrievedCandidate::from_ranked(hits, kind)),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(RagError::Timeout { source_kind: kind, millis }),
        }
    }
}

fn log_degraded(source_kind: SourceKind, cause: &RagError) {
    let degraded = RagError::RetrievalDegraded { source_kind, reason: cause.to_string() };
    tracing::warn!("{}; continuing with the remaining source", degraded);
}
