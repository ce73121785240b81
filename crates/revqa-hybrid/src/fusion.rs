//! Weighted reciprocal-rank fusion.
//!
//! Each ranked list contributes `weight / (rank + c)` to every document it
//! contains (rank is 1-based). Raw engine scores never enter the sum.

use std::cmp::Ordering;

use revqa_core::types::{RetrievedCandidate, ReviewDocument, SourceKind};

/// A document after fusion, with the ranks it held in each source list.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedDocument {
    pub document: ReviewDocument,
    pub score: f32,
    pub dense_rank: Option<usize>,
    pub sparse_rank: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
pub struct FusionParams {
    pub dense_weight: f32,
    pub sparse_weight: f32,
    pub rrf_constant: f32,
    pub top_k: usize,
}

pub fn reciprocal_rank_fusion(dense: Vec<RetrievedCandidate>, sparse: Vec<RetrievedCandidate>, params: FusionParams) -> Vec<FusedDocument> {
    let mut fused: Vec<FusedDocument> = Vec::with_capacity(dense.len() + sparse.len());
    for candidate in dense.into_iter().chain(sparse) {
        let weight = match candidate.source {
            SourceKind::Dense => params.dense_weight,
            SourceKind::Sparse => params.sparse_weight,
        };
        let contribution = weight / (candidate.source_rank as f32 + params.rrf_constant);
        // Lists are tiny (k per source), a linear scan keeps identity as plain equality.
        let slot = match fused.iter().position(|f| f.document == candidate.document) {
            Some(i) => i,
            None => {
                fused.push(FusedDocument { document: candidate.document, score: 0.0, dense_rank: None, sparse_rank: None });
                fused.len() - 1
            }
        };
        let entry = &mut fused[slot];
        entry.score += contribution;
        match candidate.source {
            SourceKind::Dense => entry.dense_rank = Some(candidate.source_rank),
            SourceKind::Sparse => entry.sparse_rank = Some(candidate.source_rank),
        }
    }
    fused.sort_by(compare_fused);
    fused.truncate(params.top_k);
    fused
}

/// Fused score descending, then dense rank (absent last), then corpus position.
fn compare_fused(a: &FusedDocument, b: &FusedDocument) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| match (a.dense_rank, b.dense_rank) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.document.position.cmp(&b.document.position))
}
