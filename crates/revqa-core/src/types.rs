//! Domain types shared by the sparse, dense and hybrid retrievers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Metadata carried alongside every review and rendered into the prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewMetadata {
    pub author: String,
    /// "Month Year", or `None` when the source date could not be parsed.
    pub review_date: Option<String>,
    pub rating: Option<f64>,
}

/// One normalized review.
///
/// - `position`: zero-based index within the corpus load. Both indexes are
///   built from the same ordered collection, so the position is the implicit
///   identity used for tie-breaking.
/// - `content`: narrative fields rendered as `"<field>: <text>"` lines; never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewDocument {
    pub position: usize,
    pub content: String,
    pub metadata: ReviewMetadata,
}

/// Indicates which index produced a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Dense,
    Sparse,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Dense => "dense",
            SourceKind::Sparse => "sparse",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document with an engine-specific score. Higher is always better; scores
/// from different engines are not comparable.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
    pub document: ReviewDocument,
    pub score: f32,
}

/// A document as seen by the fusion step: where it came from and at which
/// 1-based rank.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedCandidate {
    pub document: ReviewDocument,
    pub source_rank: usize,
    pub source: SourceKind,
}

impl RetrievedCandidate {
    /// Ranks a sub-retriever's ordered output, dropping its raw scores.
    pub fn from_ranked(hits: Vec<ScoredDocument>, source: SourceKind) -> Vec<Self> {
        hits.into_iter()
            .enumerate()
            .map(|(i, hit)| Self { document: hit.document, source_rank: i + 1, source })
            .collect()
    }
}
