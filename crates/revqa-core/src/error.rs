use thiserror::Error;

use crate::types::SourceKind;

#[derive(Debug, Error)]
pub enum RagError {
    /// The persisted dense store is missing. Querying it means ingestion was
    /// never run for this location, so it is never reported as "no results".
    #[error("Index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Retrieval degraded: {source_kind} search failed: {reason}")]
    RetrievalDegraded { source_kind: SourceKind, reason: String },

    #[error("Retrieval failed: every source failed ({0})")]
    RetrievalFailed(String),

    #[error("Search timed out after {millis} ms ({source_kind})")]
    Timeout { source_kind: SourceKind, millis: u64 },

    #[error("Empty context: no documents retrieved")]
    EmptyContext,

    #[error("Generation failed: {0}")]
    GenerationFailure(String),

    #[error("Classifier failed: {0}")]
    ClassifierFailure(String),

    #[error("Corpus error: {0}")]
    Corpus(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, RagError>;
