//! revqa-text
//!
//! Tantivy-backed sparse (BM25) index over the review corpus, rebuilt in RAM
//! at process start.

pub mod tantivy_utils;
pub mod index;

pub use index::SparseIndex;
