#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod config;
pub mod corpus;
pub mod error;
pub mod timing;
pub mod traits;
pub mod types;

pub use error::{RagError, Result};
pub use types::{RetrievedCandidate, ReviewDocument, ReviewMetadata, ScoredDocument, SourceKind};
