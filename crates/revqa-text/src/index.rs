use anyhow::Result;
use async_trait::async_trait;
use std::cmp::Ordering;
use std::sync::Arc;
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::{Field, Value};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument};

use revqa_core::traits::Retriever;
use revqa_core::types::{ReviewDocument, ScoredDocument, SourceKind};

use crate::tantivy_utils::{build_schema, register_tokenizer, CONTENT_FIELD, POSITION_FIELD};

/// In-memory BM25 index over the review corpus. Rebuilt at process start from
/// the same ordered collection the dense index was built from. Cheap to clone.
#[derive(Clone)]
pub struct SparseIndex {
	inner: Arc<SparseInner>,
}

struct SparseInner {
	index: Index,
	reader: IndexReader,
	position_field: Field,
	content_field: Field,
	documents: Vec<ReviewDocument>,
}

impl SparseIndex {
	pub fn build(documents: Vec<ReviewDocument>) -> Result<Self> {
		let schema = build_schema();
		let index = Index::create_in_ram(schema.clone());
		register_tokenizer(&index);
		let position_field = schema.get_field(POSITION_FIELD)?;
		let content_field = schema.get_field(CONTENT_FIELD)?;

		let mut writer: IndexWriter = index.writer_with_num_threads(1, 50_000_000)?;
		for (slot, d) in documents.iter().enumerate() {
			anyhow::ensure!(d.position == slot, "document at slot {} carries position {}", slot, d.position);
			writer.add_document(doc!(
				position_field => d.position as u64,
				content_field => d.content.clone(),
			))?;
		}
		writer.commit()?;
		let reader: IndexReader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into()?;
		tracing::info!("Sparse index built over {} documents", documents.len());
		Ok(Self { inner: Arc::new(SparseInner { index, reader, position_field, content_field, documents }) })
	}

	pub fn len(&self) -> usize { self.inner.documents.len() }

	pub fn is_empty(&self) -> bool { self.inner.documents.is_empty() }

	/// BM25 search on the calling thread. Every match is scored so that ties at
	/// the `k` boundary are resolved by corpus position rather than by segment order.
	pub fn search_blocking(&self, query: &str, k: usize) -> Result<Vec<ScoredDocument>> {
		self.inner.search(query, k)
	}
}

impl SparseInner {
	fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredDocument>> {
		if k == 0 || self.documents.is_empty() { return Ok(Vec::new()); }
		let searcher = self.reader.searcher();
		let parser = QueryParser::for_index(&self.index, vec![self.content_field]);
		let (parsed, errors) = parser.parse_query_lenient(query);
		if !errors.is_empty() { tracing::debug!("Lenient parse of '{}' dropped {} clause(s)", query, errors.len()); }
		let top_docs = searcher.search(&parsed, &TopDocs::with_limit(self.documents.len()))?;

		let mut hits: Vec<(f32, usize)> = Vec::with_capacity(top_docs.len());
		for (score, addr) in top_docs {
			let stored: TantivyDocument = searcher.doc(addr)?;
			let position = stored
				.get_first(self.position_field)
				.and_then(|v| v.as_u64())
				.ok_or_else(|| anyhow::anyhow!("indexed document without position"))?;
			hits.push((score, usize::try_from(position)?));
		}
		hits.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal).then(a.1.cmp(&b.1)));
		hits.truncate(k);

		hits.into_iter()
			.map(|(score, position)| {
				let document = self.documents.get(position).cloned().ok_or_else(|| anyhow::anyhow!("position {} out of range", position))?;
				Ok(ScoredDocument { document, score })
			})
			.collect()
	}
}

#[async_trait]
impl Retriever for SparseIndex {
	fn kind(&self) -> SourceKind { SourceKind::Sparse }

	async fn search(&self, query: &str, k: usize) -> revqa_core::Result<Vec<ScoredDocument>> {
		let inner = Arc::clone(&self.inner);
		let query = query.to_string();
		let hits = tokio::task::spawn_blocking(move || inner.search(&query, k))
			.await
			.map_err(|e| revqa_core::RagError::Backend(e.into()))??;
		Ok(hits)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use revqa_core::types::ReviewMetadata;

	fn doc(position: usize, content: &str) -> ReviewDocument {
		ReviewDocument { position, content: content.to_string(), metadata: ReviewMetadata { author: "a".into(), review_date: None, rating: None } }
	}

	#[test]
	fn stemming_matches_inflections() {
		let index = SparseIndex::build(vec![doc(0, "Jira helps teams collaborate"), doc(1, "Pricing is confusing")]).unwrap();
		let hits = index.search_blocking("team collaboration", 3).unwrap();
		assert_eq!(hits.len(), 1);
		assert_eq!(hits[0].document.position, 0);
	}

	#[test]
	fn ties_are_broken_by_corpus_order() {
		let docs = (0..4).map(|i| doc(i, "sprint board")).collect();
		let index = SparseIndex::build(docs).unwrap();
		let hits = index.search_blocking("sprint", 3).unwrap();
		let positions: Vec<usize> = hits.iter().map(|h| h.document.position).collect();
		assert_eq!(positions, vec![0, 1, 2]);
	}

	#[test]
	fn fewer_matches_than_k_are_not_padded() {
		let index = SparseIndex::build(vec![doc(0, "backlog grooming"), doc(1, "release notes")]).unwrap();
		assert_eq!(index.search_blocking("backlog", 10).unwrap().len(), 1);
		assert!(index.search_blocking("the", 10).unwrap().is_empty());
		assert!(index.search_blocking("", 10).unwrap().is_empty());
	}

	#[test]
	fn malformed_query_syntax_is_tolerated() {
		let index = SparseIndex::build(vec![doc(0, "workflow automation rules")]).unwrap();
		assert!(index.search_blocking("workflow AND (", 3).is_ok());
		assert!(index.search_blocking("\"unterminated", 3).is_ok());
	}

	#[tokio::test]
	async fn retriever_impl_reports_sparse_kind() {
		let index = SparseIndex::build(vec![doc(0, "Jira helps teams collaborate")]).unwrap();
		assert_eq!(index.kind(), SourceKind::Sparse);
		let hits = index.search("collaborating teams", 3).await.unwrap();
		assert_eq!(hits[0].document.position, 0);
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
	async fn clones_share_one_index_across_tasks() {
		let index = SparseIndex::build(vec![doc(0, "sprint planning"), doc(1, "release notes")]).unwrap();
		let tasks: Vec<_> = (0..4)
			.map(|_| {
				let index = index.clone();
				tokio::spawn(async move { index.search("sprint", 3).await })
			})
			.collect();
		for task in tasks {
			let hits = task.await.unwrap().unwrap();
			assert_eq!(hits.len(), 1);
			assert_eq!(hits[0].document.position, 0);
		}
	}

	#[test]
	fn empty_corpus_searches_empty() {
		let index = SparseIndex::build(Vec::new()).unwrap();
		assert!(index.is_empty());
		assert!(index.search_blocking("anything", 3).unwrap().is_empty());
	}
}
