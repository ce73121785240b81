use anyhow::Result;
use arrow_array::{FixedSizeListArray, Float64Array, RecordBatch, RecordBatchIterator, StringArray, UInt64Array};
use indicatif::{ProgressBar, ProgressStyle};
use lancedb::Connection;
use std::sync::Arc;

use revqa_core::traits::Embedder;
use revqa_core::types::ReviewDocument;

use crate::schema::build_arrow_schema;

const BATCH_SIZE: usize = 256;

/// Embed `documents` and write them as a fresh table. The caller guarantees
/// that no table of that name exists.
pub(crate) async fn write_table(conn: &Connection, table_name: &str, documents: &[ReviewDocument], embedder: Arc<dyn Embedder>) -> Result<()> {
	let dim = i32::try_from(embedder.dim())?;
	let schema = build_arrow_schema(dim);
	if documents.is_empty() {
		tracing::warn!("No documents to index; creating empty table '{}'", table_name);
		let iter = RecordBatchIterator::new(vec![].into_iter(), schema.clone());
		conn.create_table(table_name, Box::new(iter)).execute().await?;
		return Ok(());
	}

	tracing::info!("Indexing {} documents into LanceDB table '{}' with {}", documents.len(), table_name, embedder.id());
	let pb = ProgressBar::new(documents.len() as u64);
	pb.set_style(ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} reviews ({percent}%) {msg}")?.progress_chars("#>-"));

	let mut batches: Vec<Result<RecordBatch, arrow_schema::ArrowError>> = Vec::new();
	for chunk in documents.chunks(BATCH_SIZE) {
		let texts: Vec<String> = chunk.iter().map(|d| d.content.clone()).collect();
		let batch_embedder = Arc::clone(&embedder);
		let embeddings = tokio::task::spawn_blocking(move || batch_embedder.embed_batch(&texts)).await??;
		anyhow::ensure!(embeddings.len() == chunk.len(), "embedder returned {} vectors for {} texts", embeddings.len(), chunk.len());
		batches.push(Ok(docs_to_record_batch(chunk, &embeddings, dim)?));
		pb.inc(chunk.len() as u64);
	}
	pb.finish_with_message("embedded");

	let reader = Box::new(RecordBatchIterator::new(batches.into_iter(), schema));
	conn.create_table(table_name, reader).execute().await?;
	tracing::info!("Indexed {} documents into '{}'", documents.len(), table_name);
	Ok(())
}

fn docs_to_record_batch(docs: &[ReviewDocument], embeddings: &[Vec<f32>], dim: i32) -> Result<RecordBatch> {
	let mut positions = Vec::with_capacity(docs.len());
	let mut contents = Vec::with_capacity(docs.len());
	let mut authors = Vec::with_capacity(docs.len());
	let mut dates: Vec<Option<String>> = Vec::with_capacity(docs.len());
	let mut ratings: Vec<Option<f64>> = Vec::with_capacity(docs.len());
	let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(docs.len());
	for (doc, vector) in docs.iter().zip(embeddings) {
		anyhow::ensure!(vector.len() == dim as usize, "embedding for position {} has {} dims, expected {}", doc.position, vector.len(), dim);
		positions.push(doc.position as u64);
		contents.push(doc.content.clone());
		authors.push(doc.metadata.author.clone());
		dates.push(doc.metadata.review_date.clone());
		ratings.push(doc.metadata.rating);
		vectors.push(Some(vector.iter().map(|&x| Some(x)).collect()));
	}
	let record_batch = RecordBatch::try_new(build_arrow_schema(dim), vec![
		Arc::new(UInt64Array::from(positions)),
		Arc::new(StringArray::from(contents)),
		Arc::new(StringArray::from(authors)),
		Arc::new(StringArray::from(dates)),
		Arc::new(Float64Array::from(ratings)),
		Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors.into_iter(), dim)),
	])?;
	Ok(record_batch)
}
