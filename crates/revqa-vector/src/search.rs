use anyhow::{anyhow, Result};
use arrow_array::{Array, Float32Array, Float64Array, RecordBatch, StringArray, UInt64Array};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{DistanceType, Table};
use std::cmp::Ordering;

use revqa_core::types::{ReviewDocument, ReviewMetadata, ScoredDocument};

use crate::schema::{AUTHOR, CONTENT, POSITION, RATING, REVIEW_DATE, VECTOR};

/// Cosine nearest neighbours; `score = 1 - cosine distance`, best first,
/// ties broken by corpus position.
pub(crate) async fn vector_search(table: &Table, query_vec: Vec<f32>, k: usize) -> Result<Vec<ScoredDocument>> {
	let mut stream = table
		.vector_search(query_vec)?
		.column(VECTOR)
		.distance_type(DistanceType::Cosine)
		.limit(k)
		.execute()
		.await?;
	let mut hits = Vec::new();
	while let Some(batch) = stream.try_next().await? {
		hits.extend(batch_to_hits(&batch)?);
	}
	hits.sort_by(|a: &ScoredDocument, b: &ScoredDocument| {
		b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal).then(a.document.position.cmp(&b.document.position))
	});
	hits.truncate(k);
	Ok(hits)
}

fn batch_to_hits(batch: &RecordBatch) -> Result<Vec<ScoredDocument>> {
	let positions = column::<UInt64Array>(batch, POSITION)?;
	let contents = column::<StringArray>(batch, CONTENT)?;
	let authors = column::<StringArray>(batch, AUTHOR)?;
	let dates = column::<StringArray>(batch, REVIEW_DATE)?;
	let ratings = column::<Float64Array>(batch, RATING)?;
	let distances = column::<Float32Array>(batch, "_distance")?;
	let mut out = Vec::with_capacity(batch.num_rows());
	for i in 0..batch.num_rows() {
		let review_date = if dates.is_null(i) { None } else { Some(dates.value(i).to_string()) };
		let rating = if ratings.is_null(i) { None } else { Some(ratings.value(i)) };
		let score = 1.0 - distances.value(i);
		// Zero vectors (e.g. an all-stop-word query) have no defined cosine.
		let score = if score.is_finite() { score } else { -1.0 };
		out.push(ScoredDocument {
			document: ReviewDocument {
				position: usize::try_from(positions.value(i))?,
				content: contents.value(i).to_string(),
				metadata: ReviewMetadata { author: authors.value(i).to_string(), review_date, rating },
			},
			score,
		});
	}
	Ok(out)
}

fn column<'a, T: Array + 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
	batch
		.column_by_name(name)
		.and_then(|c| c.as_any().downcast_ref::<T>())
		.ok_or_else(|| anyhow!("column '{}' missing or of unexpected type", name))
}
