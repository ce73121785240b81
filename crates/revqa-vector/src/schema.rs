use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

pub const POSITION: &str = "position";
pub const CONTENT: &str = "content";
pub const AUTHOR: &str = "author";
pub const REVIEW_DATE: &str = "review_date";
pub const RATING: &str = "rating";
pub const VECTOR: &str = "vector";

/// One row per review: corpus position, the document itself, and its embedding.
pub fn build_arrow_schema(dim: i32) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new(POSITION, DataType::UInt64, false),
		Field::new(CONTENT, DataType::Utf8, false),
		Field::new(AUTHOR, DataType::Utf8, false),
		Field::new(REVIEW_DATE, DataType::Utf8, true),
		Field::new(RATING, DataType::Float64, true),
		Field::new(VECTOR, DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
	]))
}
