//! Review corpus loading and normalization.
//!
//! Input is a JSON array of raw review records, or a directory of such files
//! (read in sorted path order). Every record becomes a [`ReviewDocument`] whose
//! position is its index in the flattened collection; records without any
//! narrative text are skipped.

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{RagError, Result};
use crate::types::{ReviewDocument, ReviewMetadata};

const UNKNOWN_AUTHOR: &str = "Unknown";

/// A review as produced by the scrapers. Every field is optional and loosely typed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawReview {
    #[serde(default)]
    pub title: Option<Value>,
    #[serde(default)]
    pub author: Option<Value>,
    #[serde(default)]
    pub review_date: Option<Value>,
    #[serde(default)]
    pub rating: Option<Value>,
    #[serde(default)]
    pub overall_rating: Option<Value>,
    #[serde(default)]
    pub pros: Option<Value>,
    #[serde(default)]
    pub cons: Option<Value>,
    #[serde(default)]
    pub review_detail: Option<Value>,
}

pub fn load_corpus(path: &Path) -> Result<Vec<ReviewDocument>> {
    let files = if path.is_dir() { list_json_files(path) } else { vec![path.to_path_buf()] };
    let mut raw = Vec::new();
    for file in &files {
        let text = fs::read_to_string(file)
            .map_err(|e| RagError::Corpus(format!("cannot read {}: {}", file.display(), e)))?;
        let records: Vec<RawReview> = serde_json::from_str(&text)
            .map_err(|e| RagError::Corpus(format!("{} is not a JSON array of reviews: {}", file.display(), e)))?;
        tracing::debug!("Read {} raw reviews from {}", records.len(), file.display());
        raw.extend(records);
    }
    let documents = normalize_reviews(raw);
    tracing::info!("Loaded {} review documents from {}", documents.len(), path.display());
    Ok(documents)
}

pub fn normalize_reviews(raw: Vec<RawReview>) -> Vec<ReviewDocument> {
    let mut documents = Vec::with_capacity(raw.len());
    for (i, review) in raw.into_iter().enumerate() {
        match normalize_review(review, documents.len()) {
            Some(doc) => documents.push(doc),
            None => tracing::warn!("Skipping review #{} with no narrative text", i),
        }
    }
    documents
}

/// Build a document at `position`, or `None` when the review has no text.
pub fn normalize_review(review: RawReview, position: usize) -> Option<ReviewDocument> {
    let mut content = String::new();
    for (field, value) in [
        ("title", &review.title),
        ("review_detail", &review.review_detail),
        ("pros", &review.pros),
        ("cons", &review.cons),
    ] {
        let Some(cleaned) = text_value(value).map(clean_text).filter(|s| !s.is_empty()) else { continue };
        if !content.is_empty() {
            content.push('\n');
        }
        content.push_str(field);
        content.push_str(": ");
        content.push_str(&cleaned);
    }
    if content.is_empty() {
        return None;
    }
    let author = text_value(&review.author)
        .map(clean_text)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());
    let rating = review.rating.as_ref().or(review.overall_rating.as_ref()).and_then(parse_rating);
    let review_date = text_value(&review.review_date).and_then(standardize_date);
    Some(ReviewDocument { position, content, metadata: ReviewMetadata { author, review_date, rating } })
}

/// Only JSON strings carry text; numbers, booleans, arrays and objects do not.
fn text_value(value: &Option<Value>) -> Option<&str> {
    match value {
        Some(Value::String(s)) => Some(s.as_str()),
        Some(other) if !other.is_null() => {
            tracing::debug!("Ignoring non-text field value {}", other);
            None
        }
        _ => None,
    }
}

/// Trim, strip surrounding quotes and collapse whitespace runs.
pub fn clean_text(text: &str) -> String {
    let trimmed = text.trim().trim_matches(|c| c == '"' || c == '\'');
    trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Numbers pass through; strings yield their first run of digits and dots
/// ("4.5 out of 5" -> 4.5). Anything else is `None`.
pub fn parse_rating(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let start = s.find(|c: char| c.is_ascii_digit() || c == '.')?;
            let run: String = s[start..].chars().take_while(|c| c.is_ascii_digit() || *c == '.').collect();
            run.parse::<f64>().ok()
        }
        _ => None,
    }
}

/// Accepts "September 2025" or "8/27/2025" (optionally prefixed by
/// "Reviewed ") and renders "Month Year".
pub fn standardize_date(raw: &str) -> Option<String> {
    let cleaned = raw.replace("Reviewed ", "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    // "%B %Y" has no day, so parse it with a fixed one.
    let parsed = NaiveDate::parse_from_str(&format!("1 {cleaned}"), "%d %B %Y")
        .or_else(|_| NaiveDate::parse_from_str(cleaned, "%m/%d/%Y"));
    match parsed {
        Ok(date) => Some(date.format("%B %Y").to_string()),
        Err(_) => {
            tracing::debug!("Could not parse review date '{}'", raw);
            None
        }
    }
}

fn list_json_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(root).into_iter().filter_map(|e| e.ok()).filter(|e| e.file_type().is_file()) {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("json") {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    files
}
