//! Grounded prompt assembly.
//!
//! The context block numbers documents from 1 in fused order; the generator is
//! told to cite those numbers as `[n]` and to list them under `Sources:`.

use revqa_core::types::ReviewDocument;

/// Exact reply when the reviews do not contain the answer.
pub const FALLBACK_ANSWER: &str = "I cannot answer this based on the provided reviews.";

/// Reply for any failure on the grounded path.
pub const GENERIC_FAILURE: &str = "An error occurred while processing your request.";

/// Reply for an empty or whitespace-only question.
pub const BLANK_QUERY_REPLY: &str = "Please provide a valid question.";

const UNKNOWN: &str = "Unknown";

const SYSTEM_TEMPLATE: &str = "You are a helpful assistant. Given Jira reviews, your task is to answer the user's query \
based *only* on the provided review context.\n\
Do NOT make up any answers. If the answer is not found in the reviews, respond with exactly: \
'I cannot answer this based on the provided reviews.'\n\n\
Format your answer as follows:\n\
1. Provide a concise answer using inline numbered citation references like [1], [2], etc. \
The number is the Document number the statement comes from.\n\
2. After the answer, include a 'Sources:' section with one entry per number you cited and no others.\n   \
Each source should include: author name, rating, the date of the review, and a short phrase summarizing the relevant point.\n\n\
Example output format:\n\
Jira helps teams collaborate efficiently [1]. It supports agile methodologies like Scrum [2].\n\n\
Sources:\n\
1. Freda rated it 5.0 and mentioned this on December 2024: teams collaborate efficiently.\n\
2. Rajiv rated it 5.0 and mentioned this on June 2024: good Scrum support.\n\n\
Only use the following Documents of Jira Reviews as Context:\n\n\
{context}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroundedPrompt {
    pub system: String,
    pub user: String,
}

pub fn assemble(documents: &[ReviewDocument], query: &str) -> GroundedPrompt {
    GroundedPrompt { system: SYSTEM_TEMPLATE.replace("{context}", &render_context(documents)), user: query.to_string() }
}

/// `Document-<n>` blocks separated by a blank line, `n` starting at 1.
pub fn render_context(documents: &[ReviewDocument]) -> String {
    documents
        .iter()
        .enumerate()
        .map(|(i, doc)| render_document(i + 1, doc))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn render_document(number: usize, doc: &ReviewDocument) -> String {
    let meta = &doc.metadata;
    let rating = meta.rating.map(format_rating).unwrap_or_else(|| UNKNOWN.to_string());
    let date = meta.review_date.as_deref().unwrap_or(UNKNOWN);
    format!(
        "Document-{number}:\nauthor: {}\nrating: {rating}\nreview_date: {date}\n**Review detail**:\n{}",
        meta.author, doc.content
    )
}

/// Ratings keep one decimal when whole (`5.0`), otherwise print as-is (`4.5`).
pub fn format_rating(rating: f64) -> String {
    if rating.fract() == 0.0 { format!("{rating:.1}") } else { format!("{rating}") }
}
