//! Parsing and checking of the citation contract in generated answers.
//!
//! An answer is a body with inline `[n]` markers, optionally followed by a
//! `Sources:` line and one `n. ...` entry per cited number.

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerParts {
    pub body: String,
    pub sources: BTreeMap<usize, String>,
    /// Source numbers listed more than once.
    pub duplicate_sources: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CitationError {
    #[error("citation [{0}] has no Sources entry")]
    MissingSource(usize),
    #[error("Sources entry {0} is never cited")]
    UnusedSource(usize),
    #[error("Sources entry {0} is listed more than once")]
    DuplicateSource(usize),
}

fn sources_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?mi)^[ \t]*\**sources:?\**[ \t]*$").expect("static regex"))
}

fn source_entry() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(\d+)\.\s+(.*\S)\s*$").expect("static regex"))
}

fn marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[(\d+)\]").expect("static regex"))
}

/// Split an answer at its last `Sources:` header.
pub fn parse_answer(text: &str) -> AnswerParts {
    let Some(header) = sources_header().find_iter(text).last() else {
        return AnswerParts { body: text.trim().to_string(), sources: BTreeMap::new(), duplicate_sources: Vec::new() };
    };
    let body = text[..header.start()].trim().to_string();
    let mut sources = BTreeMap::new();
    let mut duplicate_sources = Vec::new();
    for line in text[header.end()..].lines() {
        let Some(caps) = source_entry().captures(line) else { continue };
        let Ok(number) = caps[1].parse::<usize>() else { continue };
        if sources.insert(number, caps[2].to_string()).is_some() {
            duplicate_sources.push(number);
        }
    }
    AnswerParts { body, sources, duplicate_sources }
}

/// Distinct citation numbers used in `body`, ascending.
pub fn cited_numbers(body: &str) -> BTreeSet<usize> {
    marker().captures_iter(body).filter_map(|c| c[1].parse().ok()).collect()
}

/// Every `[n]` has an entry, every entry is cited, no entry is repeated.
pub fn validate_citations(text: &str) -> Result<(), CitationError> {
    let parts = parse_answer(text);
    if let Some(&n) = parts.duplicate_sources.first() {
        return Err(CitationError::DuplicateSource(n));
    }
    let cited = cited_numbers(&parts.body);
    if let Some(&n) = cited.iter().find(|n| !parts.sources.contains_key(n)) {
        return Err(CitationError::MissingSource(n));
    }
    if let Some(&n) = parts.sources.keys().find(|n| !cited.contains(n)) {
        return Err(CitationError::UnusedSource(n));
    }
    Ok(())
}
