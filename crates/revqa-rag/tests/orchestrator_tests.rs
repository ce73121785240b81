use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use revqa_core::config::{RetrievalSettings, Settings};
use revqa_core::traits::Retriever;
use revqa_core::types::{ReviewDocument, ReviewMetadata, ScoredDocument, SourceKind};
use revqa_core::{RagError, Result};
use revqa_embed::HashEmbedder;
use revqa_hybrid::HybridRetriever;
use revqa_rag::{
    ingest, validate_citations, ChatMessage, ChatModel, IndexLoader, RagOrchestrator, ReviewIndexLoader, Role, BLANK_QUERY_REPLY,
    FALLBACK_ANSWER, GENERIC_FAILURE,
};
use revqa_text::SparseIndex;
use revqa_vector::DenseIndex;

fn review(position: usize, author: &str, rating: f64, date: &str, content: &str) -> ReviewDocument {
    ReviewDocument {
        position,
        content: content.to_string(),
        metadata: ReviewMetadata { author: author.to_string(), review_date: Some(date.to_string()), rating: Some(rating) },
    }
}

fn scenario_corpus() -> Vec<ReviewDocument> {
    vec![
        review(0, "Freda", 5.0, "December 2024", "Jira helps teams collaborate"),
        review(1, "Rajiv", 2.0, "June 2024", "Pricing is confusing"),
    ]
}

struct FixedRetriever {
    kind: SourceKind,
    docs: Vec<ReviewDocument>,
}

#[async_trait]
impl Retriever for FixedRetriever {
    fn kind(&self) -> SourceKind { self.kind }
    async fn search(&self, _query: &str, k: usize) -> Result<Vec<ScoredDocument>> {
        Ok(self.docs.iter().take(k).cloned().map(|document| ScoredDocument { document, score: 1.0 }).collect())
    }
}

/// Serves fixed dense/sparse lists and counts how often it was asked to load.
struct StubLoader {
    docs: Vec<ReviewDocument>,
    loads: AtomicUsize,
    failures_left: AtomicUsize,
}

impl StubLoader {
    fn new(docs: Vec<ReviewDocument>) -> Arc<Self> {
        Arc::new(Self { docs, loads: AtomicUsize::new(0), failures_left: AtomicUsize::new(0) })
    }
}

#[async_trait]
impl IndexLoader for StubLoader {
    async fn load(&self) -> Result<HybridRetriever> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        if self.failures_left.load(Ordering::SeqCst) > 0 {
            self.failures_left.fetch_sub(1, Ordering::SeqCst);
            return Err(RagError::IndexUnavailable("not ready".into()));
        }
        let dense = Arc::new(FixedRetriever { kind: SourceKind::Dense, docs: self.docs.clone() });
        let sparse = Arc::new(FixedRetriever { kind: SourceKind::Sparse, docs: self.docs.clone() });
        Ok(HybridRetriever::new(dense, sparse, RetrievalSettings::default()))
    }
}

/// Loader over real indexes built in a temp dir.
struct BuiltLoader {
    location: std::path::PathBuf,
    corpus: Vec<ReviewDocument>,
}

#[async_trait]
impl IndexLoader for BuiltLoader {
    async fn load(&self) -> Result<HybridRetriever> {
        let dense = DenseIndex::open(&self.location, "reviews", Arc::new(HashEmbedder::new(256)));
        let sparse = SparseIndex::build(self.corpus.clone())?;
        Ok(HybridRetriever::from_indexes(dense, sparse, RetrievalSettings::default()))
    }
}

/// Cites the first context document, or records that it was called with none.
#[derive(Default)]
struct EchoModel {
    calls: AtomicUsize,
    last_system: Mutex<Option<String>>,
}

#[async_trait]
impl ChatModel for EchoModel {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let system = messages.iter().find(|m| m.role == Role::System).map(|m| m.content.clone()).unwrap_or_default();
        *self.last_system.lock().unwrap() = Some(system.clone());
        let Some(block) = system.split("Document-1:\n").nth(1) else {
            return Ok(FALLBACK_ANSWER.to_string());
        };
        let author = block.lines().next().and_then(|l| l.strip_prefix("author: ")).unwrap_or("Unknown");
        Ok(format!("{author}'s review answers this [1].\n\nSources:\n1. {author} rated it 5.0 and mentioned this on December 2024: see review."))
    }
}

struct ScriptedModel(std::result::Result<&'static str, &'static str>);

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String> {
        match self.0 {
            Ok(text) => Ok(text.to_string()),
            Err(msg) => Err(RagError::GenerationFailure(msg.to_string())),
        }
    }
}

#[tokio::test]
async fn scenario_answer_cites_first_document() {
    let tmp = TempDir::new().unwrap();
    let location = tmp.path().join("lancedb");
    let corpus = scenario_corpus();
    DenseIndex::build(&corpus, Arc::new(HashEmbedder::new(256)), &location, "reviews").await.unwrap();
    let model = Arc::new(EchoModel::default());
    let orchestrator = RagOrchestrator::new(Arc::new(BuiltLoader { location, corpus }), model.clone());

    let answer = orchestrator.answer("team collaboration").await;

    assert!(answer.contains("[1]"), "{answer}");
    assert!(answer.starts_with("Freda"), "{answer}");
    assert!(validate_citations(&answer).is_ok());
    let system = model.last_system.lock().unwrap().clone().unwrap();
    assert!(system.contains("Document-1:\nauthor: Freda\nrating: 5.0\nreview_date: December 2024"));
    assert!(system.contains("Document-2:\nauthor: Rajiv\nrating: 2.0\nreview_date: June 2024"));
}

#[tokio::test]
async fn empty_retrieval_returns_fallback_without_calling_the_model() {
    let model = Arc::new(EchoModel::default());
    let orchestrator = RagOrchestrator::new(StubLoader::new(Vec::new()), model.clone());

    assert_eq!(orchestrator.answer("anything about sprints?").await, FALLBACK_ANSWER);
    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn blank_query_is_rejected_before_retrieval() {
    let loader = StubLoader::new(scenario_corpus());
    let orchestrator = RagOrchestrator::new(loader.clone(), Arc::new(EchoModel::default()));
    assert_eq!(orchestrator.answer("   ").await, BLANK_QUERY_REPLY);
    assert_eq!(loader.loads.load(Ordering::SeqCst), 0);
    assert!(!orchestrator.is_initialized());
}

#[tokio::test]
async fn generation_failures_become_the_generic_reply() {
    let orchestrator = RagOrchestrator::new(StubLoader::new(scenario_corpus()), Arc::new(ScriptedModel(Err("quota exceeded"))));
    assert_eq!(orchestrator.answer("Is Jira good?").await, GENERIC_FAILURE);

    let orchestrator = RagOrchestrator::new(StubLoader::new(scenario_corpus()), Arc::new(ScriptedModel(Ok("  \n"))));
    assert_eq!(orchestrator.answer("Is Jira good?").await, GENERIC_FAILURE);
    assert!(matches!(orchestrator.try_answer("Is Jira good?").await, Err(RagError::GenerationFailure(_))));
}

#[tokio::test]
async fn answers_are_returned_verbatim_even_when_citations_are_off() {
    let text = "Teams like it [4].";
    let orchestrator = RagOrchestrator::new(StubLoader::new(scenario_corpus()), Arc::new(ScriptedModel(Ok(text))));
    assert_eq!(orchestrator.answer("Is Jira good?").await, text);
}

#[tokio::test]
async fn lazy_initialization_runs_once_under_concurrency() {
    let loader = StubLoader::new(scenario_corpus());
    let orchestrator = Arc::new(RagOrchestrator::new(loader.clone(), Arc::new(EchoModel::default())));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move { orchestrator.answer(&format!("question {i}")).await })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap().contains("[1]"));
    }

    assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
    assert!(orchestrator.is_initialized());
}

#[tokio::test]
async fn failed_initialization_is_retried() {
    let loader = StubLoader::new(scenario_corpus());
    loader.failures_left.store(1, Ordering::SeqCst);
    let orchestrator = RagOrchestrator::new(loader.clone(), Arc::new(EchoModel::default()));

    assert_eq!(orchestrator.answer("Is Jira good?").await, GENERIC_FAILURE);
    assert!(orchestrator.answer("Is Jira good?").await.contains("[1]"));
    assert_eq!(loader.loads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn missing_dense_store_still_answers_from_sparse() {
    let tmp = TempDir::new().unwrap();
    let orchestrator = RagOrchestrator::new(
        Arc::new(BuiltLoader { location: tmp.path().join("absent"), corpus: scenario_corpus() }),
        Arc::new(EchoModel::default()),
    );
    let answer = orchestrator.answer("pricing").await;
    assert!(answer.starts_with("Rajiv"), "{answer}");
}

#[tokio::test]
async fn ingest_then_load_from_settings() {
    let tmp = TempDir::new().unwrap();
    let corpus_path = tmp.path().join("all_reviews.json");
    std::fs::write(
        &corpus_path,
        r#"[
            {"author": "Freda", "review_date": "Reviewed December 2024", "rating": "5.0 out of 5", "pros": "Jira helps teams collaborate"},
            {"author": "Rajiv", "review_date": "06/12/2024", "overall_rating": 2, "cons": "Pricing is confusing"}
        ]"#,
    )
    .unwrap();
    let mut settings = Settings::default();
    settings.data.corpus_path = corpus_path.to_string_lossy().into_owned();
    settings.data.lancedb_dir = tmp.path().join("lancedb").to_string_lossy().into_owned();
    settings.embedding.use_fake = true;
    settings.embedding.fake_dim = 128;

    assert_eq!(ingest(&settings).await.unwrap(), 2);

    let retriever = ReviewIndexLoader::new(settings).load().await.unwrap();
    let docs = retriever.retrieve("pricing").await.unwrap();
    assert_eq!(docs[0].metadata.author, "Rajiv");
    assert_eq!(docs[0].metadata.review_date.as_deref(), Some("June 2024"));
}
