use std::sync::Arc;
use tokio::sync::OnceCell;

use revqa_core::timing::PhaseTimer;
use revqa_core::{RagError, Result};
use revqa_hybrid::HybridRetriever;

use crate::citations::validate_citations;
use crate::generator::{ChatMessage, ChatModel};
use crate::loader::IndexLoader;
use crate::prompt::{assemble, BLANK_QUERY_REPLY, FALLBACK_ANSWER, GENERIC_FAILURE};

/// Answers questions from the review corpus.
///
/// Create one per process and share it by `Arc`. The retrieval stack is built
/// on first use, once, even under concurrent first calls; a failed build is
/// attempted again on the next call.
pub struct RagOrchestrator {
    loader: Arc<dyn IndexLoader>,
    generator: Arc<dyn ChatModel>,
    retriever: OnceCell<HybridRetriever>,
}

impl RagOrchestrator {
    pub fn new(loader: Arc<dyn IndexLoader>, generator: Arc<dyn ChatModel>) -> Self {
        Self { loader, generator, retriever: OnceCell::new() }
    }

    /// Build the retrieval stack now instead of on the first question.
    pub async fn warm_up(&self) -> Result<()> {
        self.retriever().await.map(|_| ())
    }

    pub fn is_initialized(&self) -> bool { self.retriever.initialized() }

    /// Always yields a displayable reply; failures are logged and replaced by
    /// [`GENERIC_FAILURE`].
    pub async fn answer(&self, query: &str) -> String {
        if query.trim().is_empty() {
            return BLANK_QUERY_REPLY.to_string();
        }
        tracing::info!("Answering query: '{}'", query);
        match self.try_answer(query).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::error!("Failed to answer '{}': {}", query, e);
                GENERIC_FAILURE.to_string()
            }
        }
    }

    /// The grounded path with errors surfaced. An empty retrieval is not an
    /// error: it answers with [`FALLBACK_ANSWER`] without calling the model.
    pub async fn try_answer(&self, query: &str) -> Result<String> {
        let retriever = self.retriever().await?;
        let documents = {
            let _timer = PhaseTimer::start("retrieval");
            retriever.retrieve(query).await?
        };
        if documents.is_empty() {
            tracing::info!("No reviews retrieved; replying with the fallback answer");
            return Ok(FALLBACK_ANSWER.to_string());
        }

        let prompt = assemble(&documents, query);
        tracing::debug!("Grounded prompt:\n{}", prompt.system);
        let messages = [ChatMessage::system(prompt.system), ChatMessage::user(prompt.user)];
        let answer = {
            let _timer = PhaseTimer::start("generation");
            self.generator.complete(&messages).await?
        };
        if answer.trim().is_empty() {
            return Err(RagError::GenerationFailure("model returned an empty answer".into()));
        }
        if let Err(violation) = validate_citations(&answer) {
            tracing::warn!("Answer breaks the citation format: {}", violation);
        }
        Ok(answer)
    }

    async fn retriever(&self) -> Result<&HybridRetriever> {
        self.retriever
            .get_or_try_init(|| async {
                tracing::info!("Initializing retrieval stack");
                let _timer = PhaseTimer::start("retrieval initialization");
                self.loader.load().await
            })
            .await
    }
}
