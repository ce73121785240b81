use std::sync::Arc;

use revqa_core::config::Settings;
use revqa_core::Result;

use crate::chat::{ChatResponder, ConversationTurn, Speaker};
use crate::generator::{ChatModel, OpenAiCompatibleClient};
use crate::loader::ReviewIndexLoader;
use crate::orchestrator::RagOrchestrator;
use crate::prompt::BLANK_QUERY_REPLY;
use crate::router::{QueryRouter, Route};

/// Routes each user message to the grounded answerer or to plain chat.
pub struct Chatbot {
    router: QueryRouter,
    orchestrator: Arc<RagOrchestrator>,
    responder: ChatResponder,
}

impl Chatbot {
    pub fn new(router: QueryRouter, orchestrator: Arc<RagOrchestrator>, responder: ChatResponder) -> Self {
        Self { router, orchestrator, responder }
    }

    /// Wire the default stack from settings: one HTTP client shared by the
    /// router, the grounded path and chat.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let model: Arc<dyn ChatModel> = Arc::new(OpenAiCompatibleClient::from_settings(&settings.llm)?);
        let loader = Arc::new(ReviewIndexLoader::new(settings.clone()));
        let orchestrator = Arc::new(RagOrchestrator::new(loader, Arc::clone(&model)));
        Ok(Self::new(QueryRouter::new(Arc::clone(&model)), orchestrator, ChatResponder::new(model, settings.chat.clone())))
    }

    pub fn orchestrator(&self) -> &Arc<RagOrchestrator> { &self.orchestrator }

    /// Reply to the last turn, which must come from the user.
    pub async fn reply(&self, turns: &[ConversationTurn]) -> String {
        let Some(last) = turns.last().filter(|t| t.speaker == Speaker::Human && !t.content.trim().is_empty()) else {
            return BLANK_QUERY_REPLY.to_string();
        };
        match self.router.route(&last.content).await {
            Route::Grounded => self.orchestrator.answer(&last.content).await,
            Route::Chat => self.responder.respond(turns).await,
        }
    }
}
