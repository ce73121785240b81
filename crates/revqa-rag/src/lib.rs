//! revqa-rag
//!
//! Grounded question answering over the review corpus: prompt assembly with a
//! citation contract, the orchestrator that ties retrieval to generation, a
//! router between grounded answers and plain chat, and the chat path itself.

pub mod chat;
pub mod chatbot;
pub mod citations;
pub mod generator;
pub mod loader;
pub mod orchestrator;
pub mod prompt;
pub mod router;

pub use chat::{trim_history, ChatResponder, ConversationTurn, Speaker};
pub use chatbot::Chatbot;
pub use citations::{parse_answer, validate_citations, AnswerParts, CitationError};
pub use generator::{ChatMessage, ChatModel, OpenAiCompatibleClient, Role};
pub use loader::{ingest, IndexLoader, ReviewIndexLoader};
pub use orchestrator::RagOrchestrator;
pub use prompt::{assemble, GroundedPrompt, BLANK_QUERY_REPLY, FALLBACK_ANSWER, GENERIC_FAILURE};
pub use router::{QueryRouter, Route};
