//! Decides whether a message goes to the grounded path or to plain chat.

use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::sync::{Arc, OnceLock};

use revqa_core::{RagError, Result};

use crate::generator::{ChatMessage, ChatModel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    #[serde(alias = "rag")]
    Grounded,
    #[serde(alias = "chatbot")]
    Chat,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Route::Grounded => "grounded",
            Route::Chat => "chat",
        })
    }
}

const ROUTER_PROMPT: &str = "You are a router responsible for selecting either 'grounded' or 'chat'. \
If the user asks something specifically related to Jira (a project management tool), or asks about project management \
without naming Jira, select 'grounded' so the answer comes from the Jira review knowledge base. \
Otherwise select 'chat'.\n\n\
Reply with a single JSON object and nothing else: {\"route\": \"grounded\"} or {\"route\": \"chat\"}.";

#[derive(Debug, Deserialize)]
struct RouteDecision {
    route: Route,
}

pub struct QueryRouter {
    model: Arc<dyn ChatModel>,
}

impl QueryRouter {
    pub fn new(model: Arc<dyn ChatModel>) -> Self { Self { model } }

    /// Never fails: any problem routes to [`Route::Chat`].
    pub async fn route(&self, query: &str) -> Route {
        match self.try_route(query).await {
            Ok(route) => {
                tracing::debug!("Router decision: {}", route);
                route
            }
            Err(e) => {
                tracing::warn!("{}; defaulting to chat", e);
                Route::Chat
            }
        }
    }

    pub async fn try_route(&self, query: &str) -> Result<Route> {
        let messages = [ChatMessage::system(ROUTER_PROMPT), ChatMessage::user(query)];
        let raw = self.model.complete(&messages).await.map_err(|e| RagError::ClassifierFailure(e.to_string()))?;
        parse_decision(&raw)
    }
}

fn json_object() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("static regex"))
}

/// Accepts bare JSON or JSON wrapped in prose or a code fence.
fn parse_decision(raw: &str) -> Result<Route> {
    let object = json_object()
        .find(raw)
        .ok_or_else(|| RagError::ClassifierFailure(format!("no JSON object in router reply: {raw:?}")))?;
    let decision: RouteDecision = serde_json::from_str(object.as_str())
        .map_err(|e| RagError::ClassifierFailure(format!("invalid router reply {raw:?}: {e}")))?;
    Ok(decision.route)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_fenced_replies() {
        assert_eq!(parse_decision(r#"{"route": "grounded"}"#).unwrap(), Route::Grounded);
        assert_eq!(parse_decision("```json\n{\"route\": \"chat\"}\n```").unwrap(), Route::Chat);
        assert_eq!(parse_decision(r#"{"route": "rag"}"#).unwrap(), Route::Grounded);
    }

    #[test]
    fn rejects_values_outside_the_enum() {
        assert!(matches!(parse_decision(r#"{"route": "search"}"#), Err(RagError::ClassifierFailure(_))));
        assert!(matches!(parse_decision("grounded"), Err(RagError::ClassifierFailure(_))));
        assert!(matches!(parse_decision(r#"{"path": "chat"}"#), Err(RagError::ClassifierFailure(_))));
    }
}
