//! Prompt assembly and the single completion call.

use std::sync::Arc;

use gw_domain::chat::Message;
use gw_domain::error::{Error, Result};
use gw_providers::{ChatRequest, ProviderRegistry};

pub const CHAT_SYSTEM_PROMPT: &str = "You are a knowledgeable construction assistant. \
Provide clear, practical advice based on construction best practices.";

pub const SUMMARY_SYSTEM_PROMPT: &str = "Create a concise summary of this \
construction-related conversation, highlighting key points and decisions.";

pub const INSIGHTS_SYSTEM_PROMPT: &str =
    "Generate construction project insights based on the provided data and context.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Text,
    /// Ask the API for a JSON object (`response_format: json_object`).
    Json,
}

/// System instruction, then each non-empty context turn as a user turn,
/// then the caller's input as the final user turn.
pub fn build_prompt(system: &str, context: &[String], input: impl Into<String>) -> Vec<Message> {
    let mut messages = Vec::with_capacity(context.len() + 2);
    messages.push(Message::system(system));
    messages.extend(
        context
            .iter()
            .filter(|c| !c.is_empty())
            .map(|c| Message::user(c.clone())),
    );
    messages.push(Message::user(input));
    messages
}

/// Sends one prompt to the primary provider. The provider resolves the
/// model: its own `default_model`, else `[llm] model`.
#[derive(Clone)]
pub struct Generator {
    registry: Arc<ProviderRegistry>,
}

impl Generator {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self { registry }
    }

    /// Exactly one completion call. Returns the first choice's content
    /// (empty when the API sent none).
    pub async fn complete(&self, messages: Vec<Message>, mode: OutputMode) -> Result<String> {
        let provider = self
            .registry
            .primary()
            .ok_or_else(|| Error::Config("no LLM provider configured".into()))?;

        let req = ChatRequest {
            messages,
            json_mode: mode == OutputMode::Json,
            ..Default::default()
        };
        let resp = provider.chat(&req).await?;
        Ok(resp.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gw_domain::chat::Role;

    #[test]
    fn prompt_order_is_system_context_input() {
        let messages = build_prompt(
            CHAT_SYSTEM_PROMPT,
            &["Project Context: Depot - null".into(), "site is flooded".into()],
            "What's next?",
        );
        let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::User, Role::User]);
        assert_eq!(messages[1].content, "Project Context: Depot - null");
        assert_eq!(messages[3].content, "What's next?");
    }

    #[test]
    fn empty_context_turns_are_dropped() {
        let messages = build_prompt(SUMMARY_SYSTEM_PROMPT, &[String::new()], "[]");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, SUMMARY_SYSTEM_PROMPT);
    }

    #[tokio::test]
    async fn empty_registry_is_an_error() {
        let generator = Generator::new(Arc::new(ProviderRegistry::default()));
        let err = generator
            .complete(vec![Message::user("hi")], OutputMode::Text)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
