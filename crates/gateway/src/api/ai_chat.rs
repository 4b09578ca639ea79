//! `POST /ai/chat` and `POST /ai/chat/summary`.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use gw_domain::error::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::pipeline::context::chat_context;
use crate::pipeline::generate::{build_prompt, CHAT_SYSTEM_PROMPT, SUMMARY_SYSTEM_PROMPT};
use crate::pipeline::interpret::{interpret_structured, SummaryFields};
use crate::pipeline::persist::{record_chat_turn, record_summary};
use crate::pipeline::{ApiError, OutputMode, Session};
use crate::state::AppState;

const CHAT_FAILED: &str = "Failed to process message";
const SUMMARY_FAILED: &str = "Failed to generate conversation summary";
const CONVERSATION_NOT_FOUND: &str = "Conversation not found";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Chat
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatBody {
    pub message: String,
    #[serde(default)]
    pub project_id: Option<String>,
    /// Extra caller context. Strings are sent as-is, other JSON values
    /// serialized.
    #[serde(default)]
    pub context: Option<Value>,
    /// Continue this conversation instead of starting a new one.
    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub message: String,
    pub conversation_id: String,
}

fn caller_context(context: Option<Value>) -> Option<String> {
    match context? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

pub async fn chat(
    session: Session,
    State(state): State<AppState>,
    body: Result<Json<ChatBody>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::Validation(e.body_text()))?;
    let store = session.store.as_ref();

    let existing = match body.conversation_id.as_deref() {
        None => None,
        Some(id) => match store.get_conversation(id).await {
            Ok(Some(conversation)) => Some(conversation),
            Ok(None) => return Err(ApiError::NotFound(CONVERSATION_NOT_FOUND)),
            Err(e) => return Err(ApiError::persistence(CHAT_FAILED, &e)),
        },
    };

    let project_id = match &existing {
        Some(conversation) => conversation.project_id.clone(),
        None => body.project_id.clone(),
    };

    let mut context = Vec::new();
    context.extend(chat_context(store, project_id.as_deref()).await);
    context.extend(caller_context(body.context));

    let messages = build_prompt(CHAT_SYSTEM_PROMPT, &context, body.message.clone());
    let reply = state
        .generator()
        .complete(messages, OutputMode::Text)
        .await
        .map_err(|e| ApiError::generation(CHAT_FAILED, &e))?;

    let conversation = record_chat_turn(
        store,
        session.actor_id(),
        project_id,
        existing,
        &body.message,
        &reply,
    )
    .await
    .map_err(|e| ApiError::persistence(CHAT_FAILED, &e))?;

    tracing::info!(
        conversation_id = %conversation.id,
        turns = conversation.messages.len(),
        "chat turn recorded"
    );

    Ok(Json(ChatReply {
        message: reply,
        conversation_id: conversation.id,
    }))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Summary
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryBody {
    pub conversation_id: String,
}

pub async fn summary(
    session: Session,
    State(state): State<AppState>,
    body: Result<Json<SummaryBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::Validation(e.body_text()))?;
    let store = session.store.as_ref();

    let conversation = match store.get_conversation(&body.conversation_id).await {
        Ok(Some(conversation)) => conversation,
        Ok(None) => {
            tracing::debug!(conversation_id = %body.conversation_id, "summary: no such conversation");
            return Err(ApiError::NotFound(CONVERSATION_NOT_FOUND));
        }
        Err(e) => return Err(ApiError::persistence(SUMMARY_FAILED, &e)),
    };

    let transcript = serde_json::to_string(&conversation.messages)
        .map_err(|e| ApiError::generation(SUMMARY_FAILED, &Error::from(e)))?;
    let messages = build_prompt(SUMMARY_SYSTEM_PROMPT, &[], transcript);
    let content = state
        .generator()
        .complete(messages, OutputMode::Json)
        .await
        .map_err(|e| ApiError::generation(SUMMARY_FAILED, &e))?;

    let parsed = interpret_structured("summary", &content);
    record_summary(store, &conversation.id, SummaryFields::from_value(&parsed))
        .await
        .map_err(|e| ApiError::persistence(SUMMARY_FAILED, &e))?;

    Ok(Json(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn caller_context_rendering() {
        assert_eq!(caller_context(None), None);
        assert_eq!(caller_context(Some(Value::Null)), None);
        assert_eq!(caller_context(Some(json!("rainy week"))).as_deref(), Some("rainy week"));
        assert_eq!(
            caller_context(Some(json!({ "phase": "framing" }))).as_deref(),
            Some(r#"{"phase":"framing"}"#)
        );
    }

    #[test]
    fn chat_body_uses_camel_case() {
        let body: ChatBody = serde_json::from_value(json!({
            "message": "What's next?",
            "projectId": "p1",
            "conversationId": "c1"
        }))
        .unwrap();
        assert_eq!(body.project_id.as_deref(), Some("p1"));
        assert_eq!(body.conversation_id.as_deref(), Some("c1"));
        assert!(body.context.is_none());
    }
}
