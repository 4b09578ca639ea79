//! Persistence writers. Each call is one store write stamped with the
//! actor and the current time; nothing is retried.

use chrono::Utc;
use gw_backend::DataStore;
use gw_domain::chat::Role;
use gw_domain::error::Result;
use gw_domain::records::{
    tables, Conversation, ConversationMessage, ConversationSummary, Insight, NewConversation,
    NewInsight,
};
use gw_domain::trace::TraceEvent;
use serde_json::Value;

use crate::pipeline::interpret::SummaryFields;

fn persisted(table: &str, record_id: &str) {
    TraceEvent::RecordPersisted {
        table: table.to_owned(),
        record_id: record_id.to_owned(),
    }
    .emit();
}

/// Record one exchange. Without `existing`, a new conversation row holds
/// the two turns. With it, the full message array is rewritten with the
/// turns appended; a concurrent turn on the same row may be lost.
pub async fn record_chat_turn(
    store: &dyn DataStore,
    actor_id: &str,
    project_id: Option<String>,
    existing: Option<Conversation>,
    user_message: &str,
    assistant_message: &str,
) -> Result<Conversation> {
    let turns = [
        ConversationMessage::now(Role::User, user_message),
        ConversationMessage::now(Role::Assistant, assistant_message),
    ];

    let conversation = match existing {
        Some(conversation) => {
            let mut messages = conversation.messages;
            messages.extend(turns);
            store
                .replace_conversation_messages(&conversation.id, messages, Utc::now())
                .await?
        }
        None => {
            store
                .insert_conversation(NewConversation {
                    user_id: actor_id.to_owned(),
                    project_id,
                    messages: turns.to_vec(),
                    created_at: Utc::now(),
                })
                .await?
        }
    };

    persisted(tables::CONVERSATIONS, &conversation.id);
    Ok(conversation)
}

pub async fn record_summary(
    store: &dyn DataStore,
    conversation_id: &str,
    fields: SummaryFields,
) -> Result<()> {
    store
        .update_conversation_summary(
            conversation_id,
            ConversationSummary {
                summary: fields.summary,
                tags: fields.tags,
                updated_at: Some(Utc::now()),
            },
        )
        .await?;
    persisted(tables::CONVERSATIONS, conversation_id);
    Ok(())
}

pub async fn record_insight(
    store: &dyn DataStore,
    actor_id: &str,
    project_id: &str,
    insight_type: &str,
    data: Value,
) -> Result<Insight> {
    let insight = store
        .insert_insight(NewInsight {
            project_id: project_id.to_owned(),
            insight_type: insight_type.to_owned(),
            data,
            creator_id: actor_id.to_owned(),
            created_at: Utc::now(),
        })
        .await?;
    persisted(tables::PROJECT_INSIGHTS, &insight.id);
    Ok(insight)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gw_backend::MemoryStore;

    #[tokio::test]
    async fn new_turn_creates_two_message_row() {
        let store = MemoryStore::new();
        let conv = record_chat_turn(&store, "u1", Some("p1".into()), None, "hi", "hello")
            .await
            .unwrap();
        assert_eq!(conv.user_id, "u1");
        assert_eq!(conv.project_id.as_deref(), Some("p1"));
        let roles: Vec<Role> = conv.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
    }

    #[tokio::test]
    async fn continuation_appends_to_existing_row() {
        let store = MemoryStore::new();
        let first = record_chat_turn(&store, "u1", None, None, "one", "two")
            .await
            .unwrap();
        let second = record_chat_turn(&store, "u1", None, Some(first.clone()), "three", "four")
            .await
            .unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.messages.len(), 4);
        assert_eq!(second.messages[2].content, "three");
        assert_eq!(store.conversations().len(), 1);
    }

    #[tokio::test]
    async fn insight_write_failure_propagates() {
        let store = MemoryStore::new();
        store.set_write_failure(true);
        let result = record_insight(&store, "u1", "p1", "risk", serde_json::json!({})).await;
        assert!(result.is_err());
        assert!(store.insights().is_empty());
    }
}
