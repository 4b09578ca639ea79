mod common;

use axum::body::Body;
use axum::http::{header, Request};
use chrono::{Duration, Utc};
use common::{project, read_json, TestApp};
use gw_domain::chat::Role;
use gw_domain::records::{Conversation, ConversationMessage, Insight};
use serde_json::json;

const PROJECT_ID: &str = "7d9f3c1e-2b4a-4e8f-9c6d-1a2b3c4d5e6f";

fn seeded_conversation(app: &TestApp, id: &str) {
    app.store.seed_conversation(Conversation {
        id: id.into(),
        user_id: app.user.id.clone(),
        project_id: Some(PROJECT_ID.into()),
        messages: vec![
            ConversationMessage::now(Role::User, "When can we pour the slab?"),
            ConversationMessage::now(Role::Assistant, "After the rebar inspection."),
        ],
        summary: None,
        tags: None,
        created_at: Some(Utc::now()),
        updated_at: None,
    });
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session gate
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn ai_routes_reject_missing_session_without_side_effects() {
    let app = TestApp::new();
    for uri in ["/ai/chat", "/ai/chat/summary", "/ai/insights"] {
        let req = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"message":"hi","conversationId":"c1","projectId":"p1","type":"risk"}"#))
            .unwrap();
        let (status, body) = read_json(app.send(req).await).await;
        assert_eq!(status, 401, "{uri}");
        assert_eq!(body["kind"], "unauthorized");
    }
    assert_eq!(app.llm.call_count(), 0);
    assert_eq!(app.store.write_count(), 0);
}

#[tokio::test]
async fn unknown_token_is_rejected() {
    let app = TestApp::new();
    let req = Request::builder()
        .uri("/ai/insights")
        .header(header::AUTHORIZATION, "Bearer not-a-token")
        .body(Body::empty())
        .unwrap();
    let (status, _) = read_json(app.send(req).await).await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn session_cookie_is_accepted() {
    let app = TestApp::new();
    app.llm.reply("Check the formwork first.");
    let req = Request::builder()
        .method("POST")
        .uri("/ai/chat")
        .header(header::COOKIE, format!("sb-access-token={}", app.token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"message":"What now?"}"#))
        .unwrap();
    let (status, body) = read_json(app.send(req).await).await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "Check the formwork first.");
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Chat
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn chat_with_project_context_records_conversation() {
    let app = TestApp::new();
    app.store
        .seed_project(project(PROJECT_ID, "Riverside Depot", None, "active"));
    app.llm.reply("Schedule the crane for Tuesday.");

    let (status, body) = app
        .post_json(
            "/ai/chat",
            json!({ "message": "What should we do next?", "projectId": PROJECT_ID }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "Schedule the crane for Tuesday.");

    let requests = app.llm.requests();
    assert_eq!(requests.len(), 1);
    let prompt = &requests[0].messages;
    assert_eq!(prompt.len(), 3);
    assert_eq!(prompt[0].role, Role::System);
    assert_eq!(prompt[1].content, "Project Context: Riverside Depot - null");
    assert_eq!(prompt[2].content, "What should we do next?");
    assert!(!requests[0].json_mode);
    assert!(requests[0].model.is_none(), "model is resolved by the provider");

    let rows = app.store.conversations();
    assert_eq!(rows.len(), 1);
    assert_eq!(body["conversationId"], rows[0].id.as_str());
    assert_eq!(rows[0].user_id, app.user.id);
    assert_eq!(rows[0].project_id.as_deref(), Some(PROJECT_ID));
    let turns: Vec<(Role, &str)> = rows[0]
        .messages
        .iter()
        .map(|m| (m.role, m.content.as_str()))
        .collect();
    assert_eq!(
        turns,
        vec![
            (Role::User, "What should we do next?"),
            (Role::Assistant, "Schedule the crane for Tuesday."),
        ]
    );
}

#[tokio::test]
async fn chat_without_project_sends_only_system_and_input() {
    let app = TestApp::new();
    app.llm.reply("ok");
    let (status, _) = app.post_json("/ai/chat", json!({ "message": "hello" })).await;
    assert_eq!(status, 200);
    assert_eq!(app.llm.requests()[0].messages.len(), 2);
}

#[tokio::test]
async fn two_sends_create_two_conversations() {
    let app = TestApp::new();
    app.llm.reply("first");
    app.llm.reply("second");
    let (_, a) = app.post_json("/ai/chat", json!({ "message": "same" })).await;
    let (_, b) = app.post_json("/ai/chat", json!({ "message": "same" })).await;
    assert_ne!(a["conversationId"], b["conversationId"]);
    assert_eq!(app.store.conversations().len(), 2);
}

#[tokio::test]
async fn continuation_appends_to_existing_conversation() {
    let app = TestApp::new();
    seeded_conversation(&app, "c1");
    app.llm.reply("Thursday works.");

    let (status, body) = app
        .post_json("/ai/chat", json!({ "message": "And the walls?", "conversationId": "c1" }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["conversationId"], "c1");

    let rows = app.store.conversations();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].messages.len(), 4);
    assert_eq!(rows[0].messages[3].content, "Thursday works.");
}

#[tokio::test]
async fn continuation_uses_the_conversation_project_for_context() {
    let app = TestApp::new();
    app.store
        .seed_project(project(PROJECT_ID, "Riverside Depot", None, "active"));
    seeded_conversation(&app, "c1");
    app.llm.reply("Pour on Friday.");

    let (status, _) = app
        .post_json("/ai/chat", json!({ "message": "And the slab?", "conversationId": "c1" }))
        .await;
    assert_eq!(status, 200);

    let prompt = &app.llm.requests()[0].messages;
    assert_eq!(prompt.len(), 3);
    assert_eq!(prompt[1].content, "Project Context: Riverside Depot - null");
    assert_eq!(prompt[2].content, "And the slab?");
}

#[tokio::test]
async fn continuation_of_unknown_conversation_is_404_before_generation() {
    let app = TestApp::new();
    let (status, body) = app
        .post_json("/ai/chat", json!({ "message": "hi", "conversationId": "missing" }))
        .await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "Conversation not found");
    assert_eq!(app.llm.call_count(), 0);
}

#[tokio::test]
async fn chat_generation_failure_writes_nothing() {
    let app = TestApp::new();
    app.llm.fail("upstream 503");
    let (status, body) = app.post_json("/ai/chat", json!({ "message": "hi" })).await;
    assert_eq!(status, 500);
    assert_eq!(body["kind"], "generation_failed");
    assert_eq!(body["error"], "Failed to process message");
    assert_eq!(app.store.write_count(), 0);
}

#[tokio::test]
async fn chat_persistence_failure_is_distinguished() {
    let app = TestApp::new();
    app.llm.reply("an answer nobody will see");
    app.store.set_write_failure(true);
    let (status, body) = app.post_json("/ai/chat", json!({ "message": "hi" })).await;
    assert_eq!(status, 500);
    assert_eq!(body["kind"], "persistence_failed");
    assert_eq!(app.llm.call_count(), 1);
}

#[tokio::test]
async fn malformed_chat_body_is_400() {
    let app = TestApp::new();
    let (status, body) = app.post_json("/ai/chat", json!({ "projectId": "p1" })).await;
    assert_eq!(status, 400);
    assert_eq!(body["kind"], "validation");
    assert_eq!(app.llm.call_count(), 0);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Summary
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn summary_updates_conversation_and_returns_parsed_object() {
    let app = TestApp::new();
    seeded_conversation(&app, "c1");
    app.llm
        .reply(r#"{"summary":"Slab pour waits on rebar inspection.","tags":["concrete","inspection"]}"#);

    let (status, body) = app
        .post_json("/ai/chat/summary", json!({ "conversationId": "c1" }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["summary"], "Slab pour waits on rebar inspection.");

    let req = &app.llm.requests()[0];
    assert!(req.json_mode);
    assert_eq!(req.messages.len(), 2);
    let transcript: serde_json::Value = serde_json::from_str(&req.messages[1].content).unwrap();
    assert_eq!(transcript[0]["content"], "When can we pour the slab?");

    let row = &app.store.conversations()[0];
    assert_eq!(row.summary.as_deref(), Some("Slab pour waits on rebar inspection."));
    assert_eq!(
        row.tags.clone().unwrap(),
        vec!["concrete".to_string(), "inspection".to_string()]
    );
    assert_eq!(row.messages.len(), 2);
}

#[tokio::test]
async fn summary_of_unknown_conversation_is_404_without_completion() {
    let app = TestApp::new();
    let (status, body) = app
        .post_json("/ai/chat/summary", json!({ "conversationId": "nope" }))
        .await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "Conversation not found");
    assert_eq!(app.llm.call_count(), 0);
    assert_eq!(app.store.write_count(), 0);
}

#[tokio::test]
async fn summary_with_non_json_completion_returns_empty_object() {
    let app = TestApp::new();
    seeded_conversation(&app, "c1");
    app.llm.reply("Sure! Here is a summary: the slab is late.");

    let (status, body) = app
        .post_json("/ai/chat/summary", json!({ "conversationId": "c1" }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({}));
    let row = &app.store.conversations()[0];
    assert!(row.summary.is_none());
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Insights
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn insight_generation_persists_parsed_data() {
    let app = TestApp::new();
    app.store
        .seed_project(project(PROJECT_ID, "Riverside Depot", Some("Cold storage"), "active"));
    app.llm.reply(r#"{"risks":["late steel delivery"],"score":0.7}"#);

    let (status, body) = app
        .post_json(
            "/ai/insights",
            json!({ "projectId": PROJECT_ID, "type": "risk", "data": { "weather": "rain" } }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["risks"][0], "late steel delivery");

    let req = &app.llm.requests()[0];
    assert!(req.json_mode);
    let input: serde_json::Value = serde_json::from_str(&req.messages[1].content).unwrap();
    assert_eq!(input["type"], "risk");
    assert_eq!(input["projectContext"]["name"], "Riverside Depot");
    assert_eq!(input["analysisData"]["weather"], "rain");

    let rows: Vec<Insight> = app.store.insights();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].project_id.as_deref(), Some(PROJECT_ID));
    assert_eq!(rows[0].insight_type.as_deref(), Some("risk"));
    assert_eq!(rows[0].creator_id.as_deref(), Some(app.user.id.as_str()));
    assert_eq!(rows[0].data, Some(body));
}

#[tokio::test]
async fn insight_for_unknown_project_uses_null_context() {
    let app = TestApp::new();
    app.llm.reply("not json at all");
    let (status, body) = app
        .post_json("/ai/insights", json!({ "projectId": "p-missing", "type": "cost" }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({}));

    let input: serde_json::Value =
        serde_json::from_str(&app.llm.requests()[0].messages[1].content).unwrap();
    assert!(input["projectContext"].is_null());
    assert!(input["analysisData"].is_null());
    assert_eq!(app.store.insights()[0].data, Some(json!({})));
}

#[tokio::test]
async fn insight_persistence_failure_reports_persistence_kind() {
    let app = TestApp::new();
    app.llm.reply("{}");
    app.store.set_write_failure(true);
    let (status, body) = app
        .post_json("/ai/insights", json!({ "projectId": PROJECT_ID, "type": "risk" }))
        .await;
    assert_eq!(status, 500);
    assert_eq!(body["kind"], "persistence_failed");
    assert_eq!(body["error"], "Failed to generate insights");
}

#[tokio::test]
async fn insight_list_filters_by_project_and_type() {
    let app = TestApp::new();
    let other = "00000000-0000-0000-0000-000000000000";
    for (id, project_id, kind) in [
        ("i1", PROJECT_ID, "risk"),
        ("i2", PROJECT_ID, "cost"),
        ("i3", other, "risk"),
    ] {
        app.store.seed_insight(Insight {
            id: id.into(),
            project_id: Some(project_id.into()),
            insight_type: Some(kind.into()),
            data: Some(json!({})),
            creator_id: Some(app.user.id.clone()),
            created_at: Some(Utc::now()),
            updated_at: None,
        });
    }

    let (status, body) = app
        .get_json(&format!("/ai/insights?projectId={PROJECT_ID}&type=risk"))
        .await;
    assert_eq!(status, 200);
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["i1"]);

    let (_, all) = app.get_json("/ai/insights?projectId=all").await;
    assert_eq!(all.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn insight_list_across_projects_filters_type_newest_first() {
    let app = TestApp::new();
    let other = "00000000-0000-0000-0000-000000000000";
    let now = Utc::now();
    for (id, project_id, kind, age) in [
        ("old-risk", PROJECT_ID, "risk", 30),
        ("cost", PROJECT_ID, "cost", 5),
        ("new-risk", other, "risk", 1),
        ("mid-risk", PROJECT_ID, "risk", 10),
    ] {
        app.store.seed_insight(Insight {
            id: id.into(),
            project_id: Some(project_id.into()),
            insight_type: Some(kind.into()),
            data: Some(json!({})),
            creator_id: Some(app.user.id.clone()),
            created_at: Some(now - Duration::minutes(age)),
            updated_at: None,
        });
    }

    let (status, body) = app.get_json("/ai/insights?projectId=all&type=risk").await;
    assert_eq!(status, 200);
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["new-risk", "mid-risk", "old-risk"]);
}

#[tokio::test]
async fn insight_list_bad_query_uses_validation_envelope() {
    let app = TestApp::new();
    let (status, body) = app
        .get_json(&format!("/ai/insights?projectId={PROJECT_ID}&projectId=all"))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["kind"], "validation");
    assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
}

#[tokio::test]
async fn insight_list_rejects_malformed_project_id() {
    let app = TestApp::new();
    app.store.set_read_failure(true);
    let (status, body) = app.get_json("/ai/insights?projectId=p1").await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Invalid projectId format");
}

#[tokio::test]
async fn insight_list_read_failure_is_500() {
    let app = TestApp::new();
    app.store.set_read_failure(true);
    let (status, body) = app.get_json("/ai/insights").await;
    assert_eq!(status, 500);
    assert_eq!(body["error"], "Failed to fetch insights");
}
