#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use chrono::{Duration, Utc};
use gw_backend::{AuthUser, Backend, MemoryAuth, MemoryStore};
use gw_domain::config::Config;
use gw_domain::error::{Error, Result};
use gw_domain::records::Project;
use gw_gateway::state::AppState;
use gw_providers::{ChatRequest, ChatResponse, LlmProvider, ProviderRegistry};
use serde_json::Value;
use tower::ServiceExt;

// ── Scripted LLM ────────────────────────────────────────────────────

/// Replays queued replies in order and records every request it sees.
#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    pub fn reply(&self, content: &str) {
        self.replies.lock().unwrap().push_back(Ok(content.to_owned()));
    }

    pub fn fail(&self, message: &str) {
        self.replies.lock().unwrap().push_back(Err(Error::Provider {
            provider: "scripted".into(),
            message: message.into(),
        }));
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse> {
        self.requests.lock().unwrap().push(req.clone());
        let content = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()))?;
        Ok(ChatResponse {
            content,
            usage: None,
            model: req.model.clone().unwrap_or_default(),
            finish_reason: Some("stop".into()),
        })
    }

    fn provider_id(&self) -> &str {
        "scripted"
    }
}

// ── App harness ─────────────────────────────────────────────────────

pub const PASSWORD: &str = "correct horse";

pub struct TestApp {
    pub app: Router,
    pub llm: Arc<ScriptedProvider>,
    pub auth: Arc<MemoryAuth>,
    pub store: MemoryStore,
    pub user: AuthUser,
    pub token: String,
}

impl TestApp {
    pub fn new() -> Self {
        let llm = Arc::new(ScriptedProvider::default());
        let auth = Arc::new(MemoryAuth::new());
        let store = MemoryStore::new();
        let user = auth.add_user("pm@example.com", PASSWORD);
        let token = auth.issue_token(&user, Duration::hours(1));

        let registry = ProviderRegistry::with_provider(llm.clone());
        let backend = Backend {
            auth: auth.clone(),
            store: Arc::new(store.clone()),
        };
        let state = AppState::new(Arc::new(Config::default()), Arc::new(registry), backend);

        Self {
            app: gw_gateway::api::app(state),
            llm,
            auth,
            store,
            user,
            token,
        }
    }

    pub async fn send(&self, req: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(req).await.unwrap()
    }

    /// POST a JSON body with the caller's bearer token.
    pub async fn post_json(&self, uri: &str, body: Value) -> (u16, Value) {
        let req = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        read_json(self.send(req).await).await
    }

    pub async fn get_json(&self, uri: &str) -> (u16, Value) {
        let req = Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
            .body(Body::empty())
            .unwrap();
        read_json(self.send(req).await).await
    }
}

pub async fn read_json(resp: Response<Body>) -> (u16, Value) {
    let status = resp.status().as_u16();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

pub fn project(id: &str, name: &str, description: Option<&str>, status: &str) -> Project {
    Project {
        id: id.into(),
        name: name.into(),
        description: description.map(Into::into),
        status: Some(status.into()),
        priority: None,
        location: None,
        start_date: None,
        end_date: None,
        budget: None,
        creator_id: "seed".into(),
        team_ids: None,
        created_at: Utc::now(),
        updated_at: None,
    }
}
