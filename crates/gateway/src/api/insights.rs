//! `POST /ai/insights` and `GET /ai/insights`.

use std::sync::OnceLock;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Json, Query, State};
use gw_backend::InsightFilter;
use gw_domain::records::Insight;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::pipeline::context::insight_context;
use crate::pipeline::generate::{build_prompt, INSIGHTS_SYSTEM_PROMPT};
use crate::pipeline::interpret::interpret_structured;
use crate::pipeline::persist::record_insight;
use crate::pipeline::{ApiError, OutputMode, Session};
use crate::state::AppState;

const GENERATE_FAILED: &str = "Failed to generate insights";
const FETCH_FAILED: &str = "Failed to fetch insights";

/// Project ids accepted by the list filter: 36 hex digits or dashes.
fn is_project_id(candidate: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[0-9a-fA-F-]{36}$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(candidate))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Generate
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBody {
    pub project_id: String,
    #[serde(default)]
    pub data: Value,
    /// Stored as given; not checked against the known insight kinds.
    #[serde(rename = "type")]
    pub insight_type: String,
}

pub async fn generate(
    session: Session,
    State(state): State<AppState>,
    body: Result<Json<GenerateBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::Validation(e.body_text()))?;
    let store = session.store.as_ref();

    let project_context = insight_context(store, &body.project_id).await;
    let input = serde_json::json!({
        "type": body.insight_type,
        "projectContext": project_context,
        "analysisData": body.data,
    });

    let messages = build_prompt(INSIGHTS_SYSTEM_PROMPT, &[], input.to_string());
    let content = state
        .generator()
        .complete(messages, OutputMode::Json)
        .await
        .map_err(|e| ApiError::generation(GENERATE_FAILED, &e))?;

    let parsed = interpret_structured("insights", &content);
    let insight = record_insight(
        store,
        session.actor_id(),
        &body.project_id,
        &body.insight_type,
        parsed.clone(),
    )
    .await
    .map_err(|e| ApiError::persistence(GENERATE_FAILED, &e))?;

    tracing::info!(
        insight_id = %insight.id,
        project_id = %body.project_id,
        insight_type = %body.insight_type,
        "insight recorded"
    );
    Ok(Json(parsed))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// List
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default, rename = "type")]
    pub insight_type: Option<String>,
}

/// Turn the query into a store filter. A missing, empty or `all` project
/// id means every project; anything else must look like a UUID.
pub fn list_filter(query: ListQuery) -> Result<InsightFilter, ApiError> {
    let project_id = match query.project_id.filter(|p| !p.is_empty() && p != "all") {
        None => None,
        Some(id) if is_project_id(&id) => Some(id),
        Some(id) => {
            tracing::debug!(project_id = %id, "rejecting malformed projectId");
            return Err(ApiError::Validation("Invalid projectId format".into()));
        }
    };
    Ok(InsightFilter {
        project_id,
        insight_type: query.insight_type.filter(|t| !t.is_empty()),
    })
}

pub async fn list(
    session: Session,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<Insight>>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::Validation(e.body_text()))?;
    let filter = list_filter(query)?;
    let rows = session
        .store
        .list_insights(filter)
        .await
        .map_err(|e| ApiError::persistence(FETCH_FAILED, &e))?;
    Ok(Json(rows))
}
