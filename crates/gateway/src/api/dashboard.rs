//! `GET /dashboard`: the landing-page aggregate.

use axum::extract::Json;
use gw_backend::TaskFilter;
use gw_domain::records::{Project, ProjectAnalysis, ProjectTimeline, Task};
use serde::Serialize;

use crate::pipeline::{ApiError, Session};

const RECENT_ACTIVITY_LIMIT: usize = 5;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub projects: Vec<Project>,
    pub tasks: Vec<Task>,
    pub team_count: u64,
    pub issues_count: usize,
    pub recent_activity: Vec<ProjectAnalysis>,
    pub timeline: Option<ProjectTimeline>,
}

/// The five reads run concurrently and all must succeed. The timeline is
/// decoration and falls back to `null`.
pub async fn dashboard(session: Session) -> Result<Json<Dashboard>, ApiError> {
    let store = session.store.as_ref();
    let todo = TaskFilter {
        project_id: None,
        status: Some("todo".into()),
    };

    let (projects, tasks, team_count, recent_activity, on_hold) = tokio::try_join!(
        store.list_projects(Some("active")),
        store.list_tasks(todo),
        store.count_profiles(),
        store.recent_analyses(RECENT_ACTIVITY_LIMIT),
        store.list_projects(Some("on_hold")),
    )
    .map_err(|e| ApiError::persistence("Failed to load dashboard", &e))?;

    let timeline = match store.latest_timeline().await {
        Ok(t) => t,
        Err(e) => {
            tracing::warn!(error = %e, "timeline unavailable for dashboard");
            None
        }
    };

    Ok(Json(Dashboard {
        projects,
        tasks,
        team_count,
        issues_count: on_hold.len(),
        recent_activity,
        timeline,
    }))
}
