//! Project CRUD plus the per-project task, document and photo routes.
//!
//! Request bodies use the stored column names. The caller becomes the
//! creator (or uploader) of every row written here.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, Path, Query};
use axum::http::StatusCode;
use chrono::Utc;
use gw_backend::TaskFilter;
use gw_domain::records::{
    Document, NewDocument, NewPhotoAnalysis, NewProject, NewTask, PhotoAnalysis, Project,
    ProjectDetail, ProjectIncludes, Task,
};
use serde::Deserialize;
use serde_json::Value;

use crate::pipeline::{ApiError, Session};

fn body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(b)| b).map_err(|e| ApiError::Validation(e.body_text()))
}

fn require(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::Validation(format!("{field} is required")));
    }
    Ok(())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Projects
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Default, Deserialize)]
pub struct ProjectQuery {
    #[serde(default)]
    pub status: Option<String>,
}

pub async fn list_projects(
    session: Session,
    Query(query): Query<ProjectQuery>,
) -> Result<Json<Vec<Project>>, ApiError> {
    let status = query.status.as_deref().filter(|s| !s.is_empty());
    let rows = session
        .store
        .list_projects(status)
        .await
        .map_err(|e| ApiError::persistence("Failed to fetch projects", &e))?;
    Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub struct CreateProject {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub budget: Option<f64>,
    #[serde(default)]
    pub team_ids: Option<Vec<String>>,
}

pub async fn create_project(
    session: Session,
    req: Result<Json<CreateProject>, JsonRejection>,
) -> Result<(StatusCode, Json<Project>), ApiError> {
    let req = body(req)?;
    require("name", &req.name)?;

    let project = session
        .store
        .create_project(NewProject {
            name: req.name,
            description: req.description,
            status: req.status,
            priority: req.priority,
            location: req.location,
            start_date: req.start_date,
            end_date: req.end_date,
            budget: req.budget,
            creator_id: session.actor_id().to_owned(),
            team_ids: req.team_ids,
            created_at: Utc::now(),
        })
        .await
        .map_err(|e| ApiError::persistence("Failed to create project", &e))?;

    tracing::info!(project_id = %project.id, "project created");
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get_project(
    session: Session,
    Path(id): Path<String>,
) -> Result<Json<ProjectDetail>, ApiError> {
    session
        .store
        .project_detail(&id, ProjectIncludes::DETAIL_PAGE)
        .await
        .map_err(|e| ApiError::persistence("Failed to fetch projects", &e))?
        .map(Json)
        .ok_or(ApiError::NotFound("Project not found"))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tasks
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Default, Deserialize)]
pub struct TaskQuery {
    #[serde(default)]
    pub status: Option<String>,
}

pub async fn list_tasks(
    session: Session,
    Path(project_id): Path<String>,
    Query(query): Query<TaskQuery>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let filter = TaskFilter {
        project_id: Some(project_id),
        status: query.status.filter(|s| !s.is_empty()),
    };
    let rows = session
        .store
        .list_tasks(filter)
        .await
        .map_err(|e| ApiError::persistence("Failed to fetch tasks", &e))?;
    Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub struct CreateTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub assignee_id: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub estimated_hours: Option<f64>,
    #[serde(default)]
    pub dependencies: Option<Vec<String>>,
}

pub async fn create_task(
    session: Session,
    Path(project_id): Path<String>,
    req: Result<Json<CreateTask>, JsonRejection>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let req = body(req)?;
    require("title", &req.title)?;

    let task = session
        .store
        .create_task(NewTask {
            project_id,
            title: req.title,
            description: req.description,
            status: req.status,
            priority: req.priority,
            assignee_id: req.assignee_id,
            creator_id: session.actor_id().to_owned(),
            due_date: req.due_date,
            estimated_hours: req.estimated_hours,
            dependencies: req.dependencies,
            created_at: Utc::now(),
        })
        .await
        .map_err(|e| ApiError::persistence("Failed to create task", &e))?;

    tracing::info!(task_id = %task.id, "task created");
    Ok((StatusCode::CREATED, Json(task)))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Documents
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn list_documents(
    session: Session,
    Path(project_id): Path<String>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let rows = session
        .store
        .list_documents(&project_id)
        .await
        .map_err(|e| ApiError::persistence("Failed to fetch documents", &e))?;
    Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub struct CreateDocument {
    pub name: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub url: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

pub async fn create_document(
    session: Session,
    Path(project_id): Path<String>,
    req: Result<Json<CreateDocument>, JsonRejection>,
) -> Result<(StatusCode, Json<Document>), ApiError> {
    let req = body(req)?;
    require("name", &req.name)?;
    require("url", &req.url)?;

    let document = session
        .store
        .create_document(NewDocument {
            project_id,
            name: req.name,
            doc_type: req.doc_type,
            url: req.url,
            category: req.category,
            tags: req.tags,
            metadata: req.metadata,
            uploader_id: session.actor_id().to_owned(),
            created_at: Utc::now(),
        })
        .await
        .map_err(|e| ApiError::persistence("Failed to create document", &e))?;

    tracing::info!(document_id = %document.id, "document created");
    Ok((StatusCode::CREATED, Json(document)))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Photos
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuePhoto {
    pub photo_url: String,
}

/// Queue a photo for analysis. Only the pending row is written; the
/// analysis itself happens elsewhere.
pub async fn queue_photo(
    session: Session,
    Path(project_id): Path<String>,
    req: Result<Json<QueuePhoto>, JsonRejection>,
) -> Result<(StatusCode, Json<PhotoAnalysis>), ApiError> {
    let req = body(req)?;
    require("photoUrl", &req.photo_url)?;

    let now = Utc::now();
    let row = session
        .store
        .create_photo_analysis(NewPhotoAnalysis {
            project_id,
            photo_url: req.photo_url,
            status: "pending".into(),
            analysis_result: serde_json::json!({
                "status": "pending",
                "timestamp": now.to_rfc3339(),
            }),
            creator_id: session.actor_id().to_owned(),
            created_at: now,
        })
        .await
        .map_err(|e| ApiError::persistence("Failed to queue photo analysis", &e))?;

    tracing::info!(photo_analysis_id = %row.id, "photo queued for analysis");
    Ok((StatusCode::CREATED, Json(row)))
}
