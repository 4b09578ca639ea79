//! The data-store boundary: a [`StoreConnector`] shared for the process
//! lifetime hands out [`DataStore`] handles bound to one caller's token.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gw_domain::error::Result;
use gw_domain::records::{
    Conversation, ConversationMessage, ConversationSummary, Document, Insight, NewConversation,
    NewDocument, NewInsight, NewPhotoAnalysis, NewProject, NewTask, PhotoAnalysis, Project,
    ProjectAnalysis, ProjectDetail, ProjectIncludes, ProjectTimeline, Task,
};

/// Task list filter. `None` fields are not filtered on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub project_id: Option<String>,
    pub status: Option<String>,
}

/// Insight list filter. `None` fields are not filtered on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsightFilter {
    pub project_id: Option<String>,
    pub insight_type: Option<String>,
}

pub trait StoreConnector: Send + Sync {
    /// A store handle acting with the permissions of `access_token`.
    fn connect(&self, access_token: &str) -> Arc<dyn DataStore>;
}

/// Every list is ordered by `created_at` descending. Lookups by id return
/// `Ok(None)` when no row matches. Writes return the stored row.
#[async_trait]
pub trait DataStore: Send + Sync {
    // ── projects ─────────────────────────────────────────────────────

    async fn list_projects(&self, status: Option<&str>) -> Result<Vec<Project>>;

    async fn get_project(&self, id: &str) -> Result<Option<Project>>;

    /// The project row with the requested related collections embedded.
    async fn project_detail(
        &self,
        id: &str,
        includes: ProjectIncludes,
    ) -> Result<Option<ProjectDetail>>;

    async fn create_project(&self, project: NewProject) -> Result<Project>;

    // ── tasks & documents ────────────────────────────────────────────

    async fn list_tasks(&self, filter: TaskFilter) -> Result<Vec<Task>>;

    async fn create_task(&self, task: NewTask) -> Result<Task>;

    async fn list_documents(&self, project_id: &str) -> Result<Vec<Document>>;

    async fn create_document(&self, document: NewDocument) -> Result<Document>;

    // ── conversations ────────────────────────────────────────────────

    async fn insert_conversation(&self, conversation: NewConversation) -> Result<Conversation>;

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>>;

    /// Overwrite the whole message array. Concurrent callers race and the
    /// last write wins.
    async fn replace_conversation_messages(
        &self,
        id: &str,
        messages: Vec<ConversationMessage>,
        updated_at: DateTime<Utc>,
    ) -> Result<Conversation>;

    async fn update_conversation_summary(
        &self,
        id: &str,
        summary: ConversationSummary,
    ) -> Result<()>;

    // ── insights ─────────────────────────────────────────────────────

    async fn insert_insight(&self, insight: NewInsight) -> Result<Insight>;

    async fn list_insights(&self, filter: InsightFilter) -> Result<Vec<Insight>>;

    // ── dashboard reads ──────────────────────────────────────────────

    async fn count_profiles(&self) -> Result<u64>;

    async fn recent_analyses(&self, limit: usize) -> Result<Vec<ProjectAnalysis>>;

    async fn latest_timeline(&self) -> Result<Option<ProjectTimeline>>;

    // ── photos ───────────────────────────────────────────────────────

    async fn create_photo_analysis(&self, photo: NewPhotoAnalysis) -> Result<PhotoAnalysis>;
}
