//! Hosted data API client (`/rest/v1`).
//!
//! Each table is addressed as `/rest/v1/{table}` with PostgREST query
//! syntax: `col=eq.value` filters, `order=created_at.desc`, `limit=n`,
//! and `select=*,alias:table(*)` for embedded relations.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gw_domain::error::{Error, Result};
use gw_domain::records::{
    tables, Conversation, ConversationMessage, ConversationSummary, Document, Insight,
    NewConversation, NewDocument, NewInsight, NewPhotoAnalysis, NewProject, NewTask,
    PhotoAnalysis, Project, ProjectAnalysis, ProjectDetail, ProjectIncludes, ProjectTimeline,
    Task,
};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::hosted::{from_reqwest, HostedClient};
use crate::store::{DataStore, InsightFilter, StoreConnector, TaskFilter};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Connector
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct HostedStoreConnector {
    client: Arc<HostedClient>,
}

impl HostedStoreConnector {
    pub fn new(client: Arc<HostedClient>) -> Self {
        Self { client }
    }
}

impl StoreConnector for HostedStoreConnector {
    fn connect(&self, access_token: &str) -> Arc<dyn DataStore> {
        Arc::new(PostgrestStore {
            client: self.client.clone(),
            access_token: access_token.to_owned(),
        })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Query building
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Query-string parameters for one table request.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Query {
    params: Vec<(String, String)>,
}

impl Query {
    pub(crate) fn select(columns: impl Into<String>) -> Self {
        Self {
            params: vec![("select".into(), columns.into())],
        }
    }

    pub(crate) fn eq(mut self, column: &str, value: &str) -> Self {
        self.params.push((column.into(), format!("eq.{value}")));
        self
    }

    /// `eq` filter applied only when `value` is present.
    pub(crate) fn eq_opt(self, column: &str, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.eq(column, v),
            None => self,
        }
    }

    pub(crate) fn newest_first(mut self) -> Self {
        self.params.push(("order".into(), "created_at.desc".into()));
        self
    }

    pub(crate) fn limit(mut self, n: usize) -> Self {
        self.params.push(("limit".into(), n.to_string()));
        self
    }

    pub(crate) fn params(&self) -> &[(String, String)] {
        &self.params
    }
}

/// `select` expression embedding the requested related collections under
/// the field names of [`ProjectDetail`].
pub(crate) fn detail_select(includes: ProjectIncludes) -> String {
    let mut select = String::from("*");
    if includes.tasks {
        select.push_str(",tasks(*)");
    }
    if includes.analyses {
        select.push_str(",analyses:project_analysis(*)");
    }
    if includes.timeline {
        select.push_str(",timeline:project_timelines(*)");
    }
    if includes.documents {
        select.push_str(",documents(*)");
    }
    if includes.insights {
        select.push_str(",insights:project_insights(*)");
    }
    select
}

/// Total from a `Content-Range` header such as `0-0/42` or `*/0`.
pub(crate) fn parse_content_range_total(header: &str) -> Option<u64> {
    header.rsplit('/').next()?.trim().parse().ok()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Store handle
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A data API handle bound to one caller's access token.
pub struct PostgrestStore {
    client: Arc<HostedClient>,
    access_token: String,
}

impl PostgrestStore {
    fn table_url(&self, table: &str) -> String {
        self.client.url(&format!("/rest/v1/{table}"))
    }

    async fn get_rows<T: DeserializeOwned>(&self, table: &str, query: Query) -> Result<Vec<T>> {
        let url = self.table_url(table);
        let rb = self.client.decorate(
            self.client.http().get(&url).query(query.params()),
            Some(&self.access_token),
        );
        let resp = self.client.execute(&format!("GET {table}"), rb).await?;
        let body = resp.text().await.map_err(from_reqwest)?;
        serde_json::from_str(&body)
            .map_err(|e| Error::Backend(format!("failed to parse {table} rows: {e}")))
    }

    async fn first_row<T: DeserializeOwned>(&self, table: &str, query: Query) -> Result<Option<T>> {
        let rows: Vec<T> = self.get_rows(table, query.limit(1)).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_row<B, T>(&self, table: &str, row: &B) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.table_url(table);
        let rb = self.client.decorate(
            self.client
                .http()
                .post(&url)
                .header("Prefer", "return=representation")
                .json(row),
            Some(&self.access_token),
        );
        let resp = self.client.execute(&format!("POST {table}"), rb).await?;
        let body = resp.text().await.map_err(from_reqwest)?;
        let rows: Vec<T> = serde_json::from_str(&body)
            .map_err(|e| Error::Backend(format!("failed to parse inserted {table} row: {e}")))?;
        rows.into_iter()
            .next()
            .ok_or_else(|| Error::Backend(format!("insert into {table} returned no row")))
    }

    async fn patch_rows<B, T>(&self, table: &str, query: Query, patch: &B) -> Result<Vec<T>>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.table_url(table);
        let rb = self.client.decorate(
            self.client
                .http()
                .patch(&url)
                .query(query.params())
                .header("Prefer", "return=representation")
                .json(patch),
            Some(&self.access_token),
        );
        let resp = self.client.execute(&format!("PATCH {table}"), rb).await?;
        let body = resp.text().await.map_err(from_reqwest)?;
        serde_json::from_str(&body)
            .map_err(|e| Error::Backend(format!("failed to parse updated {table} rows: {e}")))
    }
}

#[async_trait]
impl DataStore for PostgrestStore {
    async fn list_projects(&self, status: Option<&str>) -> Result<Vec<Project>> {
        let query = Query::select("*").eq_opt("status", status).newest_first();
        self.get_rows(tables::PROJECTS, query).await
    }

    async fn get_project(&self, id: &str) -> Result<Option<Project>> {
        self.first_row(tables::PROJECTS, Query::select("*").eq("id", id))
            .await
    }

    async fn project_detail(
        &self,
        id: &str,
        includes: ProjectIncludes,
    ) -> Result<Option<ProjectDetail>> {
        let query = Query::select(detail_select(includes)).eq("id", id);
        self.first_row(tables::PROJECTS, query).await
    }

    async fn create_project(&self, project: NewProject) -> Result<Project> {
        self.insert_row(tables::PROJECTS, &project).await
    }

    async fn list_tasks(&self, filter: TaskFilter) -> Result<Vec<Task>> {
        let query = Query::select("*")
            .eq_opt("project_id", filter.project_id.as_deref())
            .eq_opt("status", filter.status.as_deref())
            .newest_first();
        self.get_rows(tables::TASKS, query).await
    }

    async fn create_task(&self, task: NewTask) -> Result<Task> {
        self.insert_row(tables::TASKS, &task).await
    }

    async fn list_documents(&self, project_id: &str) -> Result<Vec<Document>> {
        let query = Query::select("*").eq("project_id", project_id).newest_first();
        self.get_rows(tables::DOCUMENTS, query).await
    }

    async fn create_document(&self, document: NewDocument) -> Result<Document> {
        self.insert_row(tables::DOCUMENTS, &document).await
    }

    async fn insert_conversation(&self, conversation: NewConversation) -> Result<Conversation> {
        self.insert_row(tables::CONVERSATIONS, &conversation).await
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>> {
        self.first_row(tables::CONVERSATIONS, Query::select("*").eq("id", id))
            .await
    }

    async fn replace_conversation_messages(
        &self,
        id: &str,
        messages: Vec<ConversationMessage>,
        updated_at: DateTime<Utc>,
    ) -> Result<Conversation> {
        let patch = serde_json::json!({ "messages": messages, "updated_at": updated_at });
        let rows: Vec<Conversation> = self
            .patch_rows(tables::CONVERSATIONS, Query::default().eq("id", id), &patch)
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| Error::Backend(format!("conversation {id} was not updated")))
    }

    async fn update_conversation_summary(
        &self,
        id: &str,
        summary: ConversationSummary,
    ) -> Result<()> {
        let rows: Vec<Conversation> = self
            .patch_rows(tables::CONVERSATIONS, Query::default().eq("id", id), &summary)
            .await?;
        if rows.is_empty() {
            return Err(Error::Backend(format!("conversation {id} was not updated")));
        }
        Ok(())
    }

    async fn insert_insight(&self, insight: NewInsight) -> Result<Insight> {
        self.insert_row(tables::PROJECT_INSIGHTS, &insight).await
    }

    async fn list_insights(&self, filter: InsightFilter) -> Result<Vec<Insight>> {
        let query = Query::select("*")
            .eq_opt("project_id", filter.project_id.as_deref())
            .eq_opt("insight_type", filter.insight_type.as_deref())
            .newest_first();
        self.get_rows(tables::PROJECT_INSIGHTS, query).await
    }

    async fn count_profiles(&self) -> Result<u64> {
        let url = self.table_url(tables::PROFILES);
        let query = Query::select("id").limit(1);
        let rb = self.client.decorate(
            self.client
                .http()
                .get(&url)
                .query(query.params())
                .header("Prefer", "count=exact"),
            Some(&self.access_token),
        );
        let resp = self.client.execute("GET profiles (count)", rb).await?;
        resp.headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total)
            .ok_or_else(|| Error::Backend("profiles count missing Content-Range".into()))
    }

    async fn recent_analyses(&self, limit: usize) -> Result<Vec<ProjectAnalysis>> {
        let query = Query::select("*").newest_first().limit(limit);
        self.get_rows(tables::PROJECT_ANALYSIS, query).await
    }

    async fn latest_timeline(&self) -> Result<Option<ProjectTimeline>> {
        self.first_row(tables::PROJECT_TIMELINES, Query::select("*").newest_first())
            .await
    }

    async fn create_photo_analysis(&self, photo: NewPhotoAnalysis) -> Result<PhotoAnalysis> {
        self.insert_row(tables::PHOTO_ANALYSES, &photo).await
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(q: &Query) -> Vec<(&str, &str)> {
        q.params()
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    #[test]
    fn insight_filter_builds_eq_and_order() {
        let q = Query::select("*")
            .eq_opt("project_id", None)
            .eq_opt("insight_type", Some("risk"))
            .newest_first();
        assert_eq!(
            pairs(&q),
            vec![
                ("select", "*"),
                ("insight_type", "eq.risk"),
                ("order", "created_at.desc"),
            ]
        );
    }

    #[test]
    fn limit_is_appended_last() {
        let q = Query::select("*").eq("id", "p1").limit(1);
        assert_eq!(pairs(&q).last(), Some(&("limit", "1")));
    }

    #[test]
    fn insight_context_select_embeds_three_relations() {
        assert_eq!(
            detail_select(ProjectIncludes::INSIGHT_CONTEXT),
            "*,analyses:project_analysis(*),timeline:project_timelines(*),documents(*)"
        );
        assert_eq!(detail_select(ProjectIncludes::default()), "*");
    }

    #[test]
    fn detail_page_select_includes_tasks_and_insights() {
        let select = detail_select(ProjectIncludes::DETAIL_PAGE);
        assert!(select.contains(",tasks(*)"));
        assert!(select.contains(",insights:project_insights(*)"));
        assert!(!select.contains("project_analysis"));
    }

    #[test]
    fn content_range_total() {
        assert_eq!(parse_content_range_total("0-0/42"), Some(42));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total("0-9/*"), None);
    }
}
