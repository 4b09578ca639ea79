//! In-process auth and data store, used for `backend.mode = "memory"` and
//! by the test suites.
//!
//! The store ignores row-level permissions: every bound handle sees every
//! row. Both services carry a failure switch so callers can exercise the
//! error paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use gw_domain::error::{Error, Result};
use gw_domain::records::{
    Conversation, ConversationMessage, ConversationSummary, Document, Insight, NewConversation,
    NewDocument, NewInsight, NewPhotoAnalysis, NewProject, NewTask, PhotoAnalysis, Project,
    ProjectAnalysis, ProjectDetail, ProjectIncludes, ProjectTimeline, Task,
};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::auth::{AuthProvider, AuthSession, AuthUser};
use crate::store::{DataStore, InsightFilter, StoreConnector, TaskFilter};

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Sort newest first. Rows without a timestamp go last.
fn newest_first<T>(rows: &mut [T], created_at: impl Fn(&T) -> Option<DateTime<Utc>>) {
    rows.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Auth
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

const TOKEN_TTL_SECS: i64 = 3600;

struct Account {
    password: String,
    user: AuthUser,
}

struct IssuedToken {
    user: AuthUser,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct MemoryAuth {
    accounts: RwLock<HashMap<String, Account>>,
    tokens: RwLock<HashMap<String, IssuedToken>>,
    unavailable: AtomicBool,
}

impl MemoryAuth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account. Re-adding an email replaces its password and
    /// keeps the user id.
    pub fn add_user(&self, email: &str, password: &str) -> AuthUser {
        let mut accounts = self.accounts.write();
        let user = match accounts.get(email) {
            Some(existing) => existing.user.clone(),
            None => AuthUser {
                id: new_id(),
                email: Some(email.to_owned()),
            },
        };
        accounts.insert(
            email.to_owned(),
            Account {
                password: password.to_owned(),
                user: user.clone(),
            },
        );
        user
    }

    /// Issue an access token for `user` that expires after `ttl`.
    pub fn issue_token(&self, user: &AuthUser, ttl: Duration) -> String {
        let token = format!("mem-{}", Uuid::new_v4().simple());
        self.tokens.write().insert(
            token.clone(),
            IssuedToken {
                user: user.clone(),
                expires_at: Utc::now() + ttl,
            },
        );
        token
    }

    /// Whether `token` is currently issued (expired tokens still count
    /// until they are revoked).
    pub fn is_issued(&self, token: &str) -> bool {
        self.tokens.read().contains_key(token)
    }

    /// When set, every call fails as if the service were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::Backend("auth service unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl AuthProvider for MemoryAuth {
    async fn get_user(&self, access_token: &str) -> Result<AuthUser> {
        self.check_available()?;
        let tokens = self.tokens.read();
        match tokens.get(access_token) {
            Some(issued) if issued.expires_at > Utc::now() => Ok(issued.user.clone()),
            Some(_) => Err(Error::Auth("token expired".into())),
            None => Err(Error::Auth("unknown token".into())),
        }
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession> {
        self.check_available()?;
        let user = {
            let accounts = self.accounts.read();
            match accounts.get(email) {
                Some(account) if account.password == password => account.user.clone(),
                _ => return Err(Error::Auth("invalid login credentials".into())),
            }
        };

        let access_token = self.issue_token(&user, Duration::seconds(TOKEN_TTL_SECS));
        let expires_at = Utc::now() + Duration::seconds(TOKEN_TTL_SECS);
        Ok(AuthSession {
            access_token,
            refresh_token: format!("mem-refresh-{}", Uuid::new_v4().simple()),
            expires_in: Some(TOKEN_TTL_SECS as u64),
            expires_at: Some(expires_at),
            user,
        })
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        self.check_available()?;
        match self.tokens.write().remove(access_token) {
            Some(_) => Ok(()),
            None => Err(Error::Auth("unknown token".into())),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Default)]
struct Tables {
    profiles: Vec<String>,
    projects: Vec<Project>,
    tasks: Vec<Task>,
    documents: Vec<Document>,
    conversations: Vec<Conversation>,
    insights: Vec<Insight>,
    timelines: Vec<ProjectTimeline>,
    analyses: Vec<ProjectAnalysis>,
    photos: Vec<PhotoAnalysis>,
}

#[derive(Default)]
struct Shared {
    tables: RwLock<Tables>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    writes: AtomicUsize,
}

/// Cloning shares the same tables.
#[derive(Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ── failure switches ─────────────────────────────────────────────

    /// When set, every write fails with `Error::Backend`.
    pub fn set_write_failure(&self, fail: bool) {
        self.shared.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// When set, every read fails with `Error::Backend`.
    pub fn set_read_failure(&self, fail: bool) {
        self.shared.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Writes that reached the tables (failed writes are not counted).
    pub fn write_count(&self) -> usize {
        self.shared.writes.load(Ordering::SeqCst)
    }

    // ── seeding & inspection ─────────────────────────────────────────

    pub fn seed_profile(&self, id: &str) {
        self.shared.tables.write().profiles.push(id.to_owned());
    }

    pub fn seed_project(&self, project: Project) {
        self.shared.tables.write().projects.push(project);
    }

    pub fn seed_task(&self, task: Task) {
        self.shared.tables.write().tasks.push(task);
    }

    pub fn seed_document(&self, document: Document) {
        self.shared.tables.write().documents.push(document);
    }

    pub fn seed_conversation(&self, conversation: Conversation) {
        self.shared.tables.write().conversations.push(conversation);
    }

    pub fn seed_insight(&self, insight: Insight) {
        self.shared.tables.write().insights.push(insight);
    }

    pub fn seed_timeline(&self, timeline: ProjectTimeline) {
        self.shared.tables.write().timelines.push(timeline);
    }

    pub fn seed_analysis(&self, analysis: ProjectAnalysis) {
        self.shared.tables.write().analyses.push(analysis);
    }

    pub fn conversations(&self) -> Vec<Conversation> {
        self.shared.tables.read().conversations.clone()
    }

    pub fn insights(&self) -> Vec<Insight> {
        self.shared.tables.read().insights.clone()
    }

    pub fn photo_analyses(&self) -> Vec<PhotoAnalysis> {
        self.shared.tables.read().photos.clone()
    }

    // ── internals ────────────────────────────────────────────────────

    fn read(&self) -> Result<parking_lot::RwLockReadGuard<'_, Tables>> {
        if self.shared.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::Backend("store read rejected".into()));
        }
        Ok(self.shared.tables.read())
    }

    /// Run `f` against the tables as one write.
    fn write<T>(&self, f: impl FnOnce(&mut Tables) -> Result<T>) -> Result<T> {
        if self.shared.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Backend("store write rejected".into()));
        }
        let mut tables = self.shared.tables.write();
        let out = f(&mut tables)?;
        self.shared.writes.fetch_add(1, Ordering::SeqCst);
        Ok(out)
    }
}

impl StoreConnector for MemoryStore {
    fn connect(&self, _access_token: &str) -> Arc<dyn DataStore> {
        Arc::new(self.clone())
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn list_projects(&self, status: Option<&str>) -> Result<Vec<Project>> {
        let mut rows: Vec<Project> = self
            .read()?
            .projects
            .iter()
            .filter(|p| status.is_none() || p.status.as_deref() == status)
            .cloned()
            .collect();
        newest_first(&mut rows, |p| Some(p.created_at));
        Ok(rows)
    }

    async fn get_project(&self, id: &str) -> Result<Option<Project>> {
        Ok(self.read()?.projects.iter().find(|p| p.id == id).cloned())
    }

    async fn project_detail(
        &self,
        id: &str,
        includes: ProjectIncludes,
    ) -> Result<Option<ProjectDetail>> {
        let t = self.read()?;
        let Some(project) = t.projects.iter().find(|p| p.id == id).cloned() else {
            return Ok(None);
        };
        let of_project = |pid: &Option<String>| pid.as_deref() == Some(id);

        Ok(Some(ProjectDetail {
            tasks: includes.tasks.then(|| {
                t.tasks.iter().filter(|r| of_project(&r.project_id)).cloned().collect()
            }),
            analyses: includes.analyses.then(|| {
                t.analyses.iter().filter(|r| of_project(&r.project_id)).cloned().collect()
            }),
            timeline: includes.timeline.then(|| {
                t.timelines.iter().filter(|r| of_project(&r.project_id)).cloned().collect()
            }),
            documents: includes.documents.then(|| {
                t.documents.iter().filter(|r| of_project(&r.project_id)).cloned().collect()
            }),
            insights: includes.insights.then(|| {
                t.insights.iter().filter(|r| of_project(&r.project_id)).cloned().collect()
            }),
            project,
        }))
    }

    async fn create_project(&self, p: NewProject) -> Result<Project> {
        self.write(|t| {
            let row = Project {
                id: new_id(),
                name: p.name,
                description: p.description,
                status: p.status,
                priority: p.priority,
                location: p.location,
                start_date: p.start_date,
                end_date: p.end_date,
                budget: p.budget,
                creator_id: p.creator_id,
                team_ids: p.team_ids,
                created_at: p.created_at,
                updated_at: None,
            };
            t.projects.push(row.clone());
            Ok(row)
        })
    }

    async fn list_tasks(&self, filter: TaskFilter) -> Result<Vec<Task>> {
        let mut rows: Vec<Task> = self
            .read()?
            .tasks
            .iter()
            .filter(|r| {
                filter.project_id.is_none() || r.project_id == filter.project_id
            })
            .filter(|r| filter.status.is_none() || r.status == filter.status)
            .cloned()
            .collect();
        newest_first(&mut rows, |r| Some(r.created_at));
        Ok(rows)
    }

    async fn create_task(&self, n: NewTask) -> Result<Task> {
        self.write(|t| {
            let row = Task {
                id: new_id(),
                project_id: Some(n.project_id),
                title: n.title,
                description: n.description,
                status: n.status,
                priority: n.priority,
                assignee_id: n.assignee_id,
                creator_id: n.creator_id,
                due_date: n.due_date,
                estimated_hours: n.estimated_hours,
                actual_hours: None,
                dependencies: n.dependencies,
                created_at: n.created_at,
                updated_at: None,
            };
            t.tasks.push(row.clone());
            Ok(row)
        })
    }

    async fn list_documents(&self, project_id: &str) -> Result<Vec<Document>> {
        let mut rows: Vec<Document> = self
            .read()?
            .documents
            .iter()
            .filter(|r| r.project_id.as_deref() == Some(project_id))
            .cloned()
            .collect();
        newest_first(&mut rows, |r| Some(r.created_at));
        Ok(rows)
    }

    async fn create_document(&self, n: NewDocument) -> Result<Document> {
        self.write(|t| {
            let row = Document {
                id: new_id(),
                project_id: Some(n.project_id),
                name: n.name,
                doc_type: n.doc_type,
                url: n.url,
                category: n.category,
                tags: n.tags,
                metadata: n.metadata,
                approval_status: None,
                version: Some(1),
                uploader_id: n.uploader_id,
                created_at: n.created_at,
                updated_at: None,
            };
            t.documents.push(row.clone());
            Ok(row)
        })
    }

    async fn insert_conversation(&self, n: NewConversation) -> Result<Conversation> {
        self.write(|t| {
            let row = Conversation {
                id: new_id(),
                user_id: n.user_id,
                project_id: n.project_id,
                messages: n.messages,
                summary: None,
                tags: None,
                created_at: Some(n.created_at),
                updated_at: None,
            };
            t.conversations.push(row.clone());
            Ok(row)
        })
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>> {
        Ok(self
            .read()?
            .conversations
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn replace_conversation_messages(
        &self,
        id: &str,
        messages: Vec<ConversationMessage>,
        updated_at: DateTime<Utc>,
    ) -> Result<Conversation> {
        self.write(|t| {
            let row = t
                .conversations
                .iter_mut()
                .find(|c| c.id == id)
                .ok_or_else(|| Error::Backend(format!("conversation {id} was not updated")))?;
            row.messages = messages;
            row.updated_at = Some(updated_at);
            Ok(row.clone())
        })
    }

    async fn update_conversation_summary(
        &self,
        id: &str,
        summary: ConversationSummary,
    ) -> Result<()> {
        self.write(|t| {
            let row = t
                .conversations
                .iter_mut()
                .find(|c| c.id == id)
                .ok_or_else(|| Error::Backend(format!("conversation {id} was not updated")))?;
            row.summary = summary.summary;
            row.tags = summary.tags;
            row.updated_at = summary.updated_at;
            Ok(())
        })
    }

    async fn insert_insight(&self, n: NewInsight) -> Result<Insight> {
        self.write(|t| {
            let row = Insight {
                id: new_id(),
                project_id: Some(n.project_id),
                insight_type: Some(n.insight_type),
                data: Some(n.data),
                creator_id: Some(n.creator_id),
                created_at: Some(n.created_at),
                updated_at: None,
            };
            t.insights.push(row.clone());
            Ok(row)
        })
    }

    async fn list_insights(&self, filter: InsightFilter) -> Result<Vec<Insight>> {
        let mut rows: Vec<Insight> = self
            .read()?
            .insights
            .iter()
            .filter(|r| filter.project_id.is_none() || r.project_id == filter.project_id)
            .filter(|r| filter.insight_type.is_none() || r.insight_type == filter.insight_type)
            .cloned()
            .collect();
        newest_first(&mut rows, |r| r.created_at);
        Ok(rows)
    }

    async fn count_profiles(&self) -> Result<u64> {
        Ok(self.read()?.profiles.len() as u64)
    }

    async fn recent_analyses(&self, limit: usize) -> Result<Vec<ProjectAnalysis>> {
        let mut rows = self.read()?.analyses.clone();
        newest_first(&mut rows, |r| r.created_at);
        rows.truncate(limit);
        Ok(rows)
    }

    async fn latest_timeline(&self) -> Result<Option<ProjectTimeline>> {
        let mut rows = self.read()?.timelines.clone();
        newest_first(&mut rows, |r| r.created_at);
        Ok(rows.into_iter().next())
    }

    async fn create_photo_analysis(&self, n: NewPhotoAnalysis) -> Result<PhotoAnalysis> {
        self.write(|t| {
            let row = PhotoAnalysis {
                id: new_id(),
                project_id: Some(n.project_id),
                photo_url: n.photo_url,
                status: Some(n.status),
                analysis_result: n.analysis_result,
                creator_id: Some(n.creator_id),
                created_at: Some(n.created_at),
                updated_at: None,
            };
            t.photos.push(row.clone());
            Ok(row)
        })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use gw_domain::chat::Role;

    fn insight(project: &str, kind: &str, minutes_ago: i64) -> Insight {
        Insight {
            id: new_id(),
            project_id: Some(project.into()),
            insight_type: Some(kind.into()),
            data: Some(serde_json::json!({ "kind": kind })),
            creator_id: Some("u1".into()),
            created_at: Some(Utc::now() - Duration::minutes(minutes_ago)),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn insights_filter_and_sort_newest_first() {
        let store = MemoryStore::new();
        store.seed_insight(insight("p1", "risk", 30));
        store.seed_insight(insight("p2", "risk", 5));
        store.seed_insight(insight("p1", "cost", 1));

        let risk = store
            .list_insights(InsightFilter {
                insight_type: Some("risk".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(risk.len(), 2);
        assert_eq!(risk[0].project_id.as_deref(), Some("p2"));

        let p1 = store
            .list_insights(InsightFilter {
                project_id: Some("p1".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(p1.len(), 2);
        assert_eq!(p1[0].insight_type.as_deref(), Some("cost"));
    }

    #[tokio::test]
    async fn write_failure_leaves_tables_untouched() {
        let store = MemoryStore::new();
        store.set_write_failure(true);
        let err = store
            .insert_conversation(NewConversation {
                user_id: "u1".into(),
                project_id: None,
                messages: vec![ConversationMessage::now(Role::User, "hi")],
                created_at: Utc::now(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Backend(_)));
        assert!(store.conversations().is_empty());
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn replace_messages_overwrites_whole_array() {
        let store = MemoryStore::new();
        let conv = store
            .insert_conversation(NewConversation {
                user_id: "u1".into(),
                project_id: Some("p1".into()),
                messages: vec![ConversationMessage::now(Role::User, "first")],
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let mut messages = conv.messages.clone();
        messages.push(ConversationMessage::now(Role::Assistant, "reply"));
        let updated = store
            .replace_conversation_messages(&conv.id, messages, Utc::now())
            .await
            .unwrap();
        assert_eq!(updated.messages.len(), 2);
        assert!(updated.updated_at.is_some());
        assert_eq!(store.write_count(), 2);

        let missing = store
            .replace_conversation_messages("nope", Vec::new(), Utc::now())
            .await;
        assert!(missing.is_err());
    }

    #[tokio::test]
    async fn auth_round_trip() {
        let auth = MemoryAuth::new();
        let user = auth.add_user("pm@example.com", "secret");

        assert!(auth
            .sign_in_with_password("pm@example.com", "wrong")
            .await
            .unwrap_err()
            .is_auth());

        let session = auth
            .sign_in_with_password("pm@example.com", "secret")
            .await
            .unwrap();
        assert_eq!(session.user, user);
        assert_eq!(auth.get_user(&session.access_token).await.unwrap().id, user.id);

        auth.sign_out(&session.access_token).await.unwrap();
        assert!(auth.get_user(&session.access_token).await.unwrap_err().is_auth());
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let auth = MemoryAuth::new();
        let user = auth.add_user("a@example.com", "pw");
        let token = auth.issue_token(&user, Duration::seconds(-1));
        assert!(auth.get_user(&token).await.unwrap_err().is_auth());
    }

    #[tokio::test]
    async fn unavailable_auth_is_not_an_auth_error() {
        let auth = MemoryAuth::new();
        auth.set_unavailable(true);
        let err = auth.get_user("anything").await.unwrap_err();
        assert!(!err.is_auth());
    }
}
