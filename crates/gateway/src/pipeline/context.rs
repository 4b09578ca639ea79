//! Context assembly. Lookups here never fail the request: a missing or
//! unreadable record yields empty context and a warning.

use gw_backend::DataStore;
use gw_domain::records::ProjectIncludes;
use gw_domain::trace::TraceEvent;
use serde_json::Value;

fn record(endpoint: &str, resource_id: Option<&str>, found: bool, context_chars: usize) {
    TraceEvent::ContextAssembled {
        endpoint: endpoint.to_owned(),
        resource_id: resource_id.map(str::to_owned),
        found,
        context_chars,
    }
    .emit();
}

/// `Project Context: {name} - {description}` for the chat prompt, or
/// `None` when no project was named or it cannot be read. An absent
/// description renders as `null`.
pub async fn chat_context(store: &dyn DataStore, project_id: Option<&str>) -> Option<String> {
    let project_id = project_id.filter(|id| !id.is_empty())?;

    let project = match store.get_project(project_id).await {
        Ok(Some(p)) => p,
        Ok(None) => {
            tracing::warn!(project_id, "chat context: project not found");
            record("chat", Some(project_id), false, 0);
            return None;
        }
        Err(e) => {
            tracing::warn!(project_id, error = %e, "chat context: project lookup failed");
            record("chat", Some(project_id), false, 0);
            return None;
        }
    };

    let text = format!(
        "Project Context: {} - {}",
        project.name,
        project.description.as_deref().unwrap_or("null")
    );
    record("chat", Some(project_id), true, text.len());
    Some(text)
}

/// The project row with its analyses, timeline and documents embedded, as
/// JSON. `Value::Null` when the project cannot be read.
pub async fn insight_context(store: &dyn DataStore, project_id: &str) -> Value {
    let detail = match store
        .project_detail(project_id, ProjectIncludes::INSIGHT_CONTEXT)
        .await
    {
        Ok(Some(detail)) => detail,
        Ok(None) => {
            tracing::warn!(project_id, "insight context: project not found");
            record("insights", Some(project_id), false, 0);
            return Value::Null;
        }
        Err(e) => {
            tracing::warn!(project_id, error = %e, "insight context: project lookup failed");
            record("insights", Some(project_id), false, 0);
            return Value::Null;
        }
    };

    match serde_json::to_value(&detail) {
        Ok(v) => {
            record("insights", Some(project_id), true, v.to_string().len());
            v
        }
        Err(e) => {
            tracing::warn!(project_id, error = %e, "insight context: serialization failed");
            Value::Null
        }
    }
}
