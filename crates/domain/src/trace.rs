use serde::Serialize;

/// Structured trace events emitted across all Groundwork crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    BackendCall {
        endpoint: String,
        status: u16,
        duration_ms: u64,
    },
    LlmRequest {
        provider: String,
        model: String,
        json_mode: bool,
        duration_ms: u64,
        prompt_tokens: Option<u32>,
        completion_tokens: Option<u32>,
    },
    SessionVerified {
        actor_id: String,
    },
    ContextAssembled {
        endpoint: String,
        resource_id: Option<String>,
        found: bool,
        context_chars: usize,
    },
    StructuredFallback {
        endpoint: String,
        content_chars: usize,
        reason: String,
    },
    RecordPersisted {
        table: String,
        record_id: String,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "gw_event");
    }
}
