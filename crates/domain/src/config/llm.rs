use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LLM provider system
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model identifier sent with every completion request.
    #[serde(default = "d_model")]
    pub model: String,
    /// HTTP timeout for a single completion call.
    #[serde(default = "d_120000u")]
    pub request_timeout_ms: u64,
    /// Provider used for generation. When `None`, the first provider that
    /// initialized successfully is used.
    #[serde(default)]
    pub default_provider: Option<String>,
    /// Registered LLM providers (data-driven: adding a provider = adding config).
    #[serde(default = "d_providers")]
    pub providers: Vec<ProviderConfig>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: d_model(),
            request_timeout_ms: 120_000,
            default_provider: None,
            providers: d_providers(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: String,
    pub kind: ProviderKind,
    pub base_url: String,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub default_model: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    OpenaiCompat,
    AzureOpenai,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    /// Header name (e.g. "Authorization", "api-key").
    #[serde(default)]
    pub header: Option<String>,
    /// Header value prefix (e.g. "Bearer ").
    #[serde(default)]
    pub prefix: Option<String>,
    /// Env var containing the key.
    #[serde(default)]
    pub env: Option<String>,
    /// Direct key (for config-only setups; prefer env).
    #[serde(default)]
    pub key: Option<String>,
}

// ── serde default helpers ───────────────────────────────────────────

fn d_model() -> String {
    "meta-llama/Meta-Llama-3.1-70B-Instruct-Turbo".into()
}
fn d_120000u() -> u64 {
    120_000
}
fn d_providers() -> Vec<ProviderConfig> {
    vec![ProviderConfig {
        id: "together".into(),
        kind: ProviderKind::OpenaiCompat,
        base_url: "https://api.together.xyz/v1".into(),
        auth: AuthConfig {
            env: Some("TOGETHER_API_KEY".into()),
            ..Default::default()
        },
        default_model: None,
    }]
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
