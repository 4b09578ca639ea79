use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Hosted backend (auth + data API)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "d_mode")]
    pub mode: BackendMode,
    /// Project URL of the hosted backend; `/auth/v1` and `/rest/v1` are
    /// resolved relative to it.
    #[serde(default = "d_url")]
    pub url: String,
    /// Public (anon) API key. Prefer `anon_key_env`.
    #[serde(default)]
    pub anon_key: Option<String>,
    #[serde(default = "d_anon_key_env")]
    pub anon_key_env: String,
    #[serde(default = "d_10000")]
    pub timeout_ms: u64,
    #[serde(default = "d_access_cookie")]
    pub access_cookie: String,
    #[serde(default = "d_refresh_cookie")]
    pub refresh_cookie: String,
    /// Accounts accepted by the in-memory auth service (`mode = "memory"`).
    #[serde(default)]
    pub dev_users: Vec<DevUser>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    /// Hosted auth + data API over HTTP.
    Hosted,
    /// In-process tables and accounts, nothing survives a restart.
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevUser {
    pub email: String,
    pub password: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            mode: BackendMode::Hosted,
            url: d_url(),
            anon_key: None,
            anon_key_env: d_anon_key_env(),
            timeout_ms: 10_000,
            access_cookie: d_access_cookie(),
            refresh_cookie: d_refresh_cookie(),
            dev_users: Vec::new(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_mode() -> BackendMode {
    BackendMode::Hosted
}
fn d_url() -> String {
    "http://localhost:54321".into()
}
fn d_anon_key_env() -> String {
    "SUPABASE_ANON_KEY".into()
}
fn d_10000() -> u64 {
    10_000
}
fn d_access_cookie() -> String {
    "sb-access-token".into()
}
fn d_refresh_cookie() -> String {
    "sb-refresh-token".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_session_cookie_names() {
        let cfg = BackendConfig::default();
        assert_eq!(cfg.mode, BackendMode::Hosted);
        assert_eq!(cfg.access_cookie, "sb-access-token");
        assert_eq!(cfg.refresh_cookie, "sb-refresh-token");
        assert_eq!(cfg.anon_key_env, "SUPABASE_ANON_KEY");
    }

    #[test]
    fn memory_mode_with_dev_users_parses() {
        let toml_str = r#"
            mode = "memory"

            [[dev_users]]
            email = "site@example.com"
            password = "hunter22"
        "#;
        let cfg: BackendConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.mode, BackendMode::Memory);
        assert_eq!(cfg.dev_users.len(), 1);
        assert_eq!(cfg.dev_users[0].email, "site@example.com");
    }
}
