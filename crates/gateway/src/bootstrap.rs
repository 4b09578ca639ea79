//! AppState construction extracted from `main.rs`.

use std::sync::Arc;

use anyhow::Context;

use gw_backend::create_backend;
use gw_domain::config::{Config, ConfigSeverity};
use gw_providers::registry::ProviderRegistry;

use crate::state::AppState;

/// Validate config, initialize every collaborator client and return a
/// fully-wired [`AppState`].
pub fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    let error_count = issues
        .iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .count();
    if error_count > 0 {
        anyhow::bail!("config validation failed with {error_count} error(s)");
    }

    // ── LLM providers ────────────────────────────────────────────────
    let llm = Arc::new(
        ProviderRegistry::from_config(&config.llm).context("initializing LLM providers")?,
    );
    if llm.is_empty() {
        tracing::info!(
            "no LLM providers initialized; configure API keys to enable the AI endpoints"
        );
    } else {
        tracing::info!(
            providers = ?llm.list_providers(),
            model = %config.llm.model,
            "LLM provider registry ready"
        );
    }

    // ── Auth + data store ────────────────────────────────────────────
    let backend = create_backend(&config.backend).context("creating backend clients")?;
    tracing::info!(mode = ?config.backend.mode, "backend clients ready");

    Ok(AppState::new(config, llm, backend))
}
