mod backend;
mod llm;
mod observability;
mod server;

pub use backend::*;
pub use llm::*;
pub use observability::*;
pub use server::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl ConfigError {
    fn error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Error,
            field: field.into(),
            message: message.into(),
        }
    }

    fn warning(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Warning,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError::error("server.port", "port must be greater than 0"));
        }
        if self.server.host.is_empty() {
            errors.push(ConfigError::error("server.host", "host must not be empty"));
        }

        match self.backend.mode {
            BackendMode::Hosted => {
                if self.backend.url.is_empty() {
                    errors.push(ConfigError::error(
                        "backend.url",
                        "url must not be empty in hosted mode",
                    ));
                }
            }
            BackendMode::Memory => {
                if self.backend.dev_users.is_empty() {
                    errors.push(ConfigError::warning(
                        "backend.dev_users",
                        "memory backend has no dev users; nobody can sign in",
                    ));
                }
            }
        }
        if self.backend.access_cookie.is_empty() {
            errors.push(ConfigError::error(
                "backend.access_cookie",
                "cookie name must not be empty",
            ));
        }

        if self.llm.providers.is_empty() {
            errors.push(ConfigError::warning(
                "llm.providers",
                "no LLM providers configured",
            ));
        }
        if self.llm.model.is_empty() {
            errors.push(ConfigError::error("llm.model", "model must not be empty"));
        }

        for (i, provider) in self.llm.providers.iter().enumerate() {
            if provider.id.is_empty() {
                errors.push(ConfigError::error(
                    format!("llm.providers[{i}].id"),
                    "provider id must not be empty",
                ));
            }
            if provider.base_url.is_empty() {
                errors.push(ConfigError::error(
                    format!("llm.providers[{i}].base_url"),
                    "provider base_url must not be empty",
                ));
            }
        }

        if let Some(default) = &self.llm.default_provider {
            if !self.llm.providers.iter().any(|p| &p.id == default) {
                errors.push(ConfigError::error(
                    "llm.default_provider",
                    format!("unknown provider \"{default}\""),
                ));
            }
        }

        self.observability.check(&mut errors);

        // CORS: warn if wildcard is used.
        if self.server.cors.allowed_origins.len() == 1
            && self.server.cors.allowed_origins[0] == "*"
        {
            errors.push(ConfigError::warning(
                "server.cors.allowed_origins",
                "wildcard \"*\" allows all origins (not recommended for production)",
            ));
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_error(errors: &[ConfigError], field: &str) -> bool {
        errors
            .iter()
            .any(|e| e.field == field && e.severity == ConfigSeverity::Error)
    }

    #[test]
    fn default_config_has_no_errors() {
        let errors = Config::default().validate();
        assert!(errors.iter().all(|e| e.severity != ConfigSeverity::Error));
    }

    #[test]
    fn hosted_mode_requires_url() {
        let mut cfg = Config::default();
        cfg.backend.url.clear();
        assert!(has_error(&cfg.validate(), "backend.url"));
    }

    #[test]
    fn memory_mode_ignores_empty_url() {
        let mut cfg = Config::default();
        cfg.backend.mode = BackendMode::Memory;
        cfg.backend.url.clear();
        let errors = cfg.validate();
        assert!(!has_error(&errors, "backend.url"));
        assert!(errors.iter().any(|e| e.field == "backend.dev_users"));
    }

    #[test]
    fn unknown_default_provider_is_rejected() {
        let mut cfg = Config::default();
        cfg.llm.default_provider = Some("nope".into());
        assert!(has_error(&cfg.validate(), "llm.default_provider"));
    }

    #[test]
    fn wildcard_cors_is_a_warning() {
        let mut cfg = Config::default();
        cfg.server.cors.allowed_origins = vec!["*".into()];
        let errors = cfg.validate();
        let issue = errors
            .iter()
            .find(|e| e.field == "server.cors.allowed_origins")
            .unwrap();
        assert_eq!(issue.severity, ConfigSeverity::Warning);
        assert!(issue.to_string().starts_with("[WARN]"));
    }
}
