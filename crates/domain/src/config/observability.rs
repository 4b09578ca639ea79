use serde::{Deserialize, Serialize};

use super::ConfigError;

/// `[observability]`: where Groundwork's spans go besides the JSON log.
///
/// Export is off unless `otlp_endpoint` names an `http(s)://` collector;
/// an empty string counts as unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
    #[serde(default = "d_service_name")]
    pub service_name: String,
    /// Fraction of traces kept, decided once per trace id.
    #[serde(default = "d_sample_rate")]
    pub sample_rate: f64,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            otlp_endpoint: None,
            service_name: d_service_name(),
            sample_rate: d_sample_rate(),
        }
    }
}

impl ObservabilityConfig {
    /// The collector to export to, if export is enabled.
    pub fn export_endpoint(&self) -> Option<&str> {
        self.otlp_endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }

    pub(super) fn check(&self, issues: &mut Vec<ConfigError>) {
        if !(0.0..=1.0).contains(&self.sample_rate) {
            issues.push(ConfigError::error(
                "observability.sample_rate",
                "sample_rate must be between 0.0 and 1.0",
            ));
        }
        let Some(endpoint) = self.export_endpoint() else {
            return;
        };
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            issues.push(ConfigError::error(
                "observability.otlp_endpoint",
                format!("\"{endpoint}\" is not an http(s) URL"),
            ));
        }
        if self.service_name.trim().is_empty() {
            issues.push(ConfigError::warning(
                "observability.service_name",
                "empty service name; spans will be hard to find in the collector",
            ));
        }
    }
}

fn d_service_name() -> String {
    "groundwork".into()
}

fn d_sample_rate() -> f64 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigSeverity;

    fn issues(cfg: &ObservabilityConfig) -> Vec<ConfigError> {
        let mut out = Vec::new();
        cfg.check(&mut out);
        out
    }

    #[test]
    fn blank_endpoint_disables_export() {
        let cfg: ObservabilityConfig = toml::from_str(r#"otlp_endpoint = "  ""#).unwrap();
        assert_eq!(cfg.export_endpoint(), None);
        assert!(issues(&cfg).is_empty());
    }

    #[test]
    fn collector_endpoint_is_trimmed() {
        let cfg: ObservabilityConfig =
            toml::from_str(r#"otlp_endpoint = " http://otel:4317 ""#).unwrap();
        assert_eq!(cfg.export_endpoint(), Some("http://otel:4317"));
        assert_eq!(cfg.service_name, "groundwork");
    }

    #[test]
    fn non_http_endpoint_is_an_error() {
        let cfg = ObservabilityConfig {
            otlp_endpoint: Some("otel:4317".into()),
            ..Default::default()
        };
        let found = issues(&cfg);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].field, "observability.otlp_endpoint");
        assert_eq!(found[0].severity, ConfigSeverity::Error);
    }

    #[test]
    fn out_of_range_sample_rate_is_an_error() {
        let cfg = ObservabilityConfig {
            sample_rate: 1.5,
            ..Default::default()
        };
        assert_eq!(issues(&cfg)[0].field, "observability.sample_rate");
    }

    #[test]
    fn empty_service_name_only_warns_when_exporting() {
        let mut cfg = ObservabilityConfig {
            service_name: String::new(),
            ..Default::default()
        };
        assert!(issues(&cfg).is_empty());
        cfg.otlp_endpoint = Some("https://collector.example".into());
        let found = issues(&cfg);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].severity, ConfigSeverity::Warning);
    }
}
