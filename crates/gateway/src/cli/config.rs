use gw_domain::config::{Config, ConfigSeverity};

const MASK: &str = "********";

/// Parse and validate the config, printing any issues.
///
/// Returns `false` when at least one error-level issue was found.
pub fn validate(config: &Config, config_path: &str) -> bool {
    let issues = config.validate();

    if issues.is_empty() {
        println!("Config OK ({config_path})");
        return true;
    }

    let error_count = issues
        .iter()
        .filter(|e| e.severity == ConfigSeverity::Error)
        .count();
    let warning_count = issues.len() - error_count;

    for issue in &issues {
        println!("{issue}");
    }

    println!("\n{error_count} error(s), {warning_count} warning(s) in {config_path}");

    error_count == 0
}

/// Copy of the config with inline secrets replaced by a mask.
pub fn redacted(config: &Config) -> Config {
    let mut out = config.clone();
    if out.backend.anon_key.is_some() {
        out.backend.anon_key = Some(MASK.into());
    }
    for user in &mut out.backend.dev_users {
        user.password = MASK.into();
    }
    for provider in &mut out.llm.providers {
        if provider.auth.key.is_some() {
            provider.auth.key = Some(MASK.into());
        }
    }
    out
}

/// Dump the resolved config (with all defaults filled in) as TOML.
pub fn show(config: &Config) -> anyhow::Result<()> {
    let output = toml::to_string_pretty(&redacted(config))
        .map_err(|e| anyhow::anyhow!("serializing config: {e}"))?;
    print!("{output}");
    Ok(())
}
