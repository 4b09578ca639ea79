pub mod config;

use clap::{Parser, Subcommand};
use gw_domain::config::Config;

/// Groundwork: construction project management with AI-generated records.
#[derive(Debug, Parser)]
#[command(name = "groundwork", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP server (default when no subcommand is given).
    Serve,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults, secrets masked) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path named by `GW_CONFIG` (or
/// `config.toml` by default). A missing file yields the defaults.
pub fn load_config() -> anyhow::Result<(Config, String)> {
    let config_path = std::env::var("GW_CONFIG").unwrap_or_else(|_| "config.toml".into());
    let config = load_config_from(&config_path)?;
    Ok((config, config_path))
}

pub fn load_config_from(config_path: &str) -> anyhow::Result<Config> {
    if !std::path::Path::new(config_path).exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(config_path)
        .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
    toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = load_config_from("/nonexistent/groundwork.toml").unwrap();
        assert_eq!(cfg.server.port, 3000);
    }

    #[test]
    fn cli_parses_config_show() {
        let cli = Cli::parse_from(["groundwork", "config", "show"]);
        assert!(matches!(
            cli.command,
            Some(Command::Config(ConfigCommand::Show))
        ));
    }

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::parse_from(["groundwork"]);
        assert!(cli.command.is_none());
    }
}
