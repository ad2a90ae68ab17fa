//! CLI argument parsing with subcommand architecture.

use clap::{Args, Parser, Subcommand};
use relay_core::config::LogFormat;

#[derive(Parser)]
#[command(
    name = "relay",
    version,
    about = "Chat-completion relay with one-time model fallback",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    // Used when no subcommand is given
    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the relay server (default when no subcommand is given)
    Run(RunArgs),
    /// Load and validate the config file, then print a summary
    CheckConfig(ConfigArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Path to config file
    #[arg(short, long, default_value = "config.yaml", env = "RELAY_CONFIG")]
    pub config: String,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Listen host
    #[arg(long, env = "RELAY_HOST")]
    pub host: Option<String>,

    /// Listen port
    #[arg(long, env = "RELAY_PORT")]
    pub port: Option<u16>,

    /// Log level (RUST_LOG takes precedence)
    #[arg(long, env = "RELAY_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Log output format: text or json (overrides config)
    #[arg(long, env = "RELAY_LOG_FORMAT")]
    pub log_format: Option<LogFormat>,
}

impl RunArgs {
    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_invocation_takes_run_args() {
        let cli = Cli::try_parse_from(["relay", "--host", "127.0.0.1"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.run.host.as_deref(), Some("127.0.0.1"));
    }

    #[test]
    fn test_run_overrides() {
        let cli = Cli::try_parse_from([
            "relay",
            "run",
            "--config",
            "/etc/relay.yaml",
            "--port",
            "8080",
            "--log-format",
            "json",
        ])
        .unwrap();
        let Some(Command::Run(args)) = cli.command else {
            panic!("expected run subcommand");
        };
        assert_eq!(args.config.config, "/etc/relay.yaml");
        assert_eq!(args.port, Some(8080));
        assert_eq!(args.log_format, Some(LogFormat::Json));
    }

    #[test]
    fn test_rejects_unknown_log_format() {
        assert!(Cli::try_parse_from(["relay", "run", "--log-format", "xml"]).is_err());
    }

    #[test]
    fn test_check_config_subcommand() {
        let cli = Cli::try_parse_from(["relay", "check-config", "-c", "x.yaml"]).unwrap();
        assert!(matches!(cli.command, Some(Command::CheckConfig(ref a)) if a.config == "x.yaml"));
    }
}
