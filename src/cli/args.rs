//! CLI argument definitions using clap derive
//!
//! Defines all command-line arguments and subcommands. Broker and tool
//! settings can also come from the environment.

use crate::config::{Config, ConfigBuilder};
use crate::error::ConfigError;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

/// nvidia-smi to MQTT bridge
///
/// Publishes NVIDIA GPU metrics to an MQTT broker with Home Assistant
/// discovery.
#[derive(Parser, Debug)]
#[command(name = "nvsmi2ha")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format for list commands
    #[arg(long, global = true, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "NVSMI2HA_CONFIG")]
    pub config: Option<String>,

    /// MQTT broker host
    #[arg(long, global = true, env = "MQTT_BROKER")]
    pub broker: Option<String>,

    /// MQTT broker port
    #[arg(long, global = true, env = "MQTT_PORT")]
    pub port: Option<u16>,

    /// MQTT username
    #[arg(long, global = true, env = "MQTT_USERNAME")]
    pub username: Option<String>,

    /// MQTT password
    #[arg(long, global = true, env = "MQTT_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// MQTT client identifier
    #[arg(long, global = true, env = "MQTT_CLIENT_ID")]
    pub client_id: Option<String>,

    /// nvidia-smi executable
    #[arg(long, global = true, env = "NVIDIA_SMI")]
    pub smi_path: Option<String>,

    /// Sampling interval in seconds
    #[arg(long, global = true, value_parser = clap::value_parser!(u32).range(1..))]
    pub interval: Option<u32>,

    /// Dry run mode - log messages instead of publishing them
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Run the bridge (default)
    Run,

    /// List detected GPUs
    List,

    /// List the sensors advertised to Home Assistant
    Sensors,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Output format
#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format for machine parsing
    Json,
    /// Compact single-line format
    Compact,
}

impl Cli {
    /// Subcommand to run
    pub fn subcommand(&self) -> Commands {
        self.command.unwrap_or(Commands::Run)
    }

    /// Default log filter; `RUST_LOG` still takes precedence
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }

    /// Assemble the configuration from file, environment and flags
    pub fn load_config(&self) -> Result<Config, ConfigError> {
        ConfigBuilder::new()
            .with_file(self.config.as_deref())?
            .with_host(self.broker.clone())
            .with_port(self.port)
            .with_credentials(self.username.clone(), self.password.clone())
            .with_client_id(self.client_id.clone())
            .with_smi_path(self.smi_path.clone())
            .with_interval(self.interval)
            .build()
    }
}

/// Generate shell completions and print to stdout
pub fn generate_completions(shell: Shell) {
    write_completions(shell, &mut std::io::stdout());
}

/// Generate shell completions into `out`
pub fn write_completions<W: std::io::Write>(shell: Shell, out: &mut W) {
    let mut cmd = <Cli as CommandFactory>::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, out);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_command_is_run() {
        let args = Cli::try_parse_from(["nvsmi2ha"]).unwrap();
        assert_eq!(args.subcommand(), Commands::Run);
    }

    #[test]
    fn test_cli_parse_list() {
        let args = Cli::try_parse_from(["nvsmi2ha", "list"]).unwrap();
        assert_eq!(args.subcommand(), Commands::List);
    }

    #[test]
    fn test_cli_parse_verbose() {
        let args = Cli::try_parse_from(["nvsmi2ha", "-v", "run"]).unwrap();
        assert!(args.verbose);
        assert_eq!(args.log_filter(), "debug");
    }

    #[test]
    fn test_cli_default_log_filter() {
        let args = Cli::try_parse_from(["nvsmi2ha"]).unwrap();
        assert_eq!(args.log_filter(), "info");
    }

    #[test]
    fn test_cli_broker_flags_reach_config() {
        let args = Cli::try_parse_from([
            "nvsmi2ha",
            "--config",
            "/nonexistent/ignored.toml",
            "--broker",
            "mqtt.lan",
            "--port",
            "1884",
        ])
        .unwrap();
        assert_eq!(args.broker.as_deref(), Some("mqtt.lan"));
        assert_eq!(args.port, Some(1884));
        // an explicit config file must exist
        assert!(args.load_config().is_err());
    }

    #[test]
    fn test_cli_interval_validation() {
        assert!(Cli::try_parse_from(["nvsmi2ha", "--interval", "0"]).is_err());
        let args = Cli::try_parse_from(["nvsmi2ha", "--interval", "2", "run"]).unwrap();
        assert_eq!(args.interval, Some(2));
    }

    #[test]
    fn test_cli_port_validation() {
        assert!(Cli::try_parse_from(["nvsmi2ha", "--port", "70000"]).is_err());
    }

    #[test]
    fn test_cli_definition_is_valid() {
        <Cli as CommandFactory>::command().debug_assert();
    }

    #[test]
    fn test_completions_name_the_binary() {
        let mut out = Vec::new();
        write_completions(Shell::Bash, &mut out);
        let script = String::from_utf8(out).unwrap();
        assert!(script.contains("nvsmi2ha"));
        assert!(script.contains("sensors"));
    }

    #[test]
    fn test_cli_parse_dry_run() {
        let args = Cli::try_parse_from(["nvsmi2ha", "run", "--dry-run"]).unwrap();
        assert!(args.dry_run);
    }
}
