//! nvsmi2ha - nvidia-smi to MQTT bridge
//!
//! Publishes NVIDIA GPU metrics to an MQTT broker and registers them with
//! Home Assistant.

use clap::Parser;
use nvsmi2ha::cli::args::{generate_completions, Cli, Commands};
use nvsmi2ha::commands::{run_bridge, run_list, run_sensors};
use nvsmi2ha::error::{AppError, BrokerError, SmiError};

fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging; --verbose raises the default filter to debug
    let env = env_logger::Env::default().default_filter_or(cli.log_filter());
    env_logger::Builder::from_env(env)
        .format_timestamp_secs()
        .init();

    // Run the appropriate command
    let result = run(&cli);

    if let Err(e) = result {
        log::error!("{}", e);
        print_error(&e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), AppError> {
    match cli.subcommand() {
        Commands::Run => {
            let config = cli.load_config()?;
            run_bridge(&config, cli.dry_run)
        }

        Commands::List => {
            let config = cli.load_config()?;
            run_list(&config, cli.format)
        }

        Commands::Sensors => run_sensors(cli.format),

        Commands::Completions { shell } => {
            generate_completions(shell);
            Ok(())
        }
    }
}

fn print_error(err: &AppError) {
    eprintln!("Error: {}", err);

    // Print helpful hints for common errors
    match err {
        AppError::Smi(SmiError::NotFound(_)) => {
            eprintln!();
            eprintln!("Hint: Make sure the NVIDIA driver is installed.");
            eprintln!("      Use --smi-path or NVIDIA_SMI if nvidia-smi is not on PATH.");
        }
        AppError::NoGpusFound => {
            eprintln!();
            eprintln!("Hint: Make sure you have an NVIDIA GPU installed.");
            eprintln!("      Check 'nvidia-smi' for GPU detection.");
        }
        AppError::Broker(BrokerError::ConnectionFailed { .. })
        | AppError::Broker(BrokerError::ConnectTimeout(_)) => {
            eprintln!();
            eprintln!("Hint: Check --broker/--port (MQTT_BROKER/MQTT_PORT) and credentials.");
        }
        _ => {}
    }
}
