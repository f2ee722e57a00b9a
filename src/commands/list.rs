//! List command implementation
//!
//! Lists all GPUs reported by nvidia-smi.

use crate::cli::args::OutputFormat;
use crate::cli::output::{print_output, GpuList};
use crate::commands::run::discover_gpus;
use crate::config::Config;
use crate::error::Result;
use crate::smi::NvidiaSmi;

/// Execute the list command
pub fn run_list(config: &Config, format: OutputFormat) -> Result<()> {
    let tool = NvidiaSmi::new(&config.smi);
    let inventory = discover_gpus(&tool)?;

    print_output(&GpuList::from(&inventory), format)?;

    Ok(())
}
