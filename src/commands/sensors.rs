//! Sensors command implementation
//!
//! Prints the sensors advertised to Home Assistant for known dmon columns.

use crate::cli::args::OutputFormat;
use crate::cli::output::{print_output, SensorList};
use crate::error::Result;

/// Execute the sensors command
pub fn run_sensors(format: OutputFormat) -> Result<()> {
    print_output(&SensorList::default(), format)?;
    Ok(())
}
