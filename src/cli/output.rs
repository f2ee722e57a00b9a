//! Output formatting utilities
//!
//! Provides table and JSON output formatting for CLI commands.

use crate::cli::args::OutputFormat;
use crate::domain::{DiscoveryDescriptor, GpuInventory, GpuRecord};
use serde::Serialize;
use std::io::{self, Write};

/// Format and print output based on the selected format
pub fn print_output<T: Serialize + TableDisplay>(data: &T, format: OutputFormat) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    write_output(&mut handle, data, format)
}

/// Format output into any writer
pub fn write_output<W: Write, T: Serialize + TableDisplay>(
    out: &mut W,
    data: &T,
    format: OutputFormat,
) -> io::Result<()> {
    match format {
        OutputFormat::Table => {
            writeln!(out, "{}", data.to_table())?;
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(data).map_err(io::Error::other)?;
            writeln!(out, "{}", json)?;
        }
        OutputFormat::Compact => {
            writeln!(out, "{}", data.to_compact())?;
        }
    }

    Ok(())
}

/// Trait for types that can be displayed as a table
pub trait TableDisplay {
    /// Format as a table string
    fn to_table(&self) -> String;

    /// Format as a compact single line
    fn to_compact(&self) -> String {
        self.to_table().replace('\n', " | ")
    }
}

impl TableDisplay for GpuRecord {
    fn to_table(&self) -> String {
        self.to_string()
    }

    fn to_compact(&self) -> String {
        format!("{}:{}", self.index, self.short_name())
    }
}

/// GPU list for display
#[derive(Debug, Clone, Serialize)]
pub struct GpuList {
    pub gpus: Vec<GpuRecord>,
}

impl From<&GpuInventory> for GpuList {
    fn from(inventory: &GpuInventory) -> Self {
        Self {
            gpus: inventory.iter().cloned().collect(),
        }
    }
}

impl TableDisplay for GpuList {
    fn to_table(&self) -> String {
        let mut output = format!("GPUs Found: {}\n\n", self.gpus.len());

        for gpu in &self.gpus {
            output.push_str(&gpu.to_table());
            output.push('\n');
        }

        output
    }

    fn to_compact(&self) -> String {
        self.gpus
            .iter()
            .map(|g| g.to_compact())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Sensor descriptor table for display
#[derive(Debug, Clone, Serialize)]
pub struct SensorList {
    pub sensors: Vec<DiscoveryDescriptor>,
}

impl Default for SensorList {
    fn default() -> Self {
        Self {
            sensors: DiscoveryDescriptor::all().to_vec(),
        }
    }
}

impl TableDisplay for SensorList {
    fn to_table(&self) -> String {
        let mut output = format!("{:<8} {:<22} {:<5} {}\n", "COLUMN", "NAME", "UNIT", "CLASS");
        for sensor in &self.sensors {
            let class = sensor
                .device_class
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string());
            output.push_str(&format!(
                "{:<8} {:<22} {:<5} {}\n",
                sensor.key, sensor.name, sensor.unit, class
            ));
        }
        output
    }

    fn to_compact(&self) -> String {
        self.sensors
            .iter()
            .map(|s| format!("{}({})", s.key, s.unit))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
