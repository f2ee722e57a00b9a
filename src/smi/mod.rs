//! nvidia-smi abstraction layer
//!
//! Provides trait-based abstractions over the diagnostic subprocess for
//! testability, plus the parsers for its inventory and dmon output.

pub mod command;
pub mod inventory;
pub mod stream;
pub mod traits;

pub use command::{NvidiaSmi, SmiProcess};
pub use inventory::parse_inventory;
pub use stream::{read_schema, MetricSchema, ParsedLine};
pub use traits::{DiagnosticTool, MetricStream, StopHandle};
