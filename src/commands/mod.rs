//! Command handlers
//!
//! Each command handler orchestrates the execution of a CLI command.

pub mod list;
pub mod run;
pub mod sensors;

pub use list::run_list;
pub use run::run_bridge;
pub use sensors::run_sensors;
