//! Trait definitions for the diagnostic tool
//!
//! These traits abstract over the nvidia-smi subprocess to enable testing
//! with scripted output.

use crate::error::SmiError;

use std::fmt;
use std::io;
use std::sync::Arc;

/// Trait for the diagnostic tool invocations the bridge needs
pub trait DiagnosticTool {
    /// The line stream returned by [`DiagnosticTool::start_monitor`]
    type Stream: MetricStream;

    /// Check that the tool can be invoked at all
    fn check_available(&self) -> Result<(), SmiError>;

    /// Run the one-shot `index, name, uuid` inventory query
    fn query_inventory(&self) -> Result<String, SmiError>;

    /// Launch continuous sampling
    fn start_monitor(&self) -> Result<Self::Stream, SmiError>;
}

/// A finite-until-exit sequence of output lines
///
/// The iterator ends when the producer exits. Individual reads may fail
/// without ending the sequence (e.g., a non-UTF-8 line).
pub trait MetricStream: Iterator<Item = io::Result<String>> {
    /// Terminate the producer and reap it
    fn stop(&mut self) -> Result<(), SmiError>;

    /// A handle that can stop the producer from another thread
    fn stop_handle(&self) -> StopHandle;
}

/// Thread-safe trigger that terminates a running stream
///
/// Used by the signal handler to unblock a foreground read.
#[derive(Clone)]
pub struct StopHandle(Arc<dyn Fn() + Send + Sync>);

impl StopHandle {
    /// Wrap a stop action
    pub fn new(stop: impl Fn() + Send + Sync + 'static) -> Self {
        Self(Arc::new(stop))
    }

    /// A handle that does nothing
    pub fn noop() -> Self {
        Self::new(|| {})
    }

    /// Run the stop action
    pub fn stop(&self) {
        (self.0)()
    }
}

impl fmt::Debug for StopHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StopHandle")
    }
}
