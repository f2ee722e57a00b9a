//! nvidia-smi subprocess implementation
//!
//! Runs the real executable for the presence check, the inventory query
//! and the dmon sampling stream.

use crate::config::SmiConfig;
use crate::error::SmiError;
use crate::smi::traits::{DiagnosticTool, MetricStream, StopHandle};

use std::io::{self, BufRead, BufReader, Lines};
use std::path::PathBuf;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::{Arc, Mutex, PoisonError};

/// The nvidia-smi executable
#[derive(Debug, Clone)]
pub struct NvidiaSmi {
    program: PathBuf,
    metrics: String,
    interval_seconds: Option<u32>,
}

impl NvidiaSmi {
    /// Create from the `[smi]` configuration section
    pub fn new(config: &SmiConfig) -> Self {
        Self {
            program: PathBuf::from(&config.path),
            metrics: config.metrics.clone(),
            interval_seconds: config.interval_seconds,
        }
    }

    fn inventory_args() -> [&'static str; 2] {
        ["--query-gpu=index,name,uuid", "--format=csv,noheader"]
    }

    fn monitor_args(&self) -> Vec<String> {
        let mut args = vec![
            "dmon".to_string(),
            "--format".to_string(),
            "csv".to_string(),
            "-s".to_string(),
            self.metrics.clone(),
        ];
        if let Some(interval) = self.interval_seconds {
            args.push("-d".to_string());
            args.push(interval.to_string());
        }
        args
    }

    fn describe(&self, args: &[impl AsRef<str>]) -> String {
        let mut command = self.program.display().to_string();
        for arg in args {
            command.push(' ');
            command.push_str(arg.as_ref());
        }
        command
    }
}

impl DiagnosticTool for NvidiaSmi {
    type Stream = SmiProcess;

    fn check_available(&self) -> Result<(), SmiError> {
        let resolved = which::which(&self.program)
            .map_err(|_| SmiError::NotFound(self.program.display().to_string()))?;
        log::debug!("Using {}", resolved.display());
        Ok(())
    }

    fn query_inventory(&self) -> Result<String, SmiError> {
        let args = Self::inventory_args();
        let command = self.describe(&args);
        log::debug!("Running {}", command);

        let output = Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|e| SmiError::CommandFailed {
                command: command.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let detail = if stderr.trim().is_empty() { stdout } else { stderr };
            return Err(SmiError::CommandFailed {
                command,
                message: format!("{} ({})", detail.trim(), output.status),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn start_monitor(&self) -> Result<Self::Stream, SmiError> {
        let args = self.monitor_args();
        let command = self.describe(&args);
        log::info!("Starting {}", command);

        let spawn_failed = |message: String| SmiError::SpawnFailed {
            command: command.clone(),
            message,
        };

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| spawn_failed(e.to_string()))?;

        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(spawn_failed("stdout was not captured".to_string()));
            }
        };

        Ok(SmiProcess::new(child, stdout))
    }
}

/// A running `nvidia-smi dmon` subprocess
///
/// Yields stdout lines until the process exits. The child is shared with
/// [`StopHandle`]s so a signal handler can kill it while the foreground
/// is blocked reading.
pub struct SmiProcess {
    lines: Lines<BufReader<ChildStdout>>,
    child: Arc<Mutex<Child>>,
    stopped: bool,
}

impl SmiProcess {
    fn new(child: Child, stdout: ChildStdout) -> Self {
        Self {
            lines: BufReader::new(stdout).lines(),
            child: Arc::new(Mutex::new(child)),
            stopped: false,
        }
    }
}

fn kill_child(child: &Mutex<Child>) -> io::Result<()> {
    let mut child = child.lock().unwrap_or_else(PoisonError::into_inner);
    if child.try_wait()?.is_some() {
        return Ok(());
    }
    match child.kill() {
        Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
        other => other,
    }
}

impl Iterator for SmiProcess {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.lines.next()
    }
}

impl MetricStream for SmiProcess {
    fn stop(&mut self) -> Result<(), SmiError> {
        if self.stopped {
            return Ok(());
        }
        self.stopped = true;

        kill_child(&self.child).map_err(SmiError::StopFailed)?;
        let status = self
            .child
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .wait()
            .map_err(SmiError::StopFailed)?;
        log::debug!("nvidia-smi exited with {}", status);
        Ok(())
    }

    fn stop_handle(&self) -> StopHandle {
        let child = Arc::clone(&self.child);
        StopHandle::new(move || {
            if let Err(e) = kill_child(&child) {
                log::warn!("Failed to terminate nvidia-smi: {}", e);
            }
        })
    }
}

impl Drop for SmiProcess {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::warn!("{}", e);
        }
    }
}
