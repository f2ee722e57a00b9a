//! Run command implementation
//!
//! Supervises one bridge session: check the tool, read the inventory,
//! connect the broker, then hand over to the publish loop until the
//! stream ends or a signal arrives.

use crate::broker::{BrokerSession, LogSession, MqttSession, StatusLogger, Topics};
use crate::config::Config;
use crate::domain::GpuInventory;
use crate::error::{AppError, Result};
use crate::services::{Bridge, RunSummary, ShutdownSignal};
use crate::smi::{parse_inventory, DiagnosticTool, MetricStream, NvidiaSmi, StopHandle};

use std::sync::Arc;

/// Execute the run command
pub fn run_bridge(config: &Config, dry_run: bool) -> Result<()> {
    let tool = NvidiaSmi::new(&config.smi);
    let topics = Topics::from(&config.topics);

    let inventory = discover_gpus(&tool)?;
    let shutdown = ShutdownSignal::new();

    let summary = if dry_run {
        log::info!("Dry run: messages are logged, not published");
        let mut session = LogSession::new();
        monitor(&tool, &inventory, &topics, &mut session, &shutdown, |stop| {
            install_signal_handler(&shutdown, stop)
        })?
    } else {
        let mut session =
            MqttSession::connect(&config.broker, &topics, Arc::new(StatusLogger))?;
        monitor(&tool, &inventory, &topics, &mut session, &shutdown, |stop| {
            install_signal_handler(&shutdown, stop)
        })?
    };

    log::info!(
        "Session finished: {} row(s) published, {} dropped{}",
        summary.published,
        summary.dropped,
        if summary.interrupted { " (interrupted)" } else { "" }
    );
    Ok(())
}

/// Check the tool and read the GPU inventory
pub fn discover_gpus<T: DiagnosticTool>(tool: &T) -> Result<GpuInventory> {
    tool.check_available()?;

    let output = tool.query_inventory()?;
    let inventory = parse_inventory(&output);
    if inventory.is_empty() {
        return Err(AppError::NoGpusFound);
    }

    for gpu in inventory.iter() {
        log::info!("Found {}", gpu);
    }
    Ok(inventory)
}

/// Start sampling and run the publish loop on `session`
///
/// `arm` receives the stream's stop handle once sampling has started, so
/// the caller can wire it to a signal handler. If sampling cannot start or
/// `arm` fails, the session is still marked offline and disconnected.
pub fn monitor<T, B, F>(
    tool: &T,
    inventory: &GpuInventory,
    topics: &Topics,
    session: &mut B,
    shutdown: &ShutdownSignal,
    arm: F,
) -> Result<RunSummary>
where
    T: DiagnosticTool,
    B: BrokerSession,
    F: FnOnce(StopHandle) -> Result<()>,
{
    let bridge = Bridge::new(inventory, topics);

    let mut stream = match tool.start_monitor() {
        Ok(stream) => stream,
        Err(e) => {
            bridge.abandon(session);
            return Err(e.into());
        }
    };

    if let Err(e) = arm(stream.stop_handle()) {
        if let Err(stop_err) = stream.stop() {
            log::warn!("{}", stop_err);
        }
        bridge.abandon(session);
        return Err(e);
    }

    bridge.run(&mut stream, session, shutdown)
}

fn install_signal_handler(shutdown: &ShutdownSignal, stop: StopHandle) -> Result<()> {
    let shutdown = shutdown.clone();
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        shutdown.trigger();
        stop.stop();
    })
    .map_err(|e| AppError::Signal(e.to_string()))
}
