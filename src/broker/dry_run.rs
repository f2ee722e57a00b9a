//! Dry-run session
//!
//! Logs every message instead of sending it.

use crate::broker::traits::{BrokerSession, Message, Publisher};
use crate::error::BrokerError;

/// Session that writes messages to the log
#[derive(Debug, Default)]
pub struct LogSession {
    closed: bool,
}

impl LogSession {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Publisher for LogSession {
    fn publish(&self, message: Message) -> Result<(), BrokerError> {
        log::info!(
            "[DRY RUN] {} (qos {}{}): {}",
            message.topic,
            message.qos,
            if message.retain { ", retained" } else { "" },
            message.payload_str()
        );
        Ok(())
    }
}

impl BrokerSession for LogSession {
    fn disconnect(&mut self) -> Result<(), BrokerError> {
        if !self.closed {
            self.closed = true;
            log::info!("[DRY RUN] disconnect");
        }
        Ok(())
    }
}
