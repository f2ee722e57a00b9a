//! Mock implementations for testing
//!
//! Provides a recording broker session, a scripted metric stream and a
//! scripted diagnostic tool for unit testing without GPUs or a broker.

use crate::broker::{BrokerSession, Message, Publisher};
use crate::error::{BrokerError, SmiError};
use crate::smi::{DiagnosticTool, MetricStream, StopHandle};

use std::collections::{HashSet, VecDeque};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Something the recording session observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Publish(Message),
    Disconnect,
}

/// Broker session that records every call
#[derive(Debug, Default)]
pub struct RecordingSession {
    log: Mutex<Vec<Recorded>>,
    failing_topics: HashSet<String>,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: make publishes to `topic` fail
    pub fn failing_on(mut self, topic: impl Into<String>) -> Self {
        self.failing_topics.insert(topic.into());
        self
    }

    /// Everything recorded so far
    pub fn recorded(&self) -> Vec<Recorded> {
        self.log.lock().unwrap().clone()
    }

    /// Published messages only
    pub fn messages(&self) -> Vec<Message> {
        self.recorded()
            .into_iter()
            .filter_map(|r| match r {
                Recorded::Publish(m) => Some(m),
                Recorded::Disconnect => None,
            })
            .collect()
    }

    /// Published messages on one topic
    pub fn messages_on(&self, topic: &str) -> Vec<Message> {
        self.messages()
            .into_iter()
            .filter(|m| m.topic == topic)
            .collect()
    }

    /// Topics in publish order
    pub fn topics(&self) -> Vec<String> {
        self.messages().into_iter().map(|m| m.topic).collect()
    }
}

impl Publisher for RecordingSession {
    fn publish(&self, message: Message) -> Result<(), BrokerError> {
        if self.failing_topics.contains(&message.topic) {
            return Err(BrokerError::Publish {
                topic: message.topic,
                message: "mock failure".to_string(),
            });
        }
        self.log.lock().unwrap().push(Recorded::Publish(message));
        Ok(())
    }
}

impl BrokerSession for RecordingSession {
    fn disconnect(&mut self) -> Result<(), BrokerError> {
        self.log.lock().unwrap().push(Recorded::Disconnect);
        Ok(())
    }
}

/// Metric stream replaying fixed lines
#[derive(Debug)]
pub struct ScriptedStream {
    lines: VecDeque<io::Result<String>>,
    yielded: usize,
    interrupt: Option<(usize, StopHandle)>,
    stopped: Arc<AtomicBool>,
    stop_calls: usize,
}

impl ScriptedStream {
    pub fn new(lines: &[&str]) -> Self {
        Self {
            lines: lines.iter().map(|l| Ok(l.to_string())).collect(),
            yielded: 0,
            interrupt: None,
            stopped: Arc::new(AtomicBool::new(false)),
            stop_calls: 0,
        }
    }

    /// Builder: append a read error
    pub fn with_error(mut self, kind: io::ErrorKind) -> Self {
        self.lines.push_back(Err(io::Error::new(kind, "scripted read error")));
        self
    }

    /// Builder: append more lines
    pub fn with_lines(mut self, lines: &[&str]) -> Self {
        self.lines.extend(lines.iter().map(|l| Ok(l.to_string())));
        self
    }

    /// Builder: run `action` just before yielding line number `after` (0-based)
    pub fn interrupt_at(mut self, after: usize, action: StopHandle) -> Self {
        self.interrupt = Some((after, action));
        self
    }

    /// Whether `stop` was called
    pub fn was_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Number of `stop` calls
    pub fn stop_calls(&self) -> usize {
        self.stop_calls
    }

    /// Lines not yet consumed
    pub fn remaining(&self) -> usize {
        self.lines.len()
    }
}

impl Iterator for ScriptedStream {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some((at, action)) = &self.interrupt {
            if *at == self.yielded {
                action.stop();
            }
        }
        if self.stopped.load(Ordering::SeqCst) {
            return None;
        }
        let line = self.lines.pop_front()?;
        self.yielded += 1;
        Some(line)
    }
}

impl MetricStream for ScriptedStream {
    fn stop(&mut self) -> Result<(), SmiError> {
        self.stop_calls += 1;
        self.stopped.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop_handle(&self) -> StopHandle {
        let stopped = Arc::clone(&self.stopped);
        StopHandle::new(move || stopped.store(true, Ordering::SeqCst))
    }
}

/// Diagnostic tool with canned responses
pub struct ScriptedTool {
    pub available: bool,
    pub inventory: Result<String, String>,
    pub stream: Mutex<Option<ScriptedStream>>,
}

impl ScriptedTool {
    pub fn new(inventory: &str, stream: ScriptedStream) -> Self {
        Self {
            available: true,
            inventory: Ok(inventory.to_string()),
            stream: Mutex::new(Some(stream)),
        }
    }
}

impl DiagnosticTool for ScriptedTool {
    type Stream = ScriptedStream;

    fn check_available(&self) -> Result<(), SmiError> {
        if self.available {
            Ok(())
        } else {
            Err(SmiError::NotFound("nvidia-smi".to_string()))
        }
    }

    fn query_inventory(&self) -> Result<String, SmiError> {
        self.inventory
            .clone()
            .map_err(|message| SmiError::CommandFailed {
                command: "nvidia-smi --query-gpu=index,name,uuid".to_string(),
                message,
            })
    }

    fn start_monitor(&self) -> Result<Self::Stream, SmiError> {
        self.stream
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| SmiError::SpawnFailed {
                command: "nvidia-smi dmon".to_string(),
                message: "no scripted stream".to_string(),
            })
    }
}
