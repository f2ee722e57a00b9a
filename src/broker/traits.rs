//! Trait definitions for broker operations
//!
//! These traits abstract over the MQTT client to enable testing with a
//! recording session.

use crate::error::BrokerError;

use serde::Serialize;
use std::fmt;

/// MQTT delivery guarantee
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qos {
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

impl fmt::Display for Qos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self {
            Qos::AtMostOnce => 0,
            Qos::AtLeastOnce => 1,
            Qos::ExactlyOnce => 2,
        };
        write!(f, "{}", level)
    }
}

/// An outgoing message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: Qos,
    pub retain: bool,
}

impl Message {
    /// At-least-once, non-retained message
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            qos: Qos::AtLeastOnce,
            retain: false,
        }
    }

    /// Serialize `value` as the JSON payload
    pub fn json<T: Serialize + ?Sized>(
        topic: impl Into<String>,
        value: &T,
    ) -> Result<Self, BrokerError> {
        Ok(Self::new(topic, serde_json::to_vec(value)?))
    }

    /// Mark the message retained
    pub fn retained(mut self) -> Self {
        self.retain = true;
        self
    }

    /// Payload as text, for logging
    pub fn payload_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

/// Trait for anything that can publish messages
///
/// Implementations must be callable from the foreground loop while their
/// own network processing runs elsewhere.
pub trait Publisher: Send + Sync {
    /// Queue a message for delivery
    fn publish(&self, message: Message) -> Result<(), BrokerError>;
}

/// A broker session that can be closed
pub trait BrokerSession: Publisher {
    /// Disconnect and stop background network processing
    fn disconnect(&mut self) -> Result<(), BrokerError>;
}

/// Notifications from the broker's network loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerEvent {
    /// The broker accepted the session (also after a reconnect)
    Connected,
    /// A message arrived on a subscribed topic
    Message { topic: String, payload: String },
    /// The connection dropped; the client will reconnect
    ConnectionLost(String),
}

/// Observer invoked on the network thread for every [`BrokerEvent`]
pub trait BrokerObserver: Send + Sync {
    fn on_event(&self, event: &BrokerEvent);
}

/// Observer that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct StatusLogger;

impl BrokerObserver for StatusLogger {
    fn on_event(&self, event: &BrokerEvent) {
        match event {
            BrokerEvent::Connected => log::info!("Connected to MQTT broker"),
            BrokerEvent::Message { topic, payload } => {
                log::info!("Received '{}' on {}", payload, topic)
            }
            BrokerEvent::ConnectionLost(reason) => {
                log::warn!("MQTT connection lost: {}", reason)
            }
        }
    }
}
