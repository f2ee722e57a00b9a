//! MQTT broker abstraction layer
//!
//! Provides trait-based abstractions over the broker session for
//! testability, the topic layout, and the real and dry-run sessions.

pub mod dry_run;
pub mod mqtt;
pub mod topics;
pub mod traits;

pub use dry_run::LogSession;
pub use mqtt::MqttSession;
pub use topics::Topics;
pub use traits::{BrokerEvent, BrokerObserver, BrokerSession, Message, Publisher, Qos, StatusLogger};
