//! MQTT session implementation
//!
//! Wraps a `rumqttc` synchronous client. The connection's event loop runs
//! on a dedicated network thread that keeps the session alive, delivers
//! inbound messages to a [`BrokerObserver`], re-subscribes after
//! reconnects and flushes publishes queued by the foreground.

use crate::broker::topics::Topics;
use crate::broker::traits::{BrokerEvent, BrokerObserver, BrokerSession, Message, Publisher, Qos};
use crate::config::BrokerConfig;
use crate::domain::Availability;
use crate::error::BrokerError;

use rumqttc::{
    Client, ConnectReturnCode, Connection, Event, LastWill, MqttOptions, Outgoing, Packet, QoS,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

impl From<Qos> for QoS {
    fn from(qos: Qos) -> Self {
        match qos {
            Qos::AtMostOnce => QoS::AtMostOnce,
            Qos::AtLeastOnce => QoS::AtLeastOnce,
            Qos::ExactlyOnce => QoS::ExactlyOnce,
        }
    }
}

/// A connected MQTT session
pub struct MqttSession {
    client: Client,
    network: Option<JoinHandle<()>>,
    stopping: Arc<AtomicBool>,
}

impl MqttSession {
    /// Connect to the broker and start the network loop
    ///
    /// Returns once the broker has accepted the session. The last will
    /// marks the bridge offline if the connection drops uncleanly.
    pub fn connect(
        config: &BrokerConfig,
        topics: &Topics,
        observer: Arc<dyn BrokerObserver>,
    ) -> Result<Self, BrokerError> {
        let options = mqtt_options(config, topics);
        let (client, connection) = Client::new(options, config.queue_capacity);

        let stopping = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = mpsc::channel();

        let network = NetworkLoop {
            client: client.clone(),
            status_topic: topics.ha_status(),
            observer,
            stopping: Arc::clone(&stopping),
            ready: Some(ready_tx),
        };

        log::info!("Connecting to MQTT broker at {}", config.address());
        let handle = thread::Builder::new()
            .name("mqtt-network".to_string())
            .spawn(move || network.run(connection))
            .map_err(|e| BrokerError::NetworkLoop(e.to_string()))?;

        let outcome = match ready_rx.recv_timeout(config.connect_timeout()) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(message)) => Err(BrokerError::ConnectionFailed {
                address: config.address(),
                message,
            }),
            Err(RecvTimeoutError::Timeout) => {
                Err(BrokerError::ConnectTimeout(config.connect_timeout()))
            }
            Err(RecvTimeoutError::Disconnected) => Err(BrokerError::NetworkLoop(
                "network loop exited before connecting".to_string(),
            )),
        };

        if let Err(e) = outcome {
            // the thread exits on its next connection error
            stopping.store(true, Ordering::SeqCst);
            let _ = client.disconnect();
            return Err(e);
        }

        Ok(Self {
            client,
            network: Some(handle),
            stopping,
        })
    }
}

fn mqtt_options(config: &BrokerConfig, topics: &Topics) -> MqttOptions {
    let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
    options.set_keep_alive(config.keep_alive());
    if let Some(username) = &config.username {
        options.set_credentials(username, config.password.clone().unwrap_or_default());
    }
    options.set_last_will(LastWill::new(
        topics.availability(),
        Availability::Offline.as_str(),
        QoS::AtLeastOnce,
        true,
    ));
    options
}

impl Publisher for MqttSession {
    fn publish(&self, message: Message) -> Result<(), BrokerError> {
        let Message {
            topic,
            payload,
            qos,
            retain,
        } = message;
        self.client
            .publish(topic.clone(), qos.into(), retain, payload)
            .map_err(|e| BrokerError::Publish {
                topic,
                message: e.to_string(),
            })
    }
}

impl BrokerSession for MqttSession {
    fn disconnect(&mut self) -> Result<(), BrokerError> {
        let Some(handle) = self.network.take() else {
            return Ok(());
        };

        self.stopping.store(true, Ordering::SeqCst);
        self.client
            .disconnect()
            .map_err(|e| BrokerError::Disconnect(e.to_string()))?;

        handle
            .join()
            .map_err(|_| BrokerError::NetworkLoop("network thread panicked".to_string()))?;
        log::info!("Disconnected from MQTT broker");
        Ok(())
    }
}

impl Drop for MqttSession {
    fn drop(&mut self) {
        self.stopping.store(true, Ordering::SeqCst);
    }
}

/// State owned by the network thread
struct NetworkLoop {
    client: Client,
    status_topic: String,
    observer: Arc<dyn BrokerObserver>,
    stopping: Arc<AtomicBool>,
    ready: Option<Sender<Result<(), String>>>,
}

impl NetworkLoop {
    fn run(mut self, mut connection: Connection) {
        for notification in connection.iter() {
            match notification {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code != ConnectReturnCode::Success {
                        self.signal_ready(Err(format!("connection refused: {:?}", ack.code)));
                        break;
                    }
                    // never block here: this thread is the one draining the request queue
                    if let Err(e) = self.client.try_subscribe(&self.status_topic, QoS::AtMostOnce)
                    {
                        log::warn!("Failed to subscribe to {}: {}", self.status_topic, e);
                    }
                    self.observer.on_event(&BrokerEvent::Connected);
                    self.signal_ready(Ok(()));
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    self.observer.on_event(&BrokerEvent::Message {
                        topic: publish.topic.clone(),
                        payload: String::from_utf8_lossy(&publish.payload).into_owned(),
                    });
                }
                Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                    log::debug!("MQTT disconnect sent");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    if self.stopping.load(Ordering::SeqCst) {
                        break;
                    }
                    if self.ready.is_some() {
                        self.signal_ready(Err(e.to_string()));
                        break;
                    }
                    self.observer
                        .on_event(&BrokerEvent::ConnectionLost(e.to_string()));
                    thread::sleep(RECONNECT_DELAY);
                }
            }
        }
        log::debug!("MQTT network loop stopped");
    }

    fn signal_ready(&mut self, outcome: Result<(), String>) {
        if let Some(ready) = self.ready.take() {
            let _ = ready.send(outcome);
        }
    }
}
