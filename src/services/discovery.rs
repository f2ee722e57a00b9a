//! Home Assistant discovery publishing
//!
//! Publishes one retained sensor config per (GPU, known column) so the
//! platform can create entities without manual setup. Republishing simply
//! overwrites the retained documents, so this is safe on every start.

use crate::broker::{Message, Publisher, Topics};
use crate::domain::{
    DeviceClass, DiscoveryDescriptor, GpuInventory, GpuRecord, EXPIRE_AFTER_SECS, STATE_CLASS,
};
use crate::error::BrokerError;
use crate::smi::MetricSchema;

use serde::Serialize;

const MANUFACTURER: &str = "NVIDIA";

/// Device block shared by all sensors of one GPU
#[derive(Debug, Serialize)]
pub struct DeviceInfo<'a> {
    pub identifiers: [&'a str; 1],
    pub name: String,
    pub manufacturer: &'static str,
    pub model: &'a str,
}

/// Discovery document for one sensor
#[derive(Debug, Serialize)]
pub struct SensorConfig<'a> {
    pub device: DeviceInfo<'a>,
    pub name: &'static str,
    pub state_topic: String,
    pub value_template: String,
    pub unique_id: String,
    pub unit_of_measurement: &'static str,
    pub device_class: Option<DeviceClass>,
    pub state_class: &'static str,
    pub availability_topic: String,
    pub expire_after: u64,
}

/// Outcome of a discovery pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoverySummary {
    /// Config messages published
    pub published: usize,
    /// Column keys without a descriptor
    pub skipped: Vec<String>,
}

/// Builds and publishes discovery documents
pub struct DiscoveryPublisher<'a> {
    topics: &'a Topics,
}

impl<'a> DiscoveryPublisher<'a> {
    pub fn new(topics: &'a Topics) -> Self {
        Self { topics }
    }

    /// Build the document for one GPU sensor
    pub fn sensor_config<'g>(
        &self,
        gpu: &'g GpuRecord,
        descriptor: &'static DiscoveryDescriptor,
    ) -> SensorConfig<'g> {
        SensorConfig {
            device: DeviceInfo {
                identifiers: [gpu.uuid.as_str()],
                name: format!("GPU {}", gpu.name),
                manufacturer: MANUFACTURER,
                model: &gpu.name,
            },
            name: descriptor.name,
            state_topic: self.topics.state(&gpu.uuid),
            value_template: format!("{{{{ value_json.{} }}}}", descriptor.key),
            unique_id: format!("{}_{}", gpu.uuid, descriptor.key),
            unit_of_measurement: descriptor.unit,
            device_class: descriptor.device_class,
            state_class: STATE_CLASS,
            availability_topic: self.topics.availability(),
            expire_after: EXPIRE_AFTER_SECS,
        }
    }

    /// Publish configs for every GPU and every known column in `schema`
    pub fn publish_all<P: Publisher + ?Sized>(
        &self,
        publisher: &P,
        inventory: &GpuInventory,
        schema: &MetricSchema,
    ) -> Result<DiscoverySummary, BrokerError> {
        log::info!("Publishing Home Assistant sensor configs...");

        let mut summary = DiscoverySummary::default();
        let mut descriptors = Vec::new();
        for column in schema.columns() {
            if column.is_gpu_index() {
                continue;
            }
            match DiscoveryDescriptor::lookup(&column.key) {
                Some(descriptor) => descriptors.push(descriptor),
                None => {
                    log::warn!("Unknown sensor column '{}', skipping", column.key);
                    summary.skipped.push(column.key.clone());
                }
            }
        }

        for gpu in inventory.iter() {
            for &descriptor in &descriptors {
                let topic = self.topics.discovery_config(&gpu.uuid, descriptor.key);
                let config = self.sensor_config(gpu, descriptor);
                publisher.publish(Message::json(topic, &config)?.retained())?;
                summary.published += 1;
                log::debug!(
                    "Published config for sensor {} ({})",
                    descriptor.key,
                    gpu.name
                );
            }
            log::info!(
                "Published {} sensor configs for {}",
                descriptors.len(),
                gpu
            );
        }

        Ok(summary)
    }
}
