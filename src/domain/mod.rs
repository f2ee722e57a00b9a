//! Domain models for nvsmi2ha
//!
//! GPU identity, metric samples, discovery descriptors and the
//! availability flag. Everything here is plain data without I/O.

pub mod availability;
pub mod descriptor;
pub mod gpu;
pub mod metric;

pub use availability::Availability;
pub use descriptor::{DeviceClass, DiscoveryDescriptor, EXPIRE_AFTER_SECS, STATE_CLASS};
pub use gpu::{GpuInventory, GpuRecord};
pub use metric::{MetricColumn, MetricSample, GPU_INDEX_COLUMN};
