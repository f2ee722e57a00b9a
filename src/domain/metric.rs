//! Metric stream domain types
//!
//! Columns captured from the dmon header and the per-row samples built
//! against them.

use serde::Serialize;
use serde_json::{Map, Value};

/// Reserved column carrying the GPU index
pub const GPU_INDEX_COLUMN: &str = "gpu";

/// Placeholder nvidia-smi prints for unsupported metrics
pub(crate) const NOT_AVAILABLE: &str = "-";

/// One column of the metric stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricColumn {
    /// Lowercase lookup key (e.g., "gtemp")
    pub key: String,
    /// Label as printed in the header
    pub label: String,
    /// Unit as printed in the unit header (e.g., "C")
    pub unit: String,
}

impl MetricColumn {
    /// Create a column from a header label and its unit
    pub fn new(label: impl Into<String>, unit: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            key: label.trim().to_lowercase(),
            label,
            unit: unit.into(),
        }
    }

    /// Whether this is the routing column
    pub fn is_gpu_index(&self) -> bool {
        self.key == GPU_INDEX_COLUMN
    }
}

/// A single parsed data row
///
/// The GPU index is held apart from the values so it can never leak into
/// a published payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSample {
    gpu_index: String,
    values: Vec<(String, Option<String>)>,
}

impl MetricSample {
    /// Create a sample from its routing index and ordered values
    pub fn new(gpu_index: impl Into<String>, values: Vec<(String, Option<String>)>) -> Self {
        Self {
            gpu_index: gpu_index.into(),
            values,
        }
    }

    /// GPU index the row belongs to
    pub fn gpu_index(&self) -> &str {
        &self.gpu_index
    }

    /// Value of a column: `None` if absent, `Some(None)` if not available
    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        self.values
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_deref())
    }

    /// Number of metric values (excluding the GPU index)
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the row carried nothing but the GPU index
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// JSON object of column to value, in column order
    pub fn to_payload(&self) -> Value {
        let map: Map<String, Value> = self
            .values
            .iter()
            .map(|(key, value)| {
                let value = value.clone().map(Value::String).unwrap_or(Value::Null);
                (key.clone(), value)
            })
            .collect();
        Value::Object(map)
    }
}
