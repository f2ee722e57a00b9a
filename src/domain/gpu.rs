//! GPU identity domain types
//!
//! Provides the GpuRecord struct and the index-keyed inventory used to
//! route streaming rows to stable UUIDs.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// GPU identification captured once at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GpuRecord {
    /// GPU index as reported by nvidia-smi (volatile across resets)
    pub index: String,
    /// GPU name (e.g., "Tesla T4")
    pub name: String,
    /// Hardware-stable UUID (e.g., "GPU-5ab1...")
    pub uuid: String,
}

impl GpuRecord {
    /// Create a new GPU record
    pub fn new(index: impl Into<String>, name: impl Into<String>, uuid: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            name: name.into(),
            uuid: uuid.into(),
        }
    }

    /// Get a short display name
    pub fn short_name(&self) -> &str {
        self.name.strip_prefix("NVIDIA ").unwrap_or(&self.name)
    }
}

impl fmt::Display for GpuRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({})", self.index, self.name, self.uuid)
    }
}

/// Immutable map from GPU index to its record
///
/// Iteration is in index order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GpuInventory {
    gpus: BTreeMap<String, GpuRecord>,
}

impl GpuInventory {
    /// Build an inventory from records; a later duplicate index replaces an earlier one
    pub fn from_records(records: impl IntoIterator<Item = GpuRecord>) -> Self {
        let gpus = records
            .into_iter()
            .map(|record| (record.index.clone(), record))
            .collect();
        Self { gpus }
    }

    /// Look up a GPU by its index
    pub fn get(&self, index: &str) -> Option<&GpuRecord> {
        self.gpus.get(index)
    }

    /// Number of GPUs
    pub fn len(&self) -> usize {
        self.gpus.len()
    }

    /// True when no GPU was listed
    pub fn is_empty(&self) -> bool {
        self.gpus.is_empty()
    }

    /// Iterate over all records
    pub fn iter(&self) -> impl Iterator<Item = &GpuRecord> {
        self.gpus.values()
    }
}

impl FromIterator<GpuRecord> for GpuInventory {
    fn from_iter<I: IntoIterator<Item = GpuRecord>>(iter: I) -> Self {
        Self::from_records(iter)
    }
}
