//! Home Assistant discovery descriptors
//!
//! Static table mapping dmon column keys to sensor metadata.

use serde::Serialize;
use std::fmt;

/// Seconds without an update before Home Assistant marks a sensor stale
pub const EXPIRE_AFTER_SECS: u64 = 60;

/// State class advertised for every sensor
pub const STATE_CLASS: &str = "measurement";

/// Home Assistant sensor device class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Power,
    Temperature,
    Frequency,
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeviceClass::Power => "power",
            DeviceClass::Temperature => "temperature",
            DeviceClass::Frequency => "frequency",
        };
        f.write_str(s)
    }
}

/// Sensor metadata for one known column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiscoveryDescriptor {
    /// Column key as found in the dmon header
    pub key: &'static str,
    /// Human-readable sensor name
    pub name: &'static str,
    /// Unit of measurement
    pub unit: &'static str,
    /// Device class; `None` for plain percentages
    pub device_class: Option<DeviceClass>,
}

impl DiscoveryDescriptor {
    const fn new(
        key: &'static str,
        name: &'static str,
        unit: &'static str,
        device_class: Option<DeviceClass>,
    ) -> Self {
        Self {
            key,
            name,
            unit,
            device_class,
        }
    }

    /// Look up the descriptor for a lowercase column key
    pub fn lookup(key: &str) -> Option<&'static DiscoveryDescriptor> {
        DESCRIPTORS.iter().find(|d| d.key == key)
    }

    /// All known descriptors
    pub fn all() -> &'static [DiscoveryDescriptor] {
        DESCRIPTORS
    }
}

static DESCRIPTORS: &[DiscoveryDescriptor] = &[
    DiscoveryDescriptor::new("pwr", "Power Usage", "W", Some(DeviceClass::Power)),
    DiscoveryDescriptor::new("gtemp", "GPU Temperature", "°C", Some(DeviceClass::Temperature)),
    DiscoveryDescriptor::new("mtemp", "Memory Temperature", "°C", Some(DeviceClass::Temperature)),
    DiscoveryDescriptor::new("sm", "SM Utilization", "%", None),
    DiscoveryDescriptor::new("mem", "Memory Utilization", "%", None),
    DiscoveryDescriptor::new("enc", "Encoder Utilization", "%", None),
    DiscoveryDescriptor::new("dec", "Decoder Utilization", "%", None),
    DiscoveryDescriptor::new("mclk", "Memory Clock", "MHz", Some(DeviceClass::Frequency)),
    DiscoveryDescriptor::new("pclk", "Processor Clock", "MHz", Some(DeviceClass::Frequency)),
];
