//! Bridge liveness flag

use std::fmt;

/// Retained liveness flag consumers use to tell "no data" from "bridge gone"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    /// Data flowed recently
    Online,
    /// The bridge has shut down or lost its connection
    Offline,
}

impl Availability {
    /// Payload published on the availability topic
    pub const fn as_str(&self) -> &'static str {
        match self {
            Availability::Online => "online",
            Availability::Offline => "offline",
        }
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
