//! Service layer for the bridge
//!
//! Services encapsulate discovery publishing, the publish loop and
//! shutdown signalling.

pub mod bridge;
pub mod discovery;
pub mod shutdown;

pub use bridge::{Bridge, RunSummary};
pub use discovery::{DiscoveryPublisher, DiscoverySummary};
pub use shutdown::ShutdownSignal;
