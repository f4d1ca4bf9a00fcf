//! Domain Layer - Pure presence logic
//!
//! RULES:
//! - No I/O operations
//! - No async code

pub mod collector;
pub mod config;
pub mod cycle;
pub mod device;

pub use collector::{Harvest, RosterCollector};
pub use config::{DeviceConfig, PoolConfig, PresenceConfig};
pub use cycle::{PresenceCycle, SendOutcome};
pub use device::{LivenessMonitor, MuteSwitch};
