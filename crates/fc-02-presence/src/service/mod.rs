//! # Service Layer
//!
//! Async orchestration over the domain types and the `BeaconSocket` port.

mod device;
mod pool;
mod tracker;


pub use device::{DeviceCommand, DeviceHandle, DeviceResponder};
pub use pool::{serve_pongs, PongJob, PongWorkerPool};
pub use tracker::PresenceTracker;
