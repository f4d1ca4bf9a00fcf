//! # Ports Layer
//!
//! - `outbound`: driven ports (SPI) this subsystem needs from its host

pub mod outbound;

pub use outbound::{BeaconSocket, TransportError};
