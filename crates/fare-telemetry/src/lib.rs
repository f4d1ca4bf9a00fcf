//! # Fare Telemetry
//!
//! Structured logging for the fare-collection binaries.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fare_telemetry::{init_logging, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_logging(&TelemetryConfig::from_env().with_service("vehicle-runtime"))?;
//!     // ...
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `FC_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `FC_JSON_LOGS` | `false` | JSON lines instead of human-readable output |

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::init_logging;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter '{filter}': {reason}")]
    Filter { filter: String, reason: String },

    #[error("Failed to install global subscriber: {0}")]
    Install(String),
}
