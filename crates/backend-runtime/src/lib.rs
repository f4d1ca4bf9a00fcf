//! # Backend Runtime
//!
//! Configuration for the fare backend. The binary wires it to the
//! dispatcher from `fc-03-session-protocol`:
//!
//! ```text
//! vehicle ──request──→ dispatcher (2408)
//!                          │ next port in 2409..4409
//!                          ↓
//!                      session task ──reply──→ vehicle ──ack──→ session
//! ```
//!
//! ## Configuration
//!
//! Defaults, then the TOML file named by `FC_CONFIG`, then:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `FC_BIND_HOST` | `bind_host` |
//! | `FC_DISPATCHER_PORT` | `dispatcher_port` |
//! | `FC_SESSION_PORT_START` | `session_port_start` |
//! | `FC_SESSION_PORT_WIDTH` | `session_port_width` |
//! | `FC_ZONE_PRICE` | `zone_price` |

use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use fc_03_session_protocol::{
    DispatchError, InMemoryTicketStore, PortWindow, SessionConfig, DEFAULT_DISPATCHER_PORT,
    DEFAULT_SESSION_PORT_START, DEFAULT_SESSION_PORT_WIDTH, RESEND_TIMEOUT,
};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub bind_host: IpAddr,
    pub dispatcher_port: u16,
    pub session_port_start: u16,
    pub session_port_width: u16,
    /// Price of one zone in the smallest currency unit.
    pub zone_price: u32,
    /// Zones covered by a newly issued ticket.
    pub zone_count: u8,
    pub resend_timeout_ms: u64,
    pub max_timer_fires: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        let session = SessionConfig::default();
        Self {
            bind_host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            dispatcher_port: DEFAULT_DISPATCHER_PORT,
            session_port_start: DEFAULT_SESSION_PORT_START,
            session_port_width: DEFAULT_SESSION_PORT_WIDTH,
            zone_price: 1200,
            zone_count: 2,
            resend_timeout_ms: RESEND_TIMEOUT.as_millis() as u64,
            max_timer_fires: session.max_timer_fires,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value '{value}' for {key}")]
    InvalidEnv { key: &'static str, value: String },

    #[error(transparent)]
    Window(#[from] DispatchError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl BackendConfig {
    /// Load from `FC_CONFIG` (if set) and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = match lookup("FC_CONFIG") {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(&lookup)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    fn apply_env(&mut self, lookup: &impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        override_from(lookup, "FC_BIND_HOST", &mut self.bind_host)?;
        override_from(lookup, "FC_DISPATCHER_PORT", &mut self.dispatcher_port)?;
        override_from(lookup, "FC_SESSION_PORT_START", &mut self.session_port_start)?;
        override_from(lookup, "FC_SESSION_PORT_WIDTH", &mut self.session_port_width)?;
        override_from(lookup, "FC_ZONE_PRICE", &mut self.zone_price)?;
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let window = self.port_window()?;
        if window.contains(self.dispatcher_port) {
            return Err(ConfigError::Invalid(format!(
                "dispatcher port {} lies inside the session window",
                self.dispatcher_port
            )));
        }
        if self.max_timer_fires == 0 {
            return Err(ConfigError::Invalid("max_timer_fires must be at least 1".into()));
        }
        if self.zone_count == 0 {
            return Err(ConfigError::Invalid("zone_count must be at least 1".into()));
        }
        Ok(())
    }

    pub fn dispatcher_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_host, self.dispatcher_port)
    }

    pub fn port_window(&self) -> Result<PortWindow, DispatchError> {
        PortWindow::new(self.session_port_start, self.session_port_width)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            resend_timeout: Duration::from_millis(self.resend_timeout_ms),
            max_timer_fires: self.max_timer_fires,
            ..SessionConfig::default()
        }
    }

    pub fn ticket_store(&self) -> InMemoryTicketStore {
        InMemoryTicketStore::new(self.zone_price, self.zone_count)
    }
}

fn override_from<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    target: &mut T,
) -> Result<(), ConfigError> {
    if let Some(value) = lookup(key) {
        *target = value
            .parse()
            .map_err(|_| ConfigError::InvalidEnv { key, value })?;
    }
    Ok(())
}
