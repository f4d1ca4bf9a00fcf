//! # Vehicle Configuration
//!
//! Defaults, then an optional TOML file named by `FC_CONFIG`, then `FC_*`
//! environment overrides.
//!
//! ```toml
//! start_zone = 1
//! request_attempts = 5
//! backup_path = "vc_backup.bin"
//!
//! [network]
//! group = "239.0.1.139"
//! dispatcher = "10.0.0.5:2408"
//!
//! [presence]
//! beacon_interval_ms = 1000
//! ```

use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use fare_types::Zone;
use fc_02_presence::domain::config::{
    DEFAULT_BEACON_PORT, DEFAULT_GROUP, DEFAULT_PING_PORT, DEFAULT_PONG_PORT,
};
use fc_02_presence::{PoolConfig, PresenceConfig};
use fc_03_session_protocol::{UplinkConfig, DEFAULT_DISPATCHER_PORT};
use serde::Deserialize;
use thiserror::Error;

/// Port the vehicle answers ticket lookups on.
pub const DEFAULT_LOOKUP_PORT: u16 = 2225;

/// Complete vehicle configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    /// Zone the vehicle is in at start-up.
    pub start_zone: u8,
    /// Ticket requests per signal before the failure is fatal.
    pub request_attempts: u32,
    pub backup_path: PathBuf,
    pub network: NetworkConfig,
    pub presence: PresenceSection,
    pub pool: PoolSection,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            start_zone: 1,
            request_attempts: 5,
            backup_path: PathBuf::from("vc_backup.bin"),
            network: NetworkConfig::default(),
            presence: PresenceSection::default(),
            pool: PoolSection::default(),
        }
    }
}

/// Sockets and peers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Local address every vehicle socket binds on.
    pub bind_host: IpAddr,
    pub group: Ipv4Addr,
    pub beacon_port: u16,
    pub ping_port: u16,
    pub pong_port: u16,
    pub lookup_port: u16,
    /// Local port of the backend uplink (0 = any).
    pub uplink_port: u16,
    pub dispatcher: SocketAddr,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            group: DEFAULT_GROUP,
            beacon_port: DEFAULT_BEACON_PORT,
            ping_port: DEFAULT_PING_PORT,
            pong_port: DEFAULT_PONG_PORT,
            lookup_port: DEFAULT_LOOKUP_PORT,
            uplink_port: 0,
            dispatcher: SocketAddr::V4(SocketAddrV4::new(
                Ipv4Addr::LOCALHOST,
                DEFAULT_DISPATCHER_PORT,
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PresenceSection {
    pub beacon_interval_ms: u64,
    pub beacons_per_cycle: u32,
    pub max_send_failures: u32,
}

impl Default for PresenceSection {
    fn default() -> Self {
        let defaults = PresenceConfig::default();
        Self {
            beacon_interval_ms: defaults.beacon_interval.as_millis() as u64,
            beacons_per_cycle: defaults.beacons_per_cycle,
            max_send_failures: defaults.max_send_failures,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PoolSection {
    pub workers: usize,
    pub queue_capacity: usize,
}

impl Default for PoolSection {
    fn default() -> Self {
        let defaults = PoolConfig::default();
        Self {
            workers: defaults.workers,
            queue_capacity: defaults.queue_capacity,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value '{value}' for {key}")]
    InvalidEnv { key: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl VehicleConfig {
    /// Load from `FC_CONFIG` (if set) and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` in place of the process environment.
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
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    fn apply_env(&mut self, lookup: &impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        override_from(lookup, "FC_ZONE", &mut self.start_zone)?;
        override_from(lookup, "FC_DISPATCHER", &mut self.network.dispatcher)?;
        override_from(lookup, "FC_GROUP", &mut self.network.group)?;
        override_from(lookup, "FC_BEACON_PORT", &mut self.network.beacon_port)?;
        override_from(lookup, "FC_PING_PORT", &mut self.network.ping_port)?;
        override_from(lookup, "FC_PONG_PORT", &mut self.network.pong_port)?;
        override_from(lookup, "FC_LOOKUP_PORT", &mut self.network.lookup_port)?;
        override_from(lookup, "FC_BACKUP_PATH", &mut self.backup_path)?;
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.zone()?;
        if self.request_attempts == 0 {
            return Err(ConfigError::Invalid("request_attempts must be at least 1".into()));
        }
        if self.presence.beacons_per_cycle == 0 || self.presence.max_send_failures == 0 {
            return Err(ConfigError::Invalid(
                "presence beacon counts must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn zone(&self) -> Result<Zone, ConfigError> {
        Zone::new(self.start_zone).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn presence_config(&self) -> PresenceConfig {
        PresenceConfig {
            beacon_interval: Duration::from_millis(self.presence.beacon_interval_ms),
            beacons_per_cycle: self.presence.beacons_per_cycle,
            max_send_failures: self.presence.max_send_failures,
            beacon_target: SocketAddr::V4(SocketAddrV4::new(
                self.network.group,
                self.network.beacon_port,
            )),
        }
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            workers: self.pool.workers,
            queue_capacity: self.pool.queue_capacity,
            ..PoolConfig::default()
        }
    }

    pub fn uplink_config(&self) -> UplinkConfig {
        UplinkConfig::new(self.network.dispatcher)
    }

    /// Local address for a vehicle socket on `port`.
    pub fn local(&self, port: u16) -> SocketAddr {
        SocketAddr::new(self.network.bind_host, port)
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
