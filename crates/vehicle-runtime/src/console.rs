//! Line commands read from stdin by the binaries.
//!
//! The vehicle console stands in for the vehicle's signal bus; the device
//! console stands in for the passenger's screen.

use std::str::FromStr;

use fare_types::Zone;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsoleError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command '{0}'")]
    Unknown(String),

    #[error("Usage: zonetransit <1-5>, got '{0}'")]
    InvalidZone(String),
}

/// Vehicle signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// `leftstation`
    LeftStation,
    /// `zonetransit <zone>`
    ZoneTransit(Zone),
    /// `quit`
    Quit,
}

impl FromStr for Signal {
    type Err = ConsoleError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let command = words.next().ok_or(ConsoleError::Empty)?;
        match command.to_ascii_lowercase().as_str() {
            "leftstation" => Ok(Signal::LeftStation),
            "zonetransit" => {
                let arg = words.next().unwrap_or_default();
                arg.parse::<u8>()
                    .ok()
                    .and_then(|raw| Zone::new(raw).ok())
                    .map(Signal::ZoneTransit)
                    .ok_or_else(|| ConsoleError::InvalidZone(arg.to_string()))
            }
            "quit" => Ok(Signal::Quit),
            _ => Err(ConsoleError::Unknown(command.to_string())),
        }
    }
}

/// Device simulator commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceInput {
    Mute,
    Unmute,
    /// Look up this device's ticket on the vehicle.
    Ticket,
    Quit,
}

impl FromStr for DeviceInput {
    type Err = ConsoleError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let command = line.split_whitespace().next().ok_or(ConsoleError::Empty)?;
        match command.to_ascii_lowercase().as_str() {
            "mute" => Ok(DeviceInput::Mute),
            "unmute" => Ok(DeviceInput::Unmute),
            "ticket" => Ok(DeviceInput::Ticket),
            "quit" => Ok(DeviceInput::Quit),
            _ => Err(ConsoleError::Unknown(command.to_string())),
        }
    }
}
