//! # Error Types
//!
//! Validation and codec errors shared across crates.

use thiserror::Error;

/// A value failed domain validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TicketError {
    /// Ticket ids start at 1.
    #[error("Ticket id must be positive")]
    InvalidId,

    /// Timestamp does not follow `YYYY-MM-DD hh:mm:ss`.
    #[error("Invalid timestamp {0:?}: expected YYYY-MM-DD hh:mm:ss")]
    InvalidTimestamp(String),

    /// Prices are positive amounts in the smallest currency unit.
    #[error("Ticket must have a positive price")]
    InvalidPrice,

    /// Zone outside the supported 1-5 range.
    #[error("Invalid zone number {0}: must be within 1-5")]
    InvalidZone(u8),

    /// Zone span outside 2-10.
    #[error("Invalid zone count {0}: must be within 2-10")]
    InvalidZoneCount(u8),

    /// Customer numbers start at 1.
    #[error("Customer number must be positive")]
    InvalidCustomerNumber,
}

/// Encoding or decoding of a payload failed.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The value could not be serialized.
    #[error("Failed to encode payload: {0}")]
    Encode(String),

    /// The bytes do not hold a valid value of the expected type.
    #[error("Failed to decode payload: {0}")]
    Decode(String),
}
