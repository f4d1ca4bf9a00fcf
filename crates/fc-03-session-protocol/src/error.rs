//! Error types for the session protocol

use fare_types::CodecError;
use thiserror::Error;

use crate::domain::FrameError;
use crate::ports::{StoreError, TransportError};

/// Why a single inbound request could not be served. Never fatal for the
/// backend: the datagram is dropped and the session keeps running.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("Malformed payload: {0}")]
    Codec(#[from] CodecError),

    #[error("Ticket store failed: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Client-side failures, escalated to the caller.
#[derive(Debug, Error)]
pub enum UplinkError {
    /// Sending failed on every attempt.
    #[error("Could not send to backend: {0}")]
    Transport(#[from] TransportError),

    /// Every request timed out.
    #[error("No reply after {requests} requests")]
    NoReply { requests: u32 },

    /// The reply arrived (and was acknowledged) but did not hold a ticket list.
    #[error("Reply did not contain a ticket list: {0}")]
    MalformedReply(CodecError),

    #[error("Could not encode request: {0}")]
    Encode(CodecError),
}

/// Dispatcher setup failures.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Invalid session port window: start {start}, width {width}")]
    InvalidPortWindow { start: u16, width: u16 },

    #[error(transparent)]
    Transport(#[from] TransportError),
}
