//! Datagram framing: `[seq: i8][payload..]`.

use thiserror::Error;

/// Client request carrying a roster.
pub const SEQ_REQUEST: i8 = 1;
/// Server reply carrying a ticket list (request + 1).
pub const SEQ_REPLY: i8 = 2;
/// Client acknowledgment of a reply.
pub const SEQ_ACK: i8 = 3;

/// Payload of an acknowledgment frame, before encoding.
pub const ACK_PAYLOAD: &str = "ack";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("Empty datagram has no sequence number")]
    Empty,
}

/// Borrowed view of a received frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    pub seq: i8,
    pub payload: &'a [u8],
}

impl<'a> Frame<'a> {
    pub fn parse(bytes: &'a [u8]) -> Result<Self, FrameError> {
        let (&first, payload) = bytes.split_first().ok_or(FrameError::Empty)?;
        Ok(Self {
            seq: first as i8,
            payload,
        })
    }

    /// Serialize a frame with sequence number `seq`.
    pub fn encode(seq: i8, payload: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(payload.len() + 1);
        bytes.push(seq as u8);
        bytes.extend_from_slice(payload);
        bytes
    }
}
