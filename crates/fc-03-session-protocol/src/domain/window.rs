//! Rotating window of session ports.

use crate::error::DispatchError;

/// Hands out `start, start + 1, .., start + width - 1`, then wraps.
///
/// A window starting at port 0 always yields 0 (OS-assigned ports).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortWindow {
    start: u16,
    width: u16,
    offset: u16,
}

impl PortWindow {
    pub fn new(start: u16, width: u16) -> Result<Self, DispatchError> {
        let fits = u32::from(start) + u32::from(width) <= u32::from(u16::MAX) + 1;
        if width == 0 || !fits {
            return Err(DispatchError::InvalidPortWindow { start, width });
        }
        Ok(Self {
            start,
            width,
            offset: 0,
        })
    }

    /// The port to use next; advances the window.
    pub fn next_port(&mut self) -> u16 {
        if self.start == 0 {
            return 0;
        }
        let port = self.start + self.offset;
        self.offset = (self.offset + 1) % self.width;
        port
    }

    /// Whether `port` is one this window can hand out.
    pub fn contains(&self, port: u16) -> bool {
        if self.start == 0 {
            return port == 0;
        }
        let port = u32::from(port);
        let start = u32::from(self.start);
        port >= start && port < start + u32::from(self.width)
    }

    pub fn start(&self) -> u16 {
        self.start
    }

    pub fn width(&self) -> u16 {
        self.width
    }
}
