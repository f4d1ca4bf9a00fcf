//! Domain Layer - Framing and session state
//!
//! RULES:
//! - No I/O operations
//! - No async code

pub mod config;
pub mod frame;
pub mod session;
pub mod window;

pub use config::{
    SendPolicy, SessionConfig, UplinkConfig, DEFAULT_DISPATCHER_PORT, DEFAULT_SESSION_PORT_START,
    DEFAULT_SESSION_PORT_WIDTH, RESEND_TIMEOUT,
};
pub use frame::{Frame, FrameError, ACK_PAYLOAD, SEQ_ACK, SEQ_REPLY, SEQ_REQUEST};
pub use session::{Action, ServerSession, SessionOutcome, SessionState, TimerAction};
pub use window::PortWindow;
