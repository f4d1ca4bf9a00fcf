//! # Service Layer
//!
//! - `SessionTask`: server role, one per client exchange
//! - `UplinkClient`: client role on the vehicle
//! - `Dispatcher`: accept loop spawning sessions
//! - `TicketIssuer`: existing + newly issued tickets for a roster

mod dispatcher;
mod issuance;
mod send;
mod session;
mod uplink;

#[cfg(test)]
mod tests;

pub use dispatcher::Dispatcher;
pub use issuance::TicketIssuer;
pub use session::{SessionReport, SessionTask};
pub use uplink::UplinkClient;
