//! # Fare Types Crate
//!
//! Domain values and wire payloads shared by every fare-collection crate.
//!
//! ## Design Principles
//!
//! - **Validated at the boundary**: `Ticket`, `Zone` and `CustomerNumber`
//!   cannot be constructed (or decoded) with out-of-range values.
//! - **Value semantics**: rosters and ticket lists are plain owned values;
//!   components hand them over instead of sharing them.
//! - **One codec**: every datagram payload and the backup file go through
//!   [`codec`], so both ends of a socket agree on the byte layout.

pub mod codec;
pub mod entities;
pub mod errors;
pub mod messages;
pub mod roster;

pub use codec::{decode, encode};
pub use entities::*;
pub use errors::*;
pub use messages::*;
pub use roster::PassengerRoster;
