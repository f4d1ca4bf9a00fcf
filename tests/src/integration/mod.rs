//! # Integration Flows
//!
//! Every test binds real sockets on 127.0.0.1 with OS-assigned ports, so the
//! suite can run in parallel and next to a live deployment.

pub mod presence_flow;
pub mod ticket_flow;
