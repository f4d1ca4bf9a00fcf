//! # Fare-Collection Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/          # Ticket table and codec benchmarks
//! └── src/integration/  # Cross-crate flows over loopback UDP
//!     ├── ticket_flow.rs    # vehicle → backend → vehicle → device
//!     └── presence_flow.rs  # ping/pong cycle with a live device
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p fare-tests
//! cargo test -p fare-tests integration::presence_flow
//!
//! # Benchmarks
//! cargo bench -p fare-tests
//! ```

pub mod integration;
