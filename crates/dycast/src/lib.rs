//! Top-level facade crate for dycast.
//!
//! Re-exports the protocol core and the client runtime so users can depend on a single crate.

pub mod core {
    pub use dycast_core::*;
}

pub mod client {
    pub use dycast_client::*;
}

pub use dycast_client::{ConnectionState, DyCast, DyEvent, EventKind};
pub use dycast_core::{DyCastError, Long, Result};
