//! dycast client runtime.
//!
//! Wires the pieces around the pure protocol core:
//! - `config`: strict yaml loader
//! - `discovery`: room resolution and signature collaborators, push url
//! - `transport`: websocket link abstraction (tokio-tungstenite)
//! - `session`: reconnect state machine and the actor that drives it
//! - `relay`: optional forwarding of message batches to another websocket
//!
//! Consumed by the `dycast` binary and by integration tests.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod config;
pub mod discovery;
pub mod relay;
pub mod session;
pub mod transport;

pub use session::{ConnectionState, DyCast, DyEvent, EventKind};
