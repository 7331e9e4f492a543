//! dycast core: transport-agnostic protocol primitives for the live-room push feed.
//!
//! This crate holds the wire schemas and frame codec, the 64-bit `Long`
//! arithmetic, the typed event emitter and the pure message normalization.
//! It carries no runtime or socket dependencies so the session runtime and
//! offline tooling (capture replay, tests) can share it.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Malformed frames from the push server surface as `DyCastError` values and
//! never abort the process.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod compress;
pub mod emitter;
pub mod error;
pub mod id;
pub mod long;
pub mod normalize;
pub mod protocol;

/// Shared result type.
pub use error::{DyCastError, Result};
pub use long::Long;
