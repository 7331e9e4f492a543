//! Room session: state machine, events and the actor that runs them.
//!
//! ```text
//! UNCONNECTED -> CONNECTING -> CONNECTED -> CLOSED
//!                   ^              |
//!                   |              v
//!                   +------- RECONNECTING
//! ```

pub mod actor;
pub mod event;
pub mod machine;

pub use actor::DyCast;
pub use event::{close_code, DyEvent, EventKind};
pub use machine::{ConnectionState, Cursor, Effect, SessionEvent, SessionMachine};
