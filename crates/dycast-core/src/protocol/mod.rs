//! Push protocol: wire schemas, the outer frame codec and the keyed
//! sub-message union.
//!
//! All decoders are panic-free: malformed input from the push server is
//! reported as `DyCastError::MalformedFrame` (or `Decompress` for a broken
//! gzip body) and the session treats it as "no usable frame".

pub mod frame;
pub mod messages;
pub mod schema;

pub use frame::{
    ack_frame, decode_frame, decode_response, encode_frame, encode_response, heartbeat_frame,
    Frame, PayloadType,
};
pub use messages::{DyMethod, SubMessage};
