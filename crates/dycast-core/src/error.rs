//! Shared error type across dycast crates.

use thiserror::Error;

/// Stable error codes (safe to log, match on, or forward to consumers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Frame or sub-message bytes do not parse.
    MalformedFrame,
    /// Gzip payload could not be inflated.
    Decompress,
    /// Long division with a zero divisor.
    DivisionByZero,
    /// Radix outside 2..=36.
    InvalidRadix,
    /// Text is not a number in the requested radix.
    InvalidNumber,
    /// Discovery could not find the room.
    RoomNotFound,
    /// Discovery got a page it could not parse.
    ParseError,
    /// Socket creation / send / receive failure.
    Transport,
    /// `connect()` while a connection is already up.
    AlreadyConnected,
    /// Reconnect budget spent.
    ReconnectExhausted,
    /// Snowflake clock regression.
    ClockMovedBackwards,
    /// Config rejected by strict parsing or validation.
    BadConfig,
    /// Anything else.
    Internal,
}

impl ErrorCode {
    /// String representation used in logs and emitted errors.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::MalformedFrame => "MALFORMED_FRAME",
            ErrorCode::Decompress => "DECOMPRESS",
            ErrorCode::DivisionByZero => "DIVISION_BY_ZERO",
            ErrorCode::InvalidRadix => "INVALID_RADIX",
            ErrorCode::InvalidNumber => "INVALID_NUMBER",
            ErrorCode::RoomNotFound => "ROOM_NOT_FOUND",
            ErrorCode::ParseError => "PARSE_ERROR",
            ErrorCode::Transport => "TRANSPORT",
            ErrorCode::AlreadyConnected => "ALREADY_CONNECTED",
            ErrorCode::ReconnectExhausted => "RECONNECT_EXHAUSTED",
            ErrorCode::ClockMovedBackwards => "CLOCK_MOVED_BACKWARDS",
            ErrorCode::BadConfig => "BAD_CONFIG",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, DyCastError>;

/// Unified error type used by core and client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DyCastError {
    #[error("malformed frame: {0}")]
    MalformedFrame(String),
    #[error("decompress failed: {0}")]
    Decompress(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("radix {0} out of range 2..=36")]
    InvalidRadix(u32),
    #[error("invalid number: {0}")]
    InvalidNumber(String),
    #[error("room not found: {0}")]
    RoomNotFound(String),
    #[error("parse error: {0}")]
    ParseError(String),
    #[error("transport: {0}")]
    Transport(String),
    #[error("already connected")]
    AlreadyConnected,
    #[error("reconnect attempts exhausted after {0} tries")]
    ReconnectExhausted(u32),
    #[error("clock moved backwards, refusing to generate id")]
    ClockMovedBackwards,
    #[error("bad config: {0}")]
    BadConfig(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl DyCastError {
    /// Map to the stable error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            DyCastError::MalformedFrame(_) => ErrorCode::MalformedFrame,
            DyCastError::Decompress(_) => ErrorCode::Decompress,
            DyCastError::DivisionByZero => ErrorCode::DivisionByZero,
            DyCastError::InvalidRadix(_) => ErrorCode::InvalidRadix,
            DyCastError::InvalidNumber(_) => ErrorCode::InvalidNumber,
            DyCastError::RoomNotFound(_) => ErrorCode::RoomNotFound,
            DyCastError::ParseError(_) => ErrorCode::ParseError,
            DyCastError::Transport(_) => ErrorCode::Transport,
            DyCastError::AlreadyConnected => ErrorCode::AlreadyConnected,
            DyCastError::ReconnectExhausted(_) => ErrorCode::ReconnectExhausted,
            DyCastError::ClockMovedBackwards => ErrorCode::ClockMovedBackwards,
            DyCastError::BadConfig(_) => ErrorCode::BadConfig,
            DyCastError::Internal(_) => ErrorCode::Internal,
        }
    }
}

impl From<prost::DecodeError> for DyCastError {
    fn from(e: prost::DecodeError) -> Self {
        DyCastError::MalformedFrame(e.to_string())
    }
}
