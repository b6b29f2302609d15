//! Error types for the synchronization engine.

use thiserror::Error;

/// Invalid setup arguments. Fatal: raised at construction, before any
/// partial setup happens.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("destination name is required")]
    MissingDestinationName,
}

/// Serializer/deserializer failures, surfaced to the caller that
/// supplied the codec.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("encode failed: {0}")]
    Encode(String),

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("unexpected payload: expected {expected}")]
    UnexpectedPayload { expected: &'static str },
}

/// The outcome of a failed dispatch. Converted to data and sent back
/// across the channel; the channel cannot carry panics or exceptions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The authoritative mutator rejected the action.
    #[error("{0}")]
    Rejected(String),

    /// The authoritative side never answered (wrong destination,
    /// dropped reply, or closed transport).
    #[error("no response from the authoritative side")]
    NoResponse,
}

/// Engine-level failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("channel closed")]
    ChannelClosed,

    #[error("unexpected message on the wire: {0}")]
    UnexpectedMessage(&'static str),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, BridgeError>;
