//! The serialization adapter: user-supplied encode/decode wrapped
//! around every payload crossing the channel.
//!
//! Outbound payloads pass through [`Codec::encode`] before posting;
//! inbound payloads addressed to this engine pass through
//! [`Codec::decode`] before handling. The default is the identity
//! codec; [`JsonCodec`] is the canonical non-identity pair.

use crate::error::CodecError;
use crate::message::Payload;

/// Encode/decode seam for wire payloads.
pub trait Codec: Send + Sync {
    fn encode(&self, payload: &Payload) -> Result<Payload, CodecError>;
    fn decode(&self, payload: &Payload) -> Result<Payload, CodecError>;
}

/// Pass payloads through untouched (the default).
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityCodec;

impl Codec for IdentityCodec {
    fn encode(&self, payload: &Payload) -> Result<Payload, CodecError> {
        Ok(payload.clone())
    }

    fn decode(&self, payload: &Payload) -> Result<Payload, CodecError> {
        Ok(payload.clone())
    }
}

/// Encode payloads as JSON text, decode JSON text back into payloads.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, payload: &Payload) -> Result<Payload, CodecError> {
        let text =
            serde_json::to_string(payload).map_err(|e| CodecError::Encode(e.to_string()))?;
        Ok(Payload::Text(text))
    }

    fn decode(&self, payload: &Payload) -> Result<Payload, CodecError> {
        match payload {
            Payload::Text(text) => {
                serde_json::from_str(text).map_err(|e| CodecError::Decode(e.to_string()))
            }
            _ => Err(CodecError::UnexpectedPayload { expected: "text" }),
        }
    }
}
