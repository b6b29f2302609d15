//! Wire messages exchanged between the authoritative context and its
//! mirrors.

use crate::error::CodecError;
use mirror_state::{Action, Delta, StateMap, Value};
use serde::{Deserialize, Serialize};

/// The content of a wire message, before or after codec transformation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    /// A full state snapshot.
    State(StateMap),
    /// A delta between two snapshots.
    Patches(Delta),
    /// A mutation request.
    Action(Action),
    /// The output of a non-identity serializer.
    Text(String),
}

impl Payload {
    pub fn into_state(self) -> Result<StateMap, CodecError> {
        match self {
            Payload::State(state) => Ok(state),
            _ => Err(CodecError::UnexpectedPayload { expected: "state" }),
        }
    }

    pub fn into_patches(self) -> Result<Delta, CodecError> {
        match self {
            Payload::Patches(delta) => Ok(delta),
            _ => Err(CodecError::UnexpectedPayload { expected: "patches" }),
        }
    }

    pub fn into_action(self) -> Result<Action, CodecError> {
        match self {
            Payload::Action(action) => Ok(action),
            _ => Err(CodecError::UnexpectedPayload { expected: "action" }),
        }
    }
}

/// A message on the wire. The type tags are the stable cross-context
/// contract; both sides match on them, never on payload shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    /// Mirror → authoritative: mutation request for a named
    /// destination.
    #[serde(rename = "DISPATCH")]
    Dispatch { destination: String, payload: Payload },

    /// Authoritative → mirror: full snapshot, sent once on attach.
    #[serde(rename = "STATE")]
    State { payload: Payload },

    /// Authoritative → mirror: delta since the last pushed snapshot.
    #[serde(rename = "PATCH_STATE")]
    PatchState { payload: Payload },

    /// Mirror → authoritative: one-shot attach request. Honored only
    /// when one-shot connections are enabled.
    #[serde(rename = "CONNECT")]
    Connect,

    /// Authoritative → mirror: outcome of a dispatch. Carries either
    /// an error description or a success value, never both.
    #[serde(rename = "DISPATCH_RESPONSE")]
    DispatchResponse {
        error: Option<String>,
        value: Option<Value>,
    },
}
