//! Actions dispatched against the authoritative store.

use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Identifies the context a message came from.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SenderId(pub String);

impl SenderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for SenderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A request to mutate the authoritative state.
///
/// Mirrors never mutate their local copy directly; they send actions
/// across the channel instead. The dispatch bridge stamps the sending
/// mirror's identity onto the action before it reaches the mutator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// What kind of mutation is requested.
    pub kind: String,
    /// Free-form action payload.
    pub payload: Value,
    /// Which mirror sent this action; `None` until the bridge stamps it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<SenderId>,
}

impl Action {
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
            sender: None,
        }
    }

    /// Return this action stamped with a sender identity.
    pub fn with_sender(mut self, sender: SenderId) -> Self {
        self.sender = Some(sender);
        self
    }
}
