//! Synchronization engine bridging an authoritative state store to
//! read-only mirrors over message channels.
//!
//! One context owns the canonical state and the mutator; other
//! contexts hold mirrors that stay synchronized with minimal data
//! transfer. On attach a mirror receives the full state once; after
//! that, every authoritative state change is re-diffed against the
//! last pushed snapshot and only a non-empty delta crosses the
//! channel. Mirrors route their own mutation requests back through a
//! one-shot dispatch exchange and receive the outcome as data.
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use mirror_bridge::{
//!     BridgeConfig, MemoryHub, MemoryStore, MirrorConfig, MirrorStore, StateSource, StoreBridge,
//! };
//! use mirror_state::{Action, StateMap, Value};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! // Authoritative side: a store plus the engine.
//! let store = Arc::new(MemoryStore::new(StateMap::new(), |state, action| {
//!     state.insert("last".to_string(), action.payload.clone());
//!     Ok(Value::null())
//! }));
//! let hub = Arc::new(MemoryHub::new());
//! let _bridge = StoreBridge::spawn(store.clone(), hub.as_ref(), BridgeConfig::new("app"))?;
//!
//! // Mirror side: connect, read, dispatch.
//! let mirror = MirrorStore::connect(hub.clone(), MirrorConfig::new("app")).await?;
//! mirror.dispatch(Action::new("set", Value::from(1))).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`bridge`] - connection manager and engine configuration
//! - [`session`] - per-mirror synchronization sessions
//! - [`dispatch`] - dispatch bridge and responders
//! - [`codec`] - the serialization adapter
//! - [`transport`] - transport seams and the in-memory hub
//! - [`store`] - the authoritative store seam
//! - [`mirror`] - the mirror-side proxy store
//! - [`message`] - the wire contract
//! - [`error`] - error types

pub mod bridge;
pub mod codec;
pub mod dispatch;
pub mod error;
pub mod message;
pub mod mirror;
pub mod session;
pub mod store;
pub mod transport;

pub use bridge::{BridgeConfig, BridgeConfigBuilder, StoreBridge};
pub use codec::{Codec, IdentityCodec, JsonCodec};
pub use dispatch::{DispatchResponder, OutcomeResponder};
pub use error::{BridgeError, CodecError, ConfigError, DispatchError, Result};
pub use message::{Message, Payload};
pub use mirror::{MirrorConfig, MirrorStore};
pub use session::Session;
pub use store::{MemoryStore, StateSource};
pub use transport::{
    ChannelHost, Inbound, MemoryHub, MirrorLink, OneShotRequest, PersistentChannel, Reply,
};
