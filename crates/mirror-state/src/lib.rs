//! Data model for the mirrorstore synchronization engine.
//!
//! This crate defines the vocabulary shared by the diffing strategies
//! and the synchronization bridge:
//!
//! - [`Value`] / [`StateMap`] - the acyclic nested key-value state tree
//! - [`Patch`] / [`Delta`] - the change records exchanged on the wire
//! - [`Action`] / [`SenderId`] - mutation requests routed back to the
//!   authoritative side
//!
//! Everything here is pure data: serde-serializable, structurally
//! comparable, no behavior beyond construction helpers.

pub mod action;
pub mod delta;
pub mod value;

pub use action::{Action, SenderId};
pub use delta::{Delta, Patch};
pub use value::{Primitive, StateMap, Value};
