//! The authoritative state container seam, plus an in-memory
//! implementation for tests and demos.

use crate::error::DispatchError;
use mirror_state::{Action, StateMap, Value};
use parking_lot::RwLock;
use tokio::sync::broadcast;

/// What the engine requires of the authoritative state container.
///
/// One context owns the canonical state; everything else sees it
/// through this trait. `dispatch` is the only mutation path, and it
/// runs synchronously: by the time it returns, the new state is
/// visible to `get_state`.
pub trait StateSource: Send + Sync + 'static {
    /// Snapshot the current state.
    fn get_state(&self) -> StateMap;

    /// Run the mutator. A failure is returned as data, not panicked.
    fn dispatch(&self, action: Action) -> Result<Value, DispatchError>;

    /// Subscribe to state-change notifications. Dropping the receiver
    /// unsubscribes.
    fn changes(&self) -> broadcast::Receiver<()>;
}

type Reducer = dyn Fn(&mut StateMap, &Action) -> Result<Value, DispatchError> + Send + Sync;

/// Reducer-driven in-memory store implementing [`StateSource`].
///
/// The reducer mutates a working copy; on failure the canonical state
/// is left untouched and no notification fires.
pub struct MemoryStore {
    state: RwLock<StateMap>,
    reducer: Box<Reducer>,
    changed: broadcast::Sender<()>,
}

impl MemoryStore {
    pub fn new(
        initial: StateMap,
        reducer: impl Fn(&mut StateMap, &Action) -> Result<Value, DispatchError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        let (changed, _) = broadcast::channel(100);
        Self {
            state: RwLock::new(initial),
            reducer: Box::new(reducer),
            changed,
        }
    }
}

impl StateSource for MemoryStore {
    fn get_state(&self) -> StateMap {
        self.state.read().clone()
    }

    fn dispatch(&self, action: Action) -> Result<Value, DispatchError> {
        let mut guard = self.state.write();
        let mut working = guard.clone();
        let value = (self.reducer)(&mut working, &action)?;
        *guard = working;
        drop(guard);

        // Nobody listening is fine.
        let _ = self.changed.send(());
        Ok(value)
    }

    fn changes(&self) -> broadcast::Receiver<()> {
        self.changed.subscribe()
    }
}
