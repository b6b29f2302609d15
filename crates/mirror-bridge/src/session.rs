//! Per-mirror synchronization sessions.
//!
//! A session lives for exactly one attachment. On attach it pushes the
//! full current state, then re-diffs and pushes a patch on every
//! authoritative state change; an empty delta sends nothing. Sessions
//! run as independent tasks, so a slow or disconnected mirror never
//! blocks the others.

use crate::codec::Codec;
use crate::message::{Message, Payload};
use crate::store::StateSource;
use crate::transport::Reply;
use mirror_diff::DiffStrategy;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Where a session delivers its messages.
pub(crate) enum SessionSink {
    /// A persistent channel; full state then patches, until it closes.
    Channel(mpsc::Sender<Message>),
    /// A one-shot reply; only the full-state bootstrap is ever
    /// delivered, then the session is already over.
    OneShot(Reply),
}

/// Handle to a running session. Detaching cancels the state
/// subscription; a second detach is a no-op.
pub struct Session {
    detached: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl Session {
    pub(crate) fn attach(
        store: &Arc<dyn StateSource>,
        strategy: Arc<dyn DiffStrategy>,
        codec: Arc<dyn Codec>,
        sink: SessionSink,
    ) -> Session {
        match sink {
            SessionSink::OneShot(reply) => {
                match codec.encode(&Payload::State(store.get_state())) {
                    Ok(payload) => {
                        let _ = reply.send(Message::State { payload });
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "failed to encode bootstrap state");
                    }
                }
                Session {
                    detached: Arc::new(AtomicBool::new(true)),
                    task: None,
                }
            }
            SessionSink::Channel(outbound) => {
                // Subscribe before the first snapshot so no change
                // notification can fall between the two.
                let changes = store.changes();
                let detached = Arc::new(AtomicBool::new(false));
                let task = tokio::spawn(run(
                    store.clone(),
                    strategy,
                    codec,
                    outbound,
                    changes,
                    detached.clone(),
                ));
                Session {
                    detached,
                    task: Some(task),
                }
            }
        }
    }

    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::SeqCst)
    }

    /// Cancel the session's subscription. Idempotent.
    pub fn detach(&self) {
        if !self.detached.swap(true, Ordering::SeqCst) {
            if let Some(task) = &self.task {
                task.abort();
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.detach();
    }
}

async fn run(
    store: Arc<dyn StateSource>,
    strategy: Arc<dyn DiffStrategy>,
    codec: Arc<dyn Codec>,
    outbound: mpsc::Sender<Message>,
    mut changes: broadcast::Receiver<()>,
    detached: Arc<AtomicBool>,
) {
    let mut previous = store.get_state();

    match codec.encode(&Payload::State(previous.clone())) {
        Ok(payload) => {
            if outbound.send(Message::State { payload }).await.is_err() {
                detached.store(true, Ordering::SeqCst);
                return;
            }
        }
        Err(err) => {
            tracing::warn!(error = %err, "failed to encode bootstrap state");
            detached.store(true, Ordering::SeqCst);
            return;
        }
    }
    tracing::debug!("mirror attached");

    loop {
        tokio::select! {
            changed = changes.recv() => match changed {
                Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {
                    let state = store.get_state();
                    let delta = strategy.diff(&state, &previous);
                    if delta.is_empty() {
                        continue;
                    }
                    match codec.encode(&Payload::Patches(delta)) {
                        Ok(payload) => {
                            if outbound.send(Message::PatchState { payload }).await.is_err() {
                                break;
                            }
                            previous = state;
                        }
                        // The last pushed snapshot stands; the next
                        // change re-diffs against it.
                        Err(err) => tracing::warn!(error = %err, "failed to encode patch"),
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = outbound.closed() => break,
        }
    }

    detached.store(true, Ordering::SeqCst);
    tracing::debug!("mirror detached");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::IdentityCodec;
    use crate::error::DispatchError;
    use crate::store::MemoryStore;
    use mirror_diff::ShallowDiff;
    use mirror_state::{Action, Patch, StateMap, Value};
    use std::time::Duration;
    use tokio::sync::oneshot;
    use tokio::time::timeout;

    fn test_store() -> Arc<dyn StateSource> {
        let mut initial = StateMap::new();
        initial.insert("count".to_string(), Value::from(0));

        Arc::new(MemoryStore::new(initial, |state, action| {
            match action.kind.as_str() {
                "set" => {
                    state.insert("count".to_string(), action.payload.clone());
                    Ok(action.payload.clone())
                }
                // Notifies without changing anything.
                "noop" => Ok(Value::null()),
                other => Err(DispatchError::Rejected(format!("unknown action: {}", other))),
            }
        }))
    }

    fn attach_channel(store: &Arc<dyn StateSource>) -> (Session, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(8);
        let session = Session::attach(
            store,
            Arc::new(ShallowDiff),
            Arc::new(IdentityCodec),
            SessionSink::Channel(tx),
        );
        (session, rx)
    }

    async fn recv(rx: &mut mpsc::Receiver<Message>) -> Message {
        timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for a message")
            .expect("channel closed")
    }

    async fn assert_silent(rx: &mut mpsc::Receiver<Message>) {
        let silent = timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(silent.is_err(), "expected no message, got {:?}", silent);
    }

    #[tokio::test]
    async fn test_attach_sends_exactly_one_full_state() {
        let store = test_store();
        let (_session, mut rx) = attach_channel(&store);

        let message = recv(&mut rx).await;
        assert_eq!(
            message,
            Message::State {
                payload: Payload::State(store.get_state()),
            }
        );

        assert_silent(&mut rx).await;
    }

    #[tokio::test]
    async fn test_state_change_pushes_a_patch() {
        let store = test_store();
        let (_session, mut rx) = attach_channel(&store);
        let _ = recv(&mut rx).await; // bootstrap

        store.dispatch(Action::new("set", Value::from(5))).unwrap();

        let message = recv(&mut rx).await;
        assert_eq!(
            message,
            Message::PatchState {
                payload: Payload::Patches(vec![Patch::Updated {
                    key: "count".to_string(),
                    value: Value::from(5),
                }]),
            }
        );
    }

    #[tokio::test]
    async fn test_empty_delta_sends_nothing() {
        let store = test_store();
        let (_session, mut rx) = attach_channel(&store);
        let _ = recv(&mut rx).await; // bootstrap

        store.dispatch(Action::new("noop", Value::null())).unwrap();
        assert_silent(&mut rx).await;
    }

    #[tokio::test]
    async fn test_detach_is_idempotent_and_stops_patches() {
        let store = test_store();
        let (session, mut rx) = attach_channel(&store);
        let _ = recv(&mut rx).await; // bootstrap

        session.detach();
        session.detach();
        assert!(session.is_detached());

        store.dispatch(Action::new("set", Value::from(9))).unwrap();
        assert_silent(&mut rx).await;
    }

    #[tokio::test]
    async fn test_closing_the_channel_detaches() {
        let store = test_store();
        let (session, mut rx) = attach_channel(&store);
        let _ = recv(&mut rx).await; // bootstrap

        drop(rx);
        timeout(Duration::from_secs(1), async {
            while !session.is_detached() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("session never noticed the disconnect");
    }

    #[tokio::test]
    async fn test_one_shot_attachment_replies_with_full_state() {
        let store = test_store();
        let (tx, rx) = oneshot::channel();

        let session = Session::attach(
            &store,
            Arc::new(ShallowDiff),
            Arc::new(IdentityCodec),
            SessionSink::OneShot(Reply::new(tx)),
        );
        assert!(session.is_detached());

        let message = rx.await.unwrap();
        assert_eq!(
            message,
            Message::State {
                payload: Payload::State(store.get_state()),
            }
        );
    }
}
