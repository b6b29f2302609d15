//! The dispatch bridge: routes mirror actions into the authoritative
//! mutator and delivers the outcome back through a responder.

use crate::error::DispatchError;
use crate::message::Message;
use crate::store::StateSource;
use crate::transport::Reply;
use async_trait::async_trait;
use mirror_state::{Action, Value};
use std::sync::Arc;

/// Delivers dispatch outcomes back to the requester.
///
/// The engine guarantees the mutation has completed before `respond`
/// runs. An implementation must send through `reply` exactly once per
/// request; the reply slot itself enforces at-most-once.
#[async_trait]
pub trait DispatchResponder: Send + Sync {
    async fn respond(&self, outcome: Result<Value, DispatchError>, reply: Reply);
}

/// The default responder: `{error: null, value}` on success,
/// `{error: description, value: null}` on failure.
#[derive(Clone, Copy, Debug, Default)]
pub struct OutcomeResponder;

#[async_trait]
impl DispatchResponder for OutcomeResponder {
    async fn respond(&self, outcome: Result<Value, DispatchError>, reply: Reply) {
        let message = match outcome {
            Ok(value) => Message::DispatchResponse {
                error: None,
                value: Some(value),
            },
            Err(err) => Message::DispatchResponse {
                error: Some(err.to_string()),
                value: None,
            },
        };
        if reply.send(message).is_err() {
            tracing::debug!("dispatch requester went away before the outcome was delivered");
        }
    }
}

/// Run the mutator synchronously, then hand the outcome to the
/// responder on its own task. A mutator failure becomes a failed
/// outcome; it never takes the engine down.
pub(crate) fn handle_dispatch(
    store: &Arc<dyn StateSource>,
    responder: &Arc<dyn DispatchResponder>,
    action: Action,
    reply: Reply,
) {
    let outcome = store.dispatch(action);
    if let Err(err) = &outcome {
        tracing::warn!(error = %err, "authoritative mutator rejected the action");
    }

    let responder = responder.clone();
    tokio::spawn(async move {
        responder.respond(outcome, reply).await;
    });
}
