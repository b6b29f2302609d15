//! The mirror-side proxy store.
//!
//! A [`MirrorStore`] holds a read-only reconstructed copy of the
//! authoritative state. It boots from the full-state message, applies
//! patches as they arrive, and routes its own `dispatch` calls back to
//! the authoritative side as one-shot requests.

use crate::codec::{Codec, IdentityCodec};
use crate::error::{BridgeError, ConfigError, DispatchError};
use crate::message::{Message, Payload};
use crate::transport::MirrorLink;
use mirror_diff::apply_patch;
use mirror_state::{Action, StateMap, Value};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

/// Mirror configuration.
#[derive(Clone)]
pub struct MirrorConfig {
    /// Must match the authoritative engine's destination name.
    pub destination_name: String,
    /// Codec matching the authoritative side's. Default: identity.
    pub codec: Arc<dyn Codec>,
}

impl MirrorConfig {
    pub fn new(destination_name: impl Into<String>) -> Self {
        Self {
            destination_name: destination_name.into(),
            codec: Arc::new(IdentityCodec),
        }
    }

    pub fn with_codec(mut self, codec: impl Codec + 'static) -> Self {
        self.codec = Arc::new(codec);
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.destination_name.is_empty() {
            return Err(ConfigError::MissingDestinationName);
        }
        Ok(())
    }
}

/// A synchronized read-only copy of the authoritative state.
pub struct MirrorStore {
    destination: String,
    codec: Arc<dyn Codec>,
    link: Arc<dyn MirrorLink>,
    state: Arc<RwLock<StateMap>>,
    changed: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl MirrorStore {
    /// Attach a persistent channel and wait for the bootstrap
    /// snapshot. Returns once the mirror holds the full state.
    pub async fn connect(
        link: Arc<dyn MirrorLink>,
        config: MirrorConfig,
    ) -> Result<MirrorStore, BridgeError> {
        config.validate()?;

        let mut rx = link.attach(&config.destination_name).await?;
        let initial = match rx.recv().await.ok_or(BridgeError::ChannelClosed)? {
            Message::State { payload } => config.codec.decode(&payload)?.into_state()?,
            _ => return Err(BridgeError::UnexpectedMessage("expected a STATE bootstrap")),
        };

        let state = Arc::new(RwLock::new(initial));
        let (changed, _) = broadcast::channel(100);
        let task = tokio::spawn(apply_loop(
            rx,
            state.clone(),
            changed.clone(),
            config.codec.clone(),
        ));

        Ok(MirrorStore {
            destination: config.destination_name,
            codec: config.codec,
            link,
            state,
            changed,
            task,
        })
    }

    /// Snapshot the local reconstructed state.
    pub fn get_state(&self) -> StateMap {
        self.state.read().clone()
    }

    /// Subscribe to local state updates. Dropping the receiver
    /// unsubscribes.
    pub fn changes(&self) -> broadcast::Receiver<()> {
        self.changed.subscribe()
    }

    /// Route an action to the authoritative side and await the
    /// outcome.
    pub async fn dispatch(&self, action: Action) -> Result<Value, DispatchError> {
        let payload = self
            .codec
            .encode(&Payload::Action(action))
            .map_err(|e| DispatchError::Rejected(e.to_string()))?;

        let response = self
            .link
            .request(Message::Dispatch {
                destination: self.destination.clone(),
                payload,
            })
            .await
            .map_err(|_| DispatchError::NoResponse)?;

        match response {
            Message::DispatchResponse {
                error: Some(description),
                ..
            } => Err(DispatchError::Rejected(description)),
            Message::DispatchResponse { error: None, value } => {
                Ok(value.unwrap_or_else(Value::null))
            }
            _ => Err(DispatchError::NoResponse),
        }
    }

    /// Stop applying updates. The authoritative side sees the channel
    /// close and detaches the session.
    pub fn disconnect(&self) {
        self.task.abort();
    }
}

impl Drop for MirrorStore {
    fn drop(&mut self) {
        self.disconnect();
    }
}

async fn apply_loop(
    mut rx: mpsc::Receiver<Message>,
    state: Arc<RwLock<StateMap>>,
    changed: broadcast::Sender<()>,
    codec: Arc<dyn Codec>,
) {
    while let Some(message) = rx.recv().await {
        match message {
            Message::State { payload } => {
                match codec.decode(&payload).and_then(|p| p.into_state()) {
                    Ok(snapshot) => {
                        *state.write() = snapshot;
                        let _ = changed.send(());
                    }
                    Err(err) => tracing::warn!(error = %err, "undecodable full state"),
                }
            }
            Message::PatchState { payload } => {
                match codec.decode(&payload).and_then(|p| p.into_patches()) {
                    Ok(delta) => {
                        let mut guard = state.write();
                        *guard = apply_patch(&guard, &delta);
                        drop(guard);
                        let _ = changed.send(());
                    }
                    Err(err) => tracing::warn!(error = %err, "undecodable patch"),
                }
            }
            other => tracing::debug!(?other, "unexpected message on the state channel"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mirror_state::Patch;

    /// A transport that plays back a fixed script.
    struct ScriptedLink {
        bootstrap: Vec<Message>,
        response: Message,
    }

    #[async_trait]
    impl MirrorLink for ScriptedLink {
        async fn attach(&self, _name: &str) -> Result<mpsc::Receiver<Message>, BridgeError> {
            let (tx, rx) = mpsc::channel(8);
            for message in &self.bootstrap {
                tx.send(message.clone())
                    .await
                    .map_err(|_| BridgeError::ChannelClosed)?;
            }
            Ok(rx)
        }

        async fn request(&self, _message: Message) -> Result<Message, BridgeError> {
            Ok(self.response.clone())
        }
    }

    fn state_with_count(count: i64) -> StateMap {
        let mut state = StateMap::new();
        state.insert("count".to_string(), Value::from(count));
        state
    }

    #[tokio::test]
    async fn test_connect_requires_a_state_bootstrap() {
        let link = Arc::new(ScriptedLink {
            bootstrap: vec![Message::PatchState {
                payload: Payload::Patches(Vec::new()),
            }],
            response: Message::Connect,
        });

        let result = MirrorStore::connect(link, MirrorConfig::new("app")).await;
        assert!(matches!(result, Err(BridgeError::UnexpectedMessage(_))));
    }

    #[tokio::test]
    async fn test_connect_rejects_empty_destination() {
        let link = Arc::new(ScriptedLink {
            bootstrap: Vec::new(),
            response: Message::Connect,
        });

        let result = MirrorStore::connect(link, MirrorConfig::new("")).await;
        assert!(matches!(
            result,
            Err(BridgeError::Config(ConfigError::MissingDestinationName))
        ));
    }

    #[test]
    fn test_patches_update_the_local_copy() {
        tokio_test::block_on(async {
            let link = Arc::new(ScriptedLink {
                bootstrap: vec![
                    Message::State {
                        payload: Payload::State(state_with_count(1)),
                    },
                    Message::PatchState {
                        payload: Payload::Patches(vec![Patch::Updated {
                            key: "count".to_string(),
                            value: Value::from(2),
                        }]),
                    },
                ],
                response: Message::Connect,
            });

            let mirror = MirrorStore::connect(link, MirrorConfig::new("app"))
                .await
                .unwrap();

            // The buffered patch may land before or after connect
            // returns; poll until it has been applied.
            tokio::time::timeout(std::time::Duration::from_secs(1), async {
                while mirror.get_state() != state_with_count(2) {
                    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                }
            })
            .await
            .expect("patch was never applied");
        });
    }

    #[tokio::test]
    async fn test_dispatch_maps_an_error_response() {
        let link = Arc::new(ScriptedLink {
            bootstrap: vec![Message::State {
                payload: Payload::State(StateMap::new()),
            }],
            response: Message::DispatchResponse {
                error: Some("rejected upstream".to_string()),
                value: None,
            },
        });

        let mirror = MirrorStore::connect(link, MirrorConfig::new("app"))
            .await
            .unwrap();
        let result = mirror.dispatch(Action::new("anything", Value::null())).await;
        assert_eq!(
            result,
            Err(DispatchError::Rejected("rejected upstream".to_string()))
        );
    }
}
