//! The connection manager: binds channel attachments to sessions and
//! exposes the dispatch bridge on the shared inbound stream.

use crate::codec::{Codec, IdentityCodec};
use crate::dispatch::{handle_dispatch, DispatchResponder, OutcomeResponder};
use crate::error::ConfigError;
use crate::message::Message;
use crate::session::{Session, SessionSink};
use crate::store::StateSource;
use crate::transport::{ChannelHost, Inbound, OneShotRequest};
use mirror_diff::{DiffStrategy, ShallowDiff};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Engine configuration.
#[derive(Clone)]
pub struct BridgeConfig {
    /// Names the persistent channels and dispatch requests that belong
    /// to this engine. Required.
    pub destination_name: String,
    /// Strategy used by sessions to compute deltas. Default: shallow.
    pub diff_strategy: Arc<dyn DiffStrategy>,
    /// Serialization adapter for payloads. Default: identity.
    pub codec: Arc<dyn Codec>,
    /// Delivers dispatch outcomes. Default: [`OutcomeResponder`].
    pub dispatch_responder: Arc<dyn DispatchResponder>,
    /// Whether `CONNECT` one-shot attachments are honored. Default:
    /// off.
    pub allow_one_shot_connections: bool,
}

impl BridgeConfig {
    pub fn new(destination_name: impl Into<String>) -> Self {
        Self {
            destination_name: destination_name.into(),
            diff_strategy: Arc::new(ShallowDiff),
            codec: Arc::new(IdentityCodec),
            dispatch_responder: Arc::new(OutcomeResponder),
            allow_one_shot_connections: false,
        }
    }

    pub fn builder(destination_name: impl Into<String>) -> BridgeConfigBuilder {
        BridgeConfigBuilder {
            config: BridgeConfig::new(destination_name),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.destination_name.is_empty() {
            return Err(ConfigError::MissingDestinationName);
        }
        Ok(())
    }
}

/// Builder for [`BridgeConfig`].
pub struct BridgeConfigBuilder {
    config: BridgeConfig,
}

impl BridgeConfigBuilder {
    pub fn diff_strategy(mut self, strategy: impl DiffStrategy + 'static) -> Self {
        self.config.diff_strategy = Arc::new(strategy);
        self
    }

    pub fn codec(mut self, codec: impl Codec + 'static) -> Self {
        self.config.codec = Arc::new(codec);
        self
    }

    pub fn dispatch_responder(mut self, responder: impl DispatchResponder + 'static) -> Self {
        self.config.dispatch_responder = Arc::new(responder);
        self
    }

    pub fn allow_one_shot_connections(mut self, allow: bool) -> Self {
        self.config.allow_one_shot_connections = allow;
        self
    }

    pub fn build(self) -> Result<BridgeConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// The running engine on the authoritative side.
///
/// Owns every session and the accept loop; shutting down (or dropping)
/// detaches them all.
pub struct StoreBridge {
    sessions: Arc<Mutex<Vec<Session>>>,
    task: JoinHandle<()>,
}

impl StoreBridge {
    /// Validate the configuration and start accepting attachments from
    /// the host. A configuration error performs no setup at all.
    pub fn spawn(
        store: Arc<dyn StateSource>,
        host: &dyn ChannelHost,
        config: BridgeConfig,
    ) -> Result<StoreBridge, ConfigError> {
        config.validate()?;

        let incoming = host.incoming();
        let sessions = Arc::new(Mutex::new(Vec::new()));
        let task = tokio::spawn(accept_loop(store, incoming, config, sessions.clone()));

        Ok(StoreBridge { sessions, task })
    }

    /// Number of currently attached mirrors.
    pub fn session_count(&self) -> usize {
        self.sessions
            .lock()
            .iter()
            .filter(|s| !s.is_detached())
            .count()
    }

    /// Detach every session and stop accepting attachments.
    pub fn shutdown(&self) {
        for session in self.sessions.lock().iter() {
            session.detach();
        }
        self.task.abort();
    }
}

impl Drop for StoreBridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn accept_loop(
    store: Arc<dyn StateSource>,
    mut incoming: mpsc::Receiver<Inbound>,
    config: BridgeConfig,
    sessions: Arc<Mutex<Vec<Session>>>,
) {
    while let Some(inbound) = incoming.recv().await {
        match inbound {
            Inbound::Channel(channel) => {
                if channel.name() != config.destination_name {
                    tracing::debug!(name = channel.name(), "channel for another destination");
                    continue;
                }
                tracing::debug!(sender = %channel.sender(), "persistent attachment");
                let session = Session::attach(
                    &store,
                    config.diff_strategy.clone(),
                    config.codec.clone(),
                    SessionSink::Channel(channel.outbound()),
                );

                let mut sessions = sessions.lock();
                sessions.retain(|s| !s.is_detached());
                sessions.push(session);
            }
            Inbound::Request(request) => handle_request(&store, &config, request),
        }
    }
}

fn handle_request(store: &Arc<dyn StateSource>, config: &BridgeConfig, request: OneShotRequest) {
    let OneShotRequest {
        message,
        sender,
        reply,
    } = request;

    match message {
        Message::Connect => {
            if !config.allow_one_shot_connections {
                tracing::debug!(%sender, "one-shot connections are disabled");
                return; // reply dropped, request ignored
            }
            tracing::debug!(%sender, "one-shot attachment");
            Session::attach(
                store,
                config.diff_strategy.clone(),
                config.codec.clone(),
                SessionSink::OneShot(reply),
            );
        }
        Message::Dispatch {
            destination,
            payload,
        } if destination == config.destination_name => {
            match config.codec.decode(&payload).and_then(|p| p.into_action()) {
                Ok(action) => handle_dispatch(
                    store,
                    &config.dispatch_responder,
                    action.with_sender(sender),
                    reply,
                ),
                Err(err) => tracing::warn!(error = %err, "undecodable dispatch payload"),
            }
        }
        // Not addressed to this engine; another listener may handle it.
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BridgeError, DispatchError};
    use crate::message::Payload;
    use crate::store::MemoryStore;
    use crate::transport::{MemoryHub, MirrorLink};
    use mirror_state::{Action, StateMap, Value};
    use std::time::Duration;
    use tokio::time::timeout;

    fn test_store() -> Arc<dyn StateSource> {
        Arc::new(MemoryStore::new(StateMap::new(), |state, action| {
            state.insert("last".to_string(), action.payload.clone());
            Ok(Value::null())
        }))
    }

    #[tokio::test]
    async fn test_empty_destination_name_is_fatal() {
        let hub = MemoryHub::new();
        let result = StoreBridge::spawn(test_store(), &hub, BridgeConfig::new(""));
        assert_eq!(result.err(), Some(ConfigError::MissingDestinationName));
    }

    #[test]
    fn test_builder_rejects_empty_destination() {
        let result = BridgeConfig::builder("").allow_one_shot_connections(true).build();
        assert!(matches!(result, Err(ConfigError::MissingDestinationName)));
    }

    #[tokio::test]
    async fn test_channels_for_other_destinations_are_ignored() {
        let hub = MemoryHub::new();
        let store = test_store();
        let bridge = StoreBridge::spawn(store, &hub, BridgeConfig::new("app")).unwrap();

        let mut rx = hub.attach("somewhere-else").await.unwrap();
        let silent = timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(silent.is_err(), "expected no bootstrap, got {:?}", silent);
        assert_eq!(bridge.session_count(), 0);
    }

    #[tokio::test]
    async fn test_connect_is_ignored_unless_enabled() {
        let hub = MemoryHub::new();
        let _bridge = StoreBridge::spawn(test_store(), &hub, BridgeConfig::new("app")).unwrap();

        let result = hub.request(Message::Connect).await;
        assert_eq!(result, Err(BridgeError::ChannelClosed));
    }

    #[tokio::test]
    async fn test_connect_replies_with_state_when_enabled() {
        let hub = MemoryHub::new();
        let store = test_store();
        let config = BridgeConfig::builder("app")
            .allow_one_shot_connections(true)
            .build()
            .unwrap();
        let _bridge = StoreBridge::spawn(store.clone(), &hub, config).unwrap();

        let reply = hub.request(Message::Connect).await.unwrap();
        assert_eq!(
            reply,
            Message::State {
                payload: Payload::State(store.get_state()),
            }
        );
    }

    #[tokio::test]
    async fn test_dispatch_for_another_destination_is_ignored() {
        let hub = MemoryHub::new();
        let store = test_store();
        let _bridge = StoreBridge::spawn(store.clone(), &hub, BridgeConfig::new("app")).unwrap();

        let result = hub
            .request(Message::Dispatch {
                destination: "other".to_string(),
                payload: Payload::Action(Action::new("set", Value::from(1))),
            })
            .await;
        assert_eq!(result, Err(BridgeError::ChannelClosed));
        assert!(store.get_state().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_stamps_the_sender() {
        let hub = MemoryHub::new();
        let store: Arc<dyn StateSource> =
            Arc::new(MemoryStore::new(StateMap::new(), |state, action| {
                let sender = action
                    .sender
                    .as_ref()
                    .ok_or_else(|| DispatchError::Rejected("unstamped action".to_string()))?;
                state.insert("sender".to_string(), Value::from(sender.0.clone()));
                Ok(Value::null())
            }));
        let _bridge = StoreBridge::spawn(store.clone(), &hub, BridgeConfig::new("app")).unwrap();

        let reply = hub
            .request(Message::Dispatch {
                destination: "app".to_string(),
                payload: Payload::Action(Action::new("record", Value::null())),
            })
            .await
            .unwrap();

        assert_eq!(
            reply,
            Message::DispatchResponse {
                error: None,
                value: Some(Value::null()),
            }
        );
        assert_eq!(
            store.get_state().get("sender"),
            Some(&Value::from("request-1"))
        );
    }
}
