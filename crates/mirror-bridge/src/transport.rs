//! Transport abstraction.
//!
//! The engine never touches a concrete transport; it receives
//! attachments and one-shot requests from an injected [`ChannelHost`],
//! so it has zero ambient global state and is testable against the
//! in-memory [`MemoryHub`]. The mirror side of the same hub implements
//! [`MirrorLink`].

use crate::error::BridgeError;
use crate::message::Message;
use async_trait::async_trait;
use mirror_state::SenderId;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, oneshot};

/// One-shot reply slot. Consumed on send, so a response goes out at
/// most once; dropping it unanswered is how a request gets ignored.
#[derive(Debug)]
pub struct Reply {
    tx: oneshot::Sender<Message>,
}

impl Reply {
    pub fn new(tx: oneshot::Sender<Message>) -> Self {
        Self { tx }
    }

    pub fn send(self, message: Message) -> Result<(), BridgeError> {
        self.tx.send(message).map_err(|_| BridgeError::ChannelClosed)
    }
}

/// A long-lived named channel from a mirror. Messages posted to
/// `outbound` arrive at the mirror in order; the channel closing is
/// the disconnect notification.
#[derive(Debug)]
pub struct PersistentChannel {
    name: String,
    sender: SenderId,
    outbound: mpsc::Sender<Message>,
}

impl PersistentChannel {
    pub fn new(name: impl Into<String>, sender: SenderId, outbound: mpsc::Sender<Message>) -> Self {
        Self {
            name: name.into(),
            sender,
            outbound,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sender(&self) -> &SenderId {
        &self.sender
    }

    pub fn outbound(&self) -> mpsc::Sender<Message> {
        self.outbound.clone()
    }
}

/// A single request expecting exactly one reply.
#[derive(Debug)]
pub struct OneShotRequest {
    pub message: Message,
    pub sender: SenderId,
    pub reply: Reply,
}

/// What the transport delivers to the authoritative side.
#[derive(Debug)]
pub enum Inbound {
    Channel(PersistentChannel),
    Request(OneShotRequest),
}

/// The authoritative side's view of a transport: a stream of channel
/// attachments and one-shot requests.
pub trait ChannelHost: Send + Sync + 'static {
    /// Take the inbound stream. Can only be taken once.
    fn incoming(&self) -> mpsc::Receiver<Inbound>;
}

/// The mirror side's view of a transport.
#[async_trait]
pub trait MirrorLink: Send + Sync + 'static {
    /// Open a persistent named channel; the returned receiver yields
    /// the messages the authoritative side posts. Dropping it
    /// disconnects.
    async fn attach(&self, name: &str) -> Result<mpsc::Receiver<Message>, BridgeError>;

    /// Send a one-shot request and await the single reply. Fails with
    /// [`BridgeError::ChannelClosed`] if the request was ignored.
    async fn request(&self, message: Message) -> Result<Message, BridgeError>;
}

/// In-memory transport connecting mirrors to an authoritative side in
/// the same process. Used by tests and the demo.
pub struct MemoryHub {
    inbound_tx: mpsc::Sender<Inbound>,
    inbound_rx: RwLock<Option<mpsc::Receiver<Inbound>>>,
    next_id: AtomicU64,
}

impl MemoryHub {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(100);
        Self {
            inbound_tx: tx,
            inbound_rx: RwLock::new(Some(rx)),
            next_id: AtomicU64::new(0),
        }
    }

    fn next_sender(&self, prefix: &str) -> SenderId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        SenderId::new(format!("{}-{}", prefix, id))
    }
}

impl Default for MemoryHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelHost for MemoryHub {
    fn incoming(&self) -> mpsc::Receiver<Inbound> {
        self.inbound_rx
            .write()
            .take()
            .expect("incoming can only be taken once")
    }
}

#[async_trait]
impl MirrorLink for MemoryHub {
    async fn attach(&self, name: &str) -> Result<mpsc::Receiver<Message>, BridgeError> {
        let (tx, rx) = mpsc::channel(100);
        let channel = PersistentChannel::new(name, self.next_sender("mirror"), tx);
        self.inbound_tx
            .send(Inbound::Channel(channel))
            .await
            .map_err(|_| BridgeError::ChannelClosed)?;
        Ok(rx)
    }

    async fn request(&self, message: Message) -> Result<Message, BridgeError> {
        let (tx, rx) = oneshot::channel();
        let request = OneShotRequest {
            message,
            sender: self.next_sender("request"),
            reply: Reply::new(tx),
        };
        self.inbound_tx
            .send(Inbound::Request(request))
            .await
            .map_err(|_| BridgeError::ChannelClosed)?;
        rx.await.map_err(|_| BridgeError::ChannelClosed)
    }
}
