use std::sync::Arc;

use leptos::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod memory;
#[cfg(feature = "ssr")]
mod server;
mod socket;

pub use memory::{MemoryClient, PublishedMessage};
#[cfg(feature = "ssr")]
pub(crate) use server::ChannelReceiver;
#[cfg(feature = "ssr")]
pub use server::ServerSocket;
pub use socket::SocketClient;

pub const WEBSOCKET_CHANNEL_URL: &str = "/realtime";

/// Payload body of a channel message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageData {
    pub text: String,
}

/// A single named event travelling over a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMessage {
    pub name: String,
    pub data: MessageData,
}

impl ChannelMessage {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: MessageData { text: text.into() },
        }
    }

    pub fn text(&self) -> &str {
        &self.data.text
    }
}

/// Callback invoked for every message delivered on a subscribed channel.
pub type MessageHandler = Arc<dyn Fn(&ChannelMessage) + Send + Sync + 'static>;

/// A realtime client that can be shared between components.
pub type SharedClient = Arc<dyn RealtimeClient>;

#[derive(Debug, Error)]
pub enum RealtimeError {
    #[error("not connected to the realtime service")]
    NotConnected,

    #[error("channel `{0}` is closed")]
    ChannelClosed(String),
}

/// A connected realtime messaging client.
///
/// Implement this to plug a different transport into the widgets. The crate ships
/// [`SocketClient`] for browsers talking to a [`ServerSocket`] and [`MemoryClient`]
/// for in-process use and tests.
pub trait RealtimeClient: Send + Sync {
    /// Get a handle for the channel with the given name. Every call returns a new handle.
    fn channel(&self, name: &str) -> Result<Arc<dyn RealtimeChannel>, RealtimeError>;
}

/// A handle to a single named channel.
pub trait RealtimeChannel: Send + Sync {
    fn name(&self) -> &str;

    /// Register a handler. Messages are passed to it in the order the transport delivers them.
    fn subscribe(&self, handler: MessageHandler) -> Result<(), RealtimeError>;

    /// Remove every handler that was registered through this handle.
    /// Calling this more than once is fine.
    fn unsubscribe(&self);

    /// Send one message to everyone subscribed to this channel.
    fn publish(&self, message: ChannelMessage) -> Result<(), RealtimeError>;
}

/// Envelope exchanged between [`SocketClient`] and the server over the websocket.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub(crate) enum ChannelMsg {
    Msg { channel: String, msg: ChannelMessage },
    Subscribe { channel: String },
    Unsubscribe { channel: String },
}

/// Call this in your root component to provide the realtime client to the widgets.
#[inline(always)]
pub fn provide_realtime_client(client: SharedClient) {
    provide_context(client);
}

/// Call this in a component that needs the realtime client provided further up.
#[inline(always)]
pub fn expect_realtime_client() -> SharedClient {
    expect_context()
}
