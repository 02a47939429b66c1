use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, instrument};
use uuid::Uuid;

use super::{ChannelMessage, MessageHandler, RealtimeChannel, RealtimeClient, RealtimeError};

/// A message that went through [`RealtimeChannel::publish`] on a [`MemoryClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub channel: String,
    pub message: ChannelMessage,
}

struct Subscriber {
    handle_id: Uuid,
    handler: MessageHandler,
}

#[derive(Default)]
struct Broker {
    subscribers: Mutex<HashMap<String, Vec<Subscriber>>>,
    published: Mutex<Vec<PublishedMessage>>,
    offline: AtomicBool,
    no_echo: AtomicBool,
}

/// In-process realtime client.
///
/// Every clone talks to the same broker, so two widgets holding clones of one
/// `MemoryClient` see each other's messages. Publishes are recorded and can be
/// inspected with [`MemoryClient::published`].
#[derive(Clone, Default)]
pub struct MemoryClient {
    broker: Arc<Broker>,
}

impl std::fmt::Debug for MemoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let subscribers = self
            .broker
            .subscribers
            .lock()
            .expect("Failed to acquire lock on subscriber map");

        f.debug_struct("MemoryClient")
            .field(
                "channels",
                &subscribers
                    .iter()
                    .map(|(name, subs)| (name.clone(), subs.len()))
                    .collect::<HashMap<_, _>>(),
            )
            .field("offline", &self.broker.offline.load(Ordering::SeqCst))
            .finish()
    }
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a publish is also delivered back to the channel's own subscribers. On by default.
    pub fn with_echo(self, echo: bool) -> Self {
        self.broker.no_echo.store(!echo, Ordering::SeqCst);
        self
    }

    /// While offline, acquiring channels and publishing fail with [`RealtimeError::NotConnected`].
    pub fn set_offline(&self, offline: bool) {
        self.broker.offline.store(offline, Ordering::SeqCst);
    }

    /// Deliver a message to the subscribers of `channel` as if it came from a remote peer.
    #[instrument(skip(self))]
    pub fn deliver(&self, channel: &str, message: ChannelMessage) {
        let handlers = self.handlers(channel);

        if handlers.is_empty() {
            debug!("Dropping message because there are no subscribers");
        }

        // Handlers run without the lock held so they are free to publish.
        for handler in handlers {
            handler(&message);
        }
    }

    /// The handlers currently registered on `channel`, in registration order.
    pub fn handlers(&self, channel: &str) -> Vec<MessageHandler> {
        self.broker
            .subscribers
            .lock()
            .expect("Failed to acquire lock on subscriber map")
            .get(channel)
            .map(|subs| subs.iter().map(|sub| Arc::clone(&sub.handler)).collect())
            .unwrap_or_default()
    }

    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.broker
            .subscribers
            .lock()
            .expect("Failed to acquire lock on subscriber map")
            .get(channel)
            .map_or(0, Vec::len)
    }

    /// Everything published so far, oldest first.
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.broker
            .published
            .lock()
            .expect("Failed to acquire lock on publish log")
            .clone()
    }

    fn ensure_online(&self) -> Result<(), RealtimeError> {
        if self.broker.offline.load(Ordering::SeqCst) {
            Err(RealtimeError::NotConnected)
        } else {
            Ok(())
        }
    }
}

impl RealtimeClient for MemoryClient {
    fn channel(&self, name: &str) -> Result<Arc<dyn RealtimeChannel>, RealtimeError> {
        self.ensure_online()?;

        Ok(Arc::new(MemoryChannel {
            name: name.to_string(),
            handle_id: Uuid::new_v4(),
            client: self.clone(),
        }))
    }
}

struct MemoryChannel {
    name: String,
    handle_id: Uuid,
    client: MemoryClient,
}

impl RealtimeChannel for MemoryChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn subscribe(&self, handler: MessageHandler) -> Result<(), RealtimeError> {
        self.client.ensure_online()?;

        self.client
            .broker
            .subscribers
            .lock()
            .expect("Failed to acquire lock on subscriber map")
            .entry(self.name.clone())
            .or_default()
            .push(Subscriber {
                handle_id: self.handle_id,
                handler,
            });

        Ok(())
    }

    fn unsubscribe(&self) {
        let mut subscribers = self
            .client
            .broker
            .subscribers
            .lock()
            .expect("Failed to acquire lock on subscriber map");

        if let Some(subs) = subscribers.get_mut(&self.name) {
            subs.retain(|sub| sub.handle_id != self.handle_id);

            if subs.is_empty() {
                subscribers.remove(&self.name);
            }
        }
    }

    fn publish(&self, message: ChannelMessage) -> Result<(), RealtimeError> {
        self.client.ensure_online()?;

        self.client
            .broker
            .published
            .lock()
            .expect("Failed to acquire lock on publish log")
            .push(PublishedMessage {
                channel: self.name.clone(),
                message: message.clone(),
            });

        if !self.client.broker.no_echo.load(Ordering::SeqCst) {
            self.client.deliver(&self.name, message);
        }

        Ok(())
    }
}
