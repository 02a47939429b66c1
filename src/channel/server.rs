use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[cfg(test)]
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::broadcast::{Receiver, Sender, error::RecvError};
use tracing::{debug, instrument};

use super::{ChannelMessage, ChannelMsg};

const CHANNEL_CAPACITY: usize = 16;

/// This is used on the server to fan messages out to every websocket subscribed to a channel.
#[derive(Clone, Default)]
pub struct ServerSocket {
    sender_map: Arc<Mutex<HashMap<String, Sender<ChannelMsg>>>>,
}

impl std::fmt::Debug for ServerSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerSocket")
            .field(
                "channels",
                &self
                    .sender_map
                    .lock()
                    .expect("Failed to acquire lock on sender map")
                    .keys()
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl ServerSocket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Broadcast a message to every subscriber of `channel`. Returns how many receivers got it.
    #[instrument(skip(self))]
    pub fn publish(&self, channel: &str, msg: ChannelMessage) -> usize {
        let sender = self
            .sender_map
            .lock()
            .expect("Failed to acquire lock on sender map")
            .get(channel)
            .cloned();

        let Some(sender) = sender else {
            debug!("Dropping message because nobody subscribed to the channel");
            return 0;
        };

        let envelope = ChannelMsg::Msg {
            channel: channel.to_string(),
            msg,
        };

        match sender.send(envelope) {
            Ok(receivers) => receivers,
            Err(err) => {
                debug!(
                    "Failed to send message because there are no receivers: {:?}",
                    err
                );
                0
            }
        }
    }

    /// Subscribe to `channel`. Dropping the returned receiver prunes the channel once it
    /// has no receivers left.
    #[instrument(skip(self))]
    pub(crate) fn subscribe(&self, channel: &str) -> ChannelReceiver {
        let rx = self
            .sender_map
            .lock()
            .expect("Failed to acquire lock on sender map")
            .entry(channel.to_string())
            .or_insert_with(|| {
                debug!("Creating new sender for channel");

                Sender::new(CHANNEL_CAPACITY)
            })
            .subscribe();

        ChannelReceiver {
            rx: Some(rx),
            channel: channel.to_string(),
            socket: self.clone(),
        }
    }

    /// Forget `channel` if nobody is subscribed to it anymore. Returns whether it was removed.
    pub fn prune(&self, channel: &str) -> bool {
        let mut sender_map = self
            .sender_map
            .lock()
            .expect("Failed to acquire lock on sender map");

        if sender_map
            .get(channel)
            .is_some_and(|sender| sender.receiver_count() == 0)
        {
            sender_map.remove(channel);
            debug!(channel, "Removed sender for channel without receivers");
            true
        } else {
            false
        }
    }

    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.sender_map
            .lock()
            .expect("Failed to acquire lock on sender map")
            .get(channel)
            .map_or(0, Sender::receiver_count)
    }

    /// Number of channels with a live sender.
    pub fn channel_count(&self) -> usize {
        self.sender_map
            .lock()
            .expect("Failed to acquire lock on sender map")
            .len()
    }
}

/// Receiving end of a [`ServerSocket`] subscription.
pub(crate) struct ChannelReceiver {
    rx: Option<Receiver<ChannelMsg>>,
    channel: String,
    socket: ServerSocket,
}

impl ChannelReceiver {
    pub(crate) async fn recv(&mut self) -> Result<ChannelMsg, RecvError> {
        match self.rx.as_mut() {
            Some(rx) => rx.recv().await,
            None => Err(RecvError::Closed),
        }
    }

    #[cfg(test)]
    fn try_recv(&mut self) -> Result<ChannelMsg, TryRecvError> {
        match self.rx.as_mut() {
            Some(rx) => rx.try_recv(),
            None => Err(TryRecvError::Closed),
        }
    }
}

impl Drop for ChannelReceiver {
    fn drop(&mut self) {
        // The receiver has to go first, otherwise it still counts.
        drop(self.rx.take());
        self.socket.prune(&self.channel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_every_receiver_in_order() {
        let socket = ServerSocket::new();
        let mut first = socket.subscribe("news");
        let mut second = socket.subscribe("news");

        assert_eq!(socket.publish("news", ChannelMessage::new("evt", "a")), 2);
        assert_eq!(socket.publish("news", ChannelMessage::new("evt", "b")), 2);

        for rx in [&mut first, &mut second] {
            for expected in ["a", "b"] {
                match rx.recv().await.unwrap() {
                    ChannelMsg::Msg { channel, msg } => {
                        assert_eq!(channel, "news");
                        assert_eq!(msg.text(), expected);
                    }
                    other => panic!("unexpected envelope {other:?}"),
                }
            }
        }
    }

    #[tokio::test]
    async fn test_publish_without_receivers_is_not_an_error() {
        let socket = ServerSocket::new();

        assert_eq!(socket.publish("empty", ChannelMessage::new("evt", "a")), 0);
        assert_eq!(socket.subscriber_count("empty"), 0);
        assert_eq!(socket.channel_count(), 0);
    }

    #[tokio::test]
    async fn test_dropped_receivers_leave_no_channels_behind() {
        let socket = ServerSocket::new();

        for i in 0..1000 {
            let rx = socket.subscribe(&format!("chan-{i}"));
            drop(rx);
        }

        assert_eq!(socket.channel_count(), 0);
    }

    #[tokio::test]
    async fn test_channel_is_kept_while_someone_listens() {
        let socket = ServerSocket::new();
        let first = socket.subscribe("news");
        let _second = socket.subscribe("news");

        drop(first);
        assert!(!socket.prune("news"));
        assert_eq!(socket.subscriber_count("news"), 1);
        assert_eq!(socket.channel_count(), 1);
    }

    #[tokio::test]
    async fn test_channels_are_isolated() {
        let socket = ServerSocket::new();
        let mut news = socket.subscribe("news");
        let _sports = socket.subscribe("sports");

        socket.publish("sports", ChannelMessage::new("evt", "goal"));

        assert!(news.try_recv().is_err());
        assert_eq!(socket.subscriber_count("news"), 1);
    }
}
