use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::Response,
};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::{Mutex, broadcast::error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::channel::{ChannelMsg, ChannelReceiver, ServerSocket};

/// Upgrade the request and serve the realtime protocol on the resulting websocket.
///
/// ```
/// # #[cfg(feature = "ssr")]
/// # mod doc {
/// use axum::{extract::{State, WebSocketUpgrade}, response::Response};
/// use leptos_realtime_widget::ServerSocket;
///
/// pub async fn connect_to_websocket(
///     ws: WebSocketUpgrade,
///     State(socket): State<ServerSocket>,
/// ) -> Response {
///     leptos_realtime_widget::handlers::upgrade_websocket(ws, socket)
/// }
/// # }
/// ```
pub fn upgrade_websocket(ws: WebSocketUpgrade, socket: ServerSocket) -> Response {
    ws.on_upgrade(|websocket| handle_websocket(websocket, socket))
}

/// Serve the realtime protocol on an already upgraded websocket until the client disconnects.
pub async fn handle_websocket(ws: WebSocket, socket: ServerSocket) {
    let (ws_tx, ws_rx) = ws.split();

    serve_connection(ws_rx, ws_tx, socket).await;
}

#[instrument(skip_all, fields(connection_id = %Uuid::new_v4()))]
pub(crate) async fn serve_connection<Rx, Tx, E>(mut ws_rx: Rx, ws_tx: Tx, socket: ServerSocket)
where
    Rx: Stream<Item = Result<Message, E>> + Unpin,
    Tx: Sink<Message> + Unpin + Send + 'static,
{
    let ws_tx = Arc::new(Mutex::new(ws_tx));
    let mut subscriptions: HashMap<String, JoinHandle<()>> = HashMap::new();

    while let Some(Ok(msg)) = ws_rx.next().await {
        let text = match msg {
            Message::Close(_) => break,
            Message::Text(text) => text,
            _ => continue,
        };

        debug!("Received Text: {text}");

        let msg: ChannelMsg = match serde_json::from_str(text.as_str()) {
            Ok(msg) => msg,
            Err(err) => {
                debug!("Skipping malformed frame: {err}");
                continue;
            }
        };

        match msg {
            ChannelMsg::Subscribe { channel } => {
                if subscriptions.contains_key(&channel) {
                    continue;
                }

                let broadcast_rx = socket.subscribe(&channel);
                let handle = tokio::spawn(recv_broadcast(Arc::clone(&ws_tx), broadcast_rx));

                subscriptions.insert(channel, handle);
            }
            ChannelMsg::Unsubscribe { channel } => {
                // The aborted task drops its receiver, which prunes the channel.
                if let Some(handle) = subscriptions.remove(&channel) {
                    handle.abort();
                }
            }
            ChannelMsg::Msg { channel, msg } => {
                socket.publish(&channel, msg);
            }
        }
    }

    for (_, handle) in subscriptions {
        handle.abort();
    }

    debug!("Connection closed");
}

async fn recv_broadcast<Tx>(client_tx: Arc<Mutex<Tx>>, mut broadcast_rx: ChannelReceiver)
where
    Tx: Sink<Message> + Unpin,
{
    loop {
        let msg = match broadcast_rx.recv().await {
            Ok(msg) => msg,
            Err(RecvError::Lagged(skipped)) => {
                debug!("Subscriber lagged behind, skipped {skipped} messages");
                continue;
            }
            Err(RecvError::Closed) => return,
        };

        let Ok(text) = serde_json::to_string(&msg) else {
            continue;
        };

        if client_tx
            .lock()
            .await
            .send(Message::text(text))
            .await
            .is_err()
        {
            return; // disconnected.
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::channel::mpsc;

    use super::*;
    use crate::channel::ChannelMessage;

    fn frame(msg: &ChannelMsg) -> Result<Message, ()> {
        Ok(Message::text(serde_json::to_string(msg).unwrap()))
    }

    async fn next_envelope(rx: &mut mpsc::UnboundedReceiver<Message>) -> ChannelMsg {
        let msg = tokio::time::timeout(Duration::from_secs(1), rx.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("connection closed");

        match msg {
            Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
            other => panic!("unexpected frame {other:?}"),
        }
    }

    async fn wait_for_no_channels(socket: &ServerSocket) {
        for _ in 0..100 {
            if socket.channel_count() == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected every channel to be pruned, {socket:?}");
    }

    async fn wait_for_subscribers(socket: &ServerSocket, channel: &str, count: usize) {
        for _ in 0..100 {
            if socket.subscriber_count(channel) == count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected {count} subscribers on {channel}");
    }

    #[tokio::test]
    async fn test_subscribed_connection_receives_published_messages() {
        let socket = ServerSocket::new();
        let (in_tx, in_rx) = mpsc::unbounded();
        let (out_tx, mut out_rx) = mpsc::unbounded::<Message>();

        let server = tokio::spawn(serve_connection(in_rx, out_tx, socket.clone()));

        in_tx
            .unbounded_send(frame(&ChannelMsg::Subscribe {
                channel: "news".to_string(),
            }))
            .unwrap();
        wait_for_subscribers(&socket, "news", 1).await;

        in_tx
            .unbounded_send(frame(&ChannelMsg::Msg {
                channel: "news".to_string(),
                msg: ChannelMessage::new("myEventName", "hello"),
            }))
            .unwrap();

        assert_eq!(
            next_envelope(&mut out_rx).await,
            ChannelMsg::Msg {
                channel: "news".to_string(),
                msg: ChannelMessage::new("myEventName", "hello"),
            }
        );

        drop(in_tx);
        server.await.unwrap();
        wait_for_subscribers(&socket, "news", 0).await;
        wait_for_no_channels(&socket).await;
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_forwarding() {
        let socket = ServerSocket::new();
        let (in_tx, in_rx) = mpsc::unbounded();
        let (out_tx, mut out_rx) = mpsc::unbounded::<Message>();

        let server = tokio::spawn(serve_connection(in_rx, out_tx, socket.clone()));

        in_tx
            .unbounded_send(frame(&ChannelMsg::Subscribe {
                channel: "news".to_string(),
            }))
            .unwrap();
        wait_for_subscribers(&socket, "news", 1).await;

        in_tx
            .unbounded_send(frame(&ChannelMsg::Unsubscribe {
                channel: "news".to_string(),
            }))
            .unwrap();
        wait_for_subscribers(&socket, "news", 0).await;
        wait_for_no_channels(&socket).await;

        socket.publish("news", ChannelMessage::new("evt", "late"));
        assert_eq!(socket.channel_count(), 0);

        drop(in_tx);
        server.await.unwrap();
        assert!(out_rx.try_next().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_frames_are_skipped() {
        let socket = ServerSocket::new();
        let (in_tx, in_rx) = mpsc::unbounded();
        let (out_tx, _out_rx) = mpsc::unbounded::<Message>();

        let server = tokio::spawn(serve_connection(in_rx, out_tx, socket.clone()));

        in_tx.unbounded_send(Ok(Message::text("not json"))).unwrap();
        in_tx
            .unbounded_send(frame(&ChannelMsg::Msg {
                channel: "nobody-listens".to_string(),
                msg: ChannelMessage::new("evt", "lost"),
            }))
            .unwrap();
        in_tx
            .unbounded_send(frame(&ChannelMsg::Subscribe {
                channel: "news".to_string(),
            }))
            .unwrap();
        wait_for_subscribers(&socket, "news", 1).await;
        assert_eq!(socket.channel_count(), 1);

        drop(in_tx);
        server.await.unwrap();
        wait_for_no_channels(&socket).await;
    }
}
