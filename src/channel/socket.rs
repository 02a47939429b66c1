use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use leptos::prelude::*;
use leptos_use::core::ConnectionReadyState;
use uuid::Uuid;

use super::{
    ChannelMessage, ChannelMsg, MessageHandler, RealtimeChannel, RealtimeClient, RealtimeError,
};

type SendFn = Arc<dyn Fn(&ChannelMsg) + Send + Sync + 'static>;
type SimpleFn = Arc<dyn Fn() + Send + Sync + 'static>;
type HandlerMap = HashMap<String, Vec<(Uuid, MessageHandler)>>;

struct SocketInner {
    ready_state: Signal<ConnectionReadyState>,
    send: SendFn,
    open: SimpleFn,
    close: SimpleFn,
    handlers: Mutex<HandlerMap>,
}

impl SocketInner {
    fn is_open(&self) -> bool {
        self.ready_state.get_untracked() == ConnectionReadyState::Open
    }

    fn dispatch(&self, channel: &str, msg: &ChannelMessage) {
        let handlers = self
            .handlers
            .lock()
            .expect("Failed to acquire lock on handler map")
            .get(channel)
            .map(|subs| {
                subs.iter()
                    .map(|(_, handler)| Arc::clone(handler))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        for handler in handlers {
            handler(msg);
        }
    }

    fn subscribed_channels(&self) -> Vec<String> {
        self.handlers
            .lock()
            .expect("Failed to acquire lock on handler map")
            .keys()
            .cloned()
            .collect()
    }
}

/// Realtime client that talks to a [`ServerSocket`](crate::ServerSocket) over a websocket.
///
/// Has to be created inside a reactive owner, usually your root component:
///
/// ```ignore
/// #[component]
/// pub fn App() -> impl IntoView {
///     let client = SocketClient::connect("my-api-key");
///     provide_realtime_client(Arc::new(client));
///
///     view! { "..." }
/// }
/// ```
#[derive(Clone)]
pub struct SocketClient {
    inner: Arc<SocketInner>,
}

impl SocketClient {
    /// Open the websocket. The API key is passed to the server as the `key` query parameter.
    pub fn connect(api_key: &str) -> Self {
        use leptos::server::codee::string::JsonSerdeCodec;
        use leptos_use::{
            ReconnectLimit, UseWebSocketOptions, UseWebSocketReturn, use_websocket_with_options,
        };

        let url = match serde_urlencoded::to_string(&[("key", api_key)]) {
            Ok(query) => format!("{}?{}", crate::WEBSOCKET_CHANNEL_URL, query),
            Err(err) => {
                leptos::logging::error!("Failed to encode API key: {}", err);
                crate::WEBSOCKET_CHANNEL_URL.to_string()
            }
        };

        let UseWebSocketReturn {
            message,
            send,
            ready_state,
            open,
            close,
            ..
        } = use_websocket_with_options::<ChannelMsg, ChannelMsg, JsonSerdeCodec, _, _>(
            url.as_str(),
            UseWebSocketOptions::default()
                .reconnect_limit(ReconnectLimit::Infinite)
                .on_error(|error| {
                    leptos::logging::error!("WebSocket error: {}", error);
                }),
        );

        let inner = Arc::new(SocketInner {
            ready_state,
            send: Arc::new(send),
            open: Arc::new(open),
            close: Arc::new(close),
            handlers: Mutex::new(HashMap::new()),
        });

        // The server forgets subscriptions when the connection drops.
        Effect::new({
            let inner = Arc::clone(&inner);

            move || {
                if inner.ready_state.get() == ConnectionReadyState::Open {
                    for channel in inner.subscribed_channels() {
                        (inner.send)(&ChannelMsg::Subscribe { channel });
                    }
                }
            }
        });

        Effect::new({
            let inner = Arc::clone(&inner);

            move || {
                if let Some(ChannelMsg::Msg { channel, msg }) = message.read().as_ref() {
                    inner.dispatch(channel, msg);
                }
            }
        });

        Self { inner }
    }

    /// Disconnects and re-connects the websocket. Subscriptions are restored once it is open again.
    pub fn reconnect(&self) {
        (self.inner.close)();
        (self.inner.open)();
    }

    pub fn ready_state(&self) -> Signal<ConnectionReadyState> {
        self.inner.ready_state
    }
}

impl RealtimeClient for SocketClient {
    fn channel(&self, name: &str) -> Result<Arc<dyn RealtimeChannel>, RealtimeError> {
        Ok(Arc::new(SocketChannel {
            name: name.to_string(),
            handle_id: Uuid::new_v4(),
            inner: Arc::clone(&self.inner),
        }))
    }
}

struct SocketChannel {
    name: String,
    handle_id: Uuid,
    inner: Arc<SocketInner>,
}

impl RealtimeChannel for SocketChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn subscribe(&self, handler: MessageHandler) -> Result<(), RealtimeError> {
        let first = {
            let mut handlers = self
                .inner
                .handlers
                .lock()
                .expect("Failed to acquire lock on handler map");
            let subs = handlers.entry(self.name.clone()).or_default();
            subs.push((self.handle_id, handler));
            subs.len() == 1
        };

        // Otherwise the reconnect effect subscribes once the socket is open.
        if first && self.inner.is_open() {
            (self.inner.send)(&ChannelMsg::Subscribe {
                channel: self.name.clone(),
            });
        }

        Ok(())
    }

    fn unsubscribe(&self) {
        let last = {
            let mut handlers = self
                .inner
                .handlers
                .lock()
                .expect("Failed to acquire lock on handler map");

            let Some(subs) = handlers.get_mut(&self.name) else {
                return;
            };

            let before = subs.len();
            subs.retain(|(id, _)| *id != self.handle_id);
            let removed = subs.len() < before;
            let emptied = subs.is_empty();

            if emptied {
                handlers.remove(&self.name);
            }

            removed && emptied
        };

        if last && self.inner.is_open() {
            (self.inner.send)(&ChannelMsg::Unsubscribe {
                channel: self.name.clone(),
            });
        }
    }

    fn publish(&self, message: ChannelMessage) -> Result<(), RealtimeError> {
        if !self.inner.is_open() {
            return Err(RealtimeError::NotConnected);
        }

        (self.inner.send)(&ChannelMsg::Msg {
            channel: self.name.clone(),
            msg: message,
        });

        Ok(())
    }
}
