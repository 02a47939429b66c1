//! Building blocks shared by both messaging widgets.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use leptos::prelude::*;

use crate::{ChannelMessage, MessageHandler, RealtimeChannel, RealtimeClient, RealtimeError};

mod hooks;
mod panel;

pub use hooks::*;
pub use panel::*;

/// Lifecycle of a messaging widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WidgetState {
    #[default]
    Unmounted,
    Mounting,
    Subscribed,
    Unmounting,
}

/// Ordered log of received message texts.
///
/// Every entry gets a sequence number that is never reused, so it can serve as a
/// stable render key even after old entries have been evicted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageLog {
    entries: VecDeque<(u64, String)>,
    next_seq: u64,
    limit: Option<usize>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A log that keeps at most `limit` entries. `None` and `Some(0)` mean unbounded.
    pub fn with_limit(limit: Option<usize>) -> Self {
        Self {
            limit: limit.filter(|limit| *limit > 0),
            ..Self::default()
        }
    }

    pub fn push(&mut self, text: impl Into<String>) {
        self.entries.push_back((self.next_seq, text.into()));
        self.next_seq += 1;

        if let Some(limit) = self.limit {
            while self.entries.len() > limit {
                self.entries.pop_front();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of messages pushed, including evicted ones.
    pub fn received(&self) -> u64 {
        self.next_seq
    }

    pub fn last(&self) -> Option<&str> {
        self.entries.back().map(|(_, text)| text.as_str())
    }

    pub fn texts(&self) -> Vec<String> {
        self.entries.iter().map(|(_, text)| text.clone()).collect()
    }

    pub fn entries(&self) -> Vec<(u64, String)> {
        self.entries.iter().cloned().collect()
    }
}

/// Shared flag that says whether the widget that created it is still mounted.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

impl Liveness {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Returns `true` only for the call that actually flipped the flag.
    pub fn revoke(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

/// One widget's subscription to a channel.
///
/// The handler registered on the channel checks a [`Liveness`] token before doing
/// anything, so messages arriving after [`ChannelSubscription::close`] are ignored
/// even if the transport still holds on to the handler.
#[derive(Clone)]
pub struct ChannelSubscription {
    channel: Arc<dyn RealtimeChannel>,
    liveness: Liveness,
}

impl std::fmt::Debug for ChannelSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelSubscription")
            .field("channel", &self.channel.name())
            .field("open", &self.is_open())
            .finish()
    }
}

impl ChannelSubscription {
    /// Acquire `channel_name` from the client and call `on_text` with the text of every message.
    pub fn open<F>(
        client: &dyn RealtimeClient,
        channel_name: &str,
        on_text: F,
    ) -> Result<Self, RealtimeError>
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        let channel = client.channel(channel_name)?;
        let liveness = Liveness::new();

        let handler: MessageHandler = Arc::new({
            let liveness = liveness.clone();

            move |msg: &ChannelMessage| {
                if !liveness.is_alive() {
                    return;
                }

                leptos::logging::log!("A message was received: {msg:?}");
                on_text(msg.data.text.clone());
            }
        });

        channel.subscribe(handler)?;
        leptos::logging::log!("You are subscribed to {channel_name}");

        Ok(Self { channel, liveness })
    }

    pub fn channel_name(&self) -> &str {
        self.channel.name()
    }

    pub fn is_open(&self) -> bool {
        self.liveness.is_alive()
    }

    /// Stop receiving messages. Only the first call has an effect.
    pub fn close(&self) {
        if self.liveness.revoke() {
            self.channel.unsubscribe();
            leptos::logging::log!("You are unsubscribed from {}", self.channel.name());
        }
    }

    pub fn publish(&self, message: ChannelMessage) -> Result<(), RealtimeError> {
        if !self.is_open() {
            return Err(RealtimeError::ChannelClosed(self.channel.name().to_string()));
        }

        self.channel.publish(message)
    }
}

/// Publish button, heading and the list of received messages.
#[component]
pub fn MessageList(
    messages: Signal<MessageLog>,
    on_send: impl Fn() + Send + Sync + 'static,
    #[prop(into, default = "Messages will appear here:".into())] heading: String,
) -> impl IntoView {
    view! {
        <main>
            <button on:click=move |_| on_send()>"Click here to send a message"</button>
            <h2>{heading}</h2>
            <ul>
                <For
                    each=move || messages.get().entries()
                    key=|(seq, _)| *seq
                    children=move |(_, text)| view! { <li>{text}</li> }
                />
            </ul>
        </main>
    }
}
