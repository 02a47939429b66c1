use leptos::prelude::*;

use super::{ChannelSubscription, MessageList, MessageLog, WidgetState};
use crate::{
    RealtimeConfig, RealtimeError, SharedClient, expect_realtime_client, use_realtime_config,
};

/// Messaging widget with explicit lifecycle methods.
///
/// The component wrapper [`MessagingPanelView`] calls [`MessagingPanel::component_did_mount`]
/// when it is created and [`MessagingPanel::component_will_unmount`] when it is cleaned up.
/// The panel itself is `Copy`, so it can be moved into event handlers freely.
///
/// ```
/// # use std::sync::Arc;
/// # use leptos::prelude::*;
/// # use leptos_realtime_widget::{ChannelMessage, MemoryClient, MessagingPanel, RealtimeConfig};
/// let owner = Owner::new();
/// owner.with(|| {
///     let client = MemoryClient::new();
///     let panel = MessagingPanel::new(Arc::new(client.clone()), RealtimeConfig::default());
///
///     panel.component_did_mount().unwrap();
///     client.deliver("my-cool-channel", ChannelMessage::new("myEventName", "hello"));
///     assert_eq!(panel.message_texts(), vec!["hello"]);
///
///     panel.component_will_unmount();
/// });
/// ```
#[derive(Copy, Clone)]
pub struct MessagingPanel {
    client: StoredValue<SharedClient>,
    config: StoredValue<RealtimeConfig>,
    state: RwSignal<WidgetState>,
    messages: RwSignal<MessageLog>,
    subscription: StoredValue<Option<ChannelSubscription>>,
}

impl MessagingPanel {
    pub fn new(client: SharedClient, config: RealtimeConfig) -> Self {
        let messages = MessageLog::with_limit(config.max_messages);

        Self {
            client: StoredValue::new(client),
            config: StoredValue::new(config),
            state: RwSignal::new(WidgetState::Unmounted),
            messages: RwSignal::new(messages),
            subscription: StoredValue::new(None),
        }
    }

    /// Create and mount a panel that unmounts itself when the current owner is cleaned up.
    pub fn attach(client: SharedClient, config: RealtimeConfig) -> Result<Self, RealtimeError> {
        let panel = Self::new(client, config);
        panel.component_did_mount()?;

        on_cleanup(move || panel.component_will_unmount());

        Ok(panel)
    }

    /// Subscribe to the configured channel, starting with an empty message list.
    ///
    /// Does nothing if the panel is already mounted. Errors from the client are returned
    /// as they are and leave the panel unmounted.
    pub fn component_did_mount(&self) -> Result<(), RealtimeError> {
        if self.state.get_untracked() != WidgetState::Unmounted {
            return Ok(());
        }

        self.state.set(WidgetState::Mounting);

        let (channel, limit) = self
            .config
            .with_value(|config| (config.channel.clone(), config.max_messages));
        self.messages.set(MessageLog::with_limit(limit));

        let messages = self.messages;
        let opened = self.client.with_value(|client| {
            ChannelSubscription::open(client.as_ref(), &channel, move |text| {
                messages.update(|log| log.push(text));
            })
        });

        match opened {
            Ok(subscription) => {
                self.subscription.set_value(Some(subscription));
                self.state.set(WidgetState::Subscribed);
                Ok(())
            }
            Err(err) => {
                self.state.set(WidgetState::Unmounted);
                Err(err)
            }
        }
    }

    /// Unsubscribe from the channel. Safe to call more than once.
    pub fn component_will_unmount(&self) {
        if self.state.try_get_untracked() != Some(WidgetState::Subscribed) {
            return;
        }

        self.state.try_set(WidgetState::Unmounting);

        if let Some(Some(subscription)) = self.subscription.try_update_value(Option::take) {
            subscription.close();
        }

        self.state.try_set(WidgetState::Unmounted);
    }

    /// Publish the configured demo message.
    ///
    /// Only does something while subscribed; before mounting and after unmounting it is a no-op.
    pub fn send_message(&self) -> Result<(), RealtimeError> {
        if self.state.get_untracked() != WidgetState::Subscribed {
            leptos::logging::warn!("Not subscribed yet, message not sent");
            return Ok(());
        }

        let message = self.config.with_value(RealtimeConfig::demo_message);

        match self.subscription.get_value() {
            Some(subscription) => subscription.publish(message),
            None => Ok(()),
        }
    }

    pub fn state(&self) -> Signal<WidgetState> {
        self.state.into()
    }

    pub fn messages(&self) -> Signal<MessageLog> {
        self.messages.into()
    }

    /// Received texts in arrival order, read without tracking.
    pub fn message_texts(&self) -> Vec<String> {
        self.messages.with_untracked(MessageLog::texts)
    }

    pub fn render(self) -> impl IntoView {
        let on_send = move || {
            if let Err(err) = self.send_message() {
                leptos::logging::error!("Failed to send message: {}", err);
            }
        };

        view! { <MessageList messages=self.messages() on_send /> }
    }
}

/// Component wrapper around [`MessagingPanel`].
///
/// Uses the client and config from context unless they are passed in. Failing to
/// subscribe is returned as an error to the surrounding view.
#[component]
pub fn MessagingPanelView(
    #[prop(optional)] client: Option<SharedClient>,
    #[prop(optional)] config: Option<RealtimeConfig>,
) -> impl IntoView {
    let client = client.unwrap_or_else(expect_realtime_client);
    let config = config.unwrap_or_else(use_realtime_config);

    MessagingPanel::attach(client, config).map(MessagingPanel::render)
}
