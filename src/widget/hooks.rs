use leptos::prelude::*;

use super::{ChannelSubscription, MessageList, MessageLog, WidgetState};
use crate::{
    RealtimeConfig, RealtimeError, SharedClient, expect_realtime_client, use_realtime_config,
};

/// Return type of [`use_channel_messages`].
pub struct UseChannelMessagesReturn<SendFn>
where
    SendFn: Fn() + Clone + Send + Sync + 'static,
{
    /// Received messages in arrival order.
    pub messages: Signal<MessageLog>,
    pub state: Signal<WidgetState>,
    /// Publishes the configured demo message. Failures are logged.
    pub send_message: SendFn,
}

/// Subscribe to `config.channel` for as long as the calling component lives.
///
/// The subscription is made exactly once, when this is called, and removed in
/// the component's cleanup.
pub fn use_channel_messages(
    client: SharedClient,
    config: RealtimeConfig,
) -> Result<UseChannelMessagesReturn<impl Fn() + Clone + Send + Sync + 'static>, RealtimeError> {
    let messages = RwSignal::new(MessageLog::with_limit(config.max_messages));
    let state = RwSignal::new(WidgetState::Mounting);

    let opened = ChannelSubscription::open(client.as_ref(), &config.channel, move |text| {
        messages.update(|log| log.push(text));
    });

    let subscription = match opened {
        Ok(subscription) => subscription,
        Err(err) => {
            state.set(WidgetState::Unmounted);
            return Err(err);
        }
    };

    state.set(WidgetState::Subscribed);

    on_cleanup({
        let subscription = subscription.clone();

        move || {
            state.try_set(WidgetState::Unmounting);
            subscription.close();
            state.try_set(WidgetState::Unmounted);
        }
    });

    let demo_message = config.demo_message();
    let send_message = move || {
        if !subscription.is_open() {
            leptos::logging::warn!("Not subscribed, message not sent");
            return;
        }

        if let Err(err) = subscription.publish(demo_message.clone()) {
            leptos::logging::error!("Failed to send message: {}", err);
        }
    };

    Ok(UseChannelMessagesReturn {
        messages: messages.into(),
        state: state.into(),
        send_message,
    })
}

/// Function-style messaging widget.
///
/// Uses the client and config from context unless they are passed in.
#[component]
pub fn MessagingWidget(
    #[prop(optional)] client: Option<SharedClient>,
    #[prop(optional)] config: Option<RealtimeConfig>,
) -> impl IntoView {
    let client = client.unwrap_or_else(expect_realtime_client);
    let config = config.unwrap_or_else(use_realtime_config);

    use_channel_messages(client, config).map(|ret| {
        let UseChannelMessagesReturn {
            messages,
            send_message,
            ..
        } = ret;

        view! { <MessageList messages on_send=send_message heading="Messages will go here:" /> }
    })
}
