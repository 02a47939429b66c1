use std::sync::Arc;

use leptos::prelude::*;
use leptos_realtime_widget::{
    ChannelMessage, MemoryClient, MessagingPanel, PublishedMessage, RealtimeConfig, WidgetState,
    use_channel_messages,
};

const CHANNEL: &str = "my-cool-channel";

#[test]
fn test_panel_full_scenario() {
    let owner = Owner::new();
    owner.with(|| {
        let client = MemoryClient::new().with_echo(false);
        let panel = MessagingPanel::new(Arc::new(client.clone()), RealtimeConfig::default());

        panel.component_did_mount().unwrap();
        let stale = client.handlers(CHANNEL).remove(0);

        client.deliver(CHANNEL, ChannelMessage::new("myEventName", "a"));
        client.deliver(CHANNEL, ChannelMessage::new("myEventName", "b"));
        assert_eq!(panel.message_texts(), vec!["a", "b"]);

        panel.send_message().unwrap();
        assert_eq!(
            client.published(),
            vec![PublishedMessage {
                channel: CHANNEL.to_string(),
                message: ChannelMessage::new("myEventName", "Some random stuff here."),
            }]
        );

        panel.component_will_unmount();
        stale(&ChannelMessage::new("myEventName", "c"));

        assert_eq!(panel.message_texts(), vec!["a", "b"]);
        assert_eq!(panel.state().get_untracked(), WidgetState::Unmounted);
    });
}

#[test]
fn test_many_messages_are_neither_lost_nor_duplicated() {
    let owner = Owner::new();
    owner.with(|| {
        let client = MemoryClient::new();
        let panel = MessagingPanel::new(Arc::new(client.clone()), RealtimeConfig::default());
        panel.component_did_mount().unwrap();

        let texts = (0..200).map(|i| format!("t{i}")).collect::<Vec<_>>();
        for text in &texts {
            client.deliver(CHANNEL, ChannelMessage::new("myEventName", text.as_str()));
        }

        let log = panel.messages().get_untracked();
        assert_eq!(log.texts(), texts);
        assert_eq!(log.received(), 200);
    });
}

#[test]
fn test_two_widgets_on_one_client_see_each_other() {
    let owner = Owner::new();
    owner.with(|| {
        let client = MemoryClient::new();
        let panel = MessagingPanel::new(Arc::new(client.clone()), RealtimeConfig::default());
        panel.component_did_mount().unwrap();
        let hook = use_channel_messages(Arc::new(client.clone()), RealtimeConfig::default())
            .unwrap();

        panel.send_message().unwrap();
        (hook.send_message)();

        let expected = vec!["Some random stuff here.", "Some random stuff here."];
        assert_eq!(panel.message_texts(), expected);
        assert_eq!(hook.messages.get_untracked().texts(), expected);

        panel.component_will_unmount();
        assert_eq!(client.subscriber_count(CHANNEL), 1);
    });
}
