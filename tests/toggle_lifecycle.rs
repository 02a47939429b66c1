//! Drives widget mounts the way `RealtimeToggle` does: every time the flag turns on a
//! fresh child owner is created and the widget mounted in it, and every time it turns
//! off that owner is cleaned up. Both the panel and the hook widget are exercised.

use std::sync::Arc;

use leptos::prelude::*;
use leptos_realtime_widget::{
    ChannelMessage, MemoryClient, MessagingPanel, MessagingToggle, RealtimeConfig,
    use_channel_messages,
};

const CHANNEL: &str = "some-channel";

fn config() -> RealtimeConfig {
    RealtimeConfig::default().with_channel(CHANNEL)
}

#[derive(Clone, Copy, Debug)]
enum Style {
    Panel,
    Hook,
}

struct Host {
    style: Style,
    toggle: MessagingToggle,
    client: MemoryClient,
    child: Option<Owner>,
}

impl Host {
    fn new(style: Style, initially_enabled: bool) -> Self {
        let mut host = Self {
            style,
            toggle: MessagingToggle::new(initially_enabled),
            client: MemoryClient::new(),
            child: None,
        };
        host.sync();
        host
    }

    fn click(&mut self) {
        self.toggle.toggle();
        self.sync();
    }

    fn sync(&mut self) {
        match (self.toggle.is_enabled(), self.child.take()) {
            (true, None) => {
                let child = Owner::new();
                let client = Arc::new(self.client.clone());
                let style = self.style;
                child.with(|| match style {
                    Style::Panel => {
                        MessagingPanel::attach(client, config()).unwrap();
                    }
                    Style::Hook => {
                        use_channel_messages(client, config()).unwrap();
                    }
                });
                self.child = Some(child);
            }
            (false, Some(child)) => child.cleanup(),
            (_, child) => self.child = child,
        }
    }

    fn is_mounted(&self) -> bool {
        self.client.subscriber_count(CHANNEL) == 1
    }
}

#[test]
fn test_widget_mounted_according_to_toggle_parity() {
    let root = Owner::new();
    root.with(|| {
        for (style, initially_enabled) in [
            (Style::Panel, true),
            (Style::Panel, false),
            (Style::Hook, true),
            (Style::Hook, false),
        ] {
            let mut host = Host::new(style, initially_enabled);

            for clicks in 0..7 {
                let expected = initially_enabled ^ (clicks % 2 == 1);
                assert_eq!(
                    host.is_mounted(),
                    expected,
                    "{style:?} after {clicks} clicks"
                );
                assert_eq!(host.toggle.is_enabled(), expected);
                host.click();
            }
        }
    });
}

#[test]
fn test_remount_resets_messages() {
    let root = Owner::new();
    root.with(|| {
        let client = MemoryClient::new();

        let first = MessagingPanel::new(Arc::new(client.clone()), config());
        first.component_did_mount().unwrap();
        client.deliver(CHANNEL, ChannelMessage::new("myEventName", "old"));
        assert_eq!(first.message_texts(), vec!["old"]);
        first.component_will_unmount();

        let second = MessagingPanel::new(Arc::new(client.clone()), config());
        second.component_did_mount().unwrap();

        assert!(second.message_texts().is_empty());
        client.deliver(CHANNEL, ChannelMessage::new("myEventName", "new"));
        assert_eq!(second.message_texts(), vec!["new"]);
        assert_eq!(first.message_texts(), vec!["old"]);
    });
}
