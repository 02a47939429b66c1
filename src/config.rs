use leptos::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ChannelMessage;

pub const DEFAULT_CHANNEL: &str = "my-cool-channel";
pub const DEFAULT_EVENT_NAME: &str = "myEventName";
pub const DEFAULT_DEMO_TEXT: &str = "Some random stuff here.";

/// Settings shared by the messaging widgets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    /// Credential handed to the realtime service when connecting.
    pub api_key: String,
    /// Name of the channel the widgets subscribe and publish to.
    pub channel: String,
    /// Event name of the message sent by the publish button.
    pub event_name: String,
    /// Text of the message sent by the publish button.
    pub demo_text: String,
    /// Keep at most this many received messages, dropping the oldest. `None` keeps everything.
    pub max_messages: Option<usize>,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            channel: DEFAULT_CHANNEL.to_string(),
            event_name: DEFAULT_EVENT_NAME.to_string(),
            demo_text: DEFAULT_DEMO_TEXT.to_string(),
            max_messages: None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

impl RealtimeConfig {
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    pub fn with_max_messages(mut self, max_messages: Option<usize>) -> Self {
        self.max_messages = max_messages;
        self
    }

    /// The message sent when the user presses the publish button.
    pub fn demo_message(&self) -> ChannelMessage {
        ChannelMessage::new(self.event_name.clone(), self.demo_text.clone())
    }

    /// Read overrides from `REALTIME_API_KEY`, `REALTIME_CHANNEL`, `REALTIME_EVENT_NAME`
    /// and `REALTIME_MAX_MESSAGES`. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`RealtimeConfig::from_env`] but with a custom variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(api_key) = lookup("REALTIME_API_KEY") {
            config.api_key = api_key;
        }
        if let Some(channel) = lookup("REALTIME_CHANNEL").filter(|c| !c.trim().is_empty()) {
            config.channel = channel;
        }
        if let Some(event_name) = lookup("REALTIME_EVENT_NAME") {
            config.event_name = event_name;
        }
        if let Some(value) = lookup("REALTIME_MAX_MESSAGES") {
            let max = value
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|max| *max > 0)
                .ok_or(ConfigError::InvalidValue {
                    key: "REALTIME_MAX_MESSAGES",
                    value,
                })?;
            config.max_messages = Some(max);
        }

        Ok(config)
    }
}

/// Make the config available to the widgets below the current component.
#[inline(always)]
pub fn provide_realtime_config(config: RealtimeConfig) {
    provide_context(config);
}

/// The provided config, or the default one if none was provided.
pub fn use_realtime_config() -> RealtimeConfig {
    use_context().unwrap_or_default()
}
