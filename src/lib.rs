//! Toggleable realtime pub/sub message widgets for Leptos + Axum applications.
//!
//! A widget subscribes to one named channel while it is mounted, lists the text of
//! every message it receives and offers a button that publishes a demo message.
//! Two flavours are provided:
//!
//! - [`MessagingPanel`] / [`MessagingPanelView`]: a struct with explicit
//!   `component_did_mount` / `component_will_unmount` lifecycle methods.
//! - [`use_channel_messages`] / [`MessagingWidget`]: a hook used from a function component.
//!
//! [`RealtimeToggle`] mounts either of them behind a checkbox.
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use leptos::prelude::*;
//! use leptos_realtime_widget::{
//!     MessagingWidget, RealtimeConfig, RealtimeToggle, SocketClient, provide_realtime_client,
//!     provide_realtime_config,
//! };
//!
//! #[component]
//! pub fn App() -> impl IntoView {
//!     let config = RealtimeConfig::default().with_channel("some-channel");
//!
//!     // Connect once and hand the client to every widget below
//!     provide_realtime_client(Arc::new(SocketClient::connect(&config.api_key)));
//!     provide_realtime_config(config);
//!
//!     view! {
//!         <RealtimeToggle>
//!             <MessagingWidget />
//!         </RealtimeToggle>
//!     }
//! }
//! ```
//!
//! On the server, keep a [`ServerSocket`] in your app state and register the websocket route:
//!
//! ```ignore
//! let app = Router::new()
//!     .leptos_routes(&state, routes, { /* ... */ })
//!     .realtime_route(connect_to_websocket)
//!     .with_state(state);
//! ```
//!
//! Any other transport can be used by implementing [`RealtimeClient`] and
//! [`RealtimeChannel`]. [`MemoryClient`] is an in-process implementation that is
//! handy in tests:
//!
//! ```
//! # use std::sync::Arc;
//! # use leptos_realtime_widget::{ChannelMessage, MemoryClient, RealtimeClient};
//! let client = MemoryClient::new();
//! let channel = client.channel("my-cool-channel").unwrap();
//!
//! channel
//!     .subscribe(Arc::new(|msg: &ChannelMessage| println!("got {}", msg.text())))
//!     .unwrap();
//! client.deliver("my-cool-channel", ChannelMessage::new("myEventName", "hello"));
//! ```

pub mod channel;
mod config;
#[cfg(feature = "ssr")]
pub mod handlers;
mod root;
pub mod widget;

pub use crate::channel::*;
pub use crate::config::*;
pub use crate::root::*;
pub use crate::widget::*;

/// Trait to extend the Axum router
#[cfg(feature = "ssr")]
pub trait RealtimeRoute<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Add the realtime websocket route to the Axum router
    fn realtime_route<H, T>(self, handler: H) -> Self
    where
        H: axum::handler::Handler<T, S>,
        T: 'static;
}

#[cfg(feature = "ssr")]
impl<S> RealtimeRoute<S> for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
    ServerSocket: axum::extract::FromRef<S>,
{
    fn realtime_route<H, T>(self, handler: H) -> Self
    where
        H: axum::handler::Handler<T, S>,
        T: 'static,
    {
        use axum::routing::get;

        self.route(WEBSOCKET_CHANNEL_URL, get(handler))
    }
}
