use std::sync::Arc;

use leptos::prelude::*;
use leptos_meta::{MetaTags, Title, provide_meta_context};
use leptos_realtime_widget::{
    MessagingWidget, RealtimeConfig, RealtimeToggle, SocketClient, provide_realtime_client,
    provide_realtime_config,
};
use leptos_router::{
    StaticSegment,
    components::{Route, Router, Routes},
};

const API_KEY: &str = "demo-api-key";
const CHANNEL: &str = "some-channel";

pub fn shell(options: LeptosOptions) -> impl IntoView {
    view! {
        <!DOCTYPE html>
        <html lang="en">
            <head>
                <meta charset="utf-8" />
                <meta name="viewport" content="width=device-width, initial-scale=1" />
                <AutoReload options=options.clone() />
                <HydrationScripts options />
                <MetaTags />
            </head>
            <body>
                <App />
            </body>
        </html>
    }
}

#[component]
pub fn App() -> impl IntoView {
    // Provides context that manages stylesheets, titles, meta tags, etc.
    provide_meta_context();

    let config = RealtimeConfig::default()
        .with_api_key(API_KEY)
        .with_channel(CHANNEL);
    provide_realtime_client(Arc::new(SocketClient::connect(&config.api_key)));
    provide_realtime_config(config);

    view! {
        <Title text="Realtime messaging with a function component" />

        <Router>
            <Routes fallback=|| "Page not found.".into_view()>
                <Route path=StaticSegment("") view=HomePage />
            </Routes>
        </Router>
    }
}

#[component]
fn HomePage() -> impl IntoView {
    view! {
        <div class="App">
            <header class="App-header">
                <h1>"I am a leptos app with a functional component"</h1>
            </header>
            // starts unchecked, the widget only subscribes once enabled
            <RealtimeToggle>
                <MessagingWidget />
            </RealtimeToggle>
        </div>
    }
}
