use leptos::prelude::*;

/// The "enabled" flag of the root view.
#[derive(Copy, Clone)]
pub struct MessagingToggle {
    enabled: RwSignal<bool>,
}

impl MessagingToggle {
    pub fn new(initially_enabled: bool) -> Self {
        Self {
            enabled: RwSignal::new(initially_enabled),
        }
    }

    pub fn toggle(&self) {
        self.enabled.update(|enabled| *enabled = !*enabled);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get_untracked()
    }

    pub fn enabled(&self) -> Signal<bool> {
        self.enabled.into()
    }
}

/// A checkbox that mounts its children while checked.
///
/// ```ignore
/// view! {
///     <RealtimeToggle initially_enabled=true>
///         <MessagingPanelView />
///     </RealtimeToggle>
/// }
/// ```
#[component]
pub fn RealtimeToggle(
    #[prop(optional)] initially_enabled: bool,
    #[prop(into, default = "Use realtime messaging?".into())] label: String,
    children: ChildrenFn,
) -> impl IntoView {
    let toggle = MessagingToggle::new(initially_enabled);
    let enabled = toggle.enabled();

    view! {
        <label for="userealtime">{label}</label>
        <input
            id="userealtime"
            name="userealtime"
            type="checkbox"
            prop:checked=move || enabled.get()
            on:change=move |_| toggle.toggle()
        />
        <Show when=move || enabled.get() fallback=|| view! { <div></div> }>
            {children()}
        </Show>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enabled_follows_toggle_parity() {
        let owner = Owner::new();
        owner.with(|| {
            for initially_enabled in [true, false] {
                let toggle = MessagingToggle::new(initially_enabled);

                for toggles in 0..6 {
                    assert_eq!(toggle.is_enabled(), initially_enabled ^ (toggles % 2 == 1));
                    toggle.toggle();
                }
            }
        });
    }
}
