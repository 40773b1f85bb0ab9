//! Scripted session with the demo form.
//!
//! Restores the form, applies a fixed sequence of edits with auto-save after
//! each change, and logs every lifecycle event through hooks. Running it
//! twice against the durable strategy shows the counter picking up where
//! the last run stopped.

use plugstate_store::StateStore;
use tracing::info;

use crate::form::{Effect, FormMessage, FormState};

fn script(reset: bool) -> Vec<FormMessage> {
    let mut messages = vec![
        FormMessage::Increment,
        FormMessage::Increment,
        FormMessage::SetText("hello from the demo".to_string()),
        FormMessage::Toggle,
        FormMessage::Select("option-2".to_string()),
        // Not an offered choice: ignored, nothing saved.
        FormMessage::Select("option-9".to_string()),
        FormMessage::Decrement,
    ];
    if reset {
        messages.push(FormMessage::Reset);
    }
    messages
}

pub async fn run(store: &StateStore, reset: bool) -> anyhow::Result<FormState> {
    let subscriptions = [
        store.on_save(|state| info!(%state, "state saved")),
        store.on_restore(|state| info!(%state, "state restored")),
        store.on_clear(|| info!("state cleared")),
    ];

    let mut form = FormState::from_snapshot(&store.get_state_or_defaults().await?);
    println!("{:<10} {form}", "start");

    for message in script(reset) {
        let label = format!("{message:?}");
        match form.update(message) {
            Effect::Save => {
                store.save_state(form.to_snapshot()).await?;
            }
            Effect::Clear => {
                store.clear_state().await?;
                form = FormState::from_snapshot(&store.defaults()?);
            }
            Effect::None => {}
        }
        println!("{:<10} {form}", truncate(&label, 10));
    }

    for subscription in &subscriptions {
        subscription.unsubscribe();
    }
    Ok(form)
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
