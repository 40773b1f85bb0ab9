//! Headless model of the demo form: a counter, a text field, a checkbox,
//! and a dropdown.

use std::fmt;

use plugstate_core::Snapshot;
use serde_json::Value;

/// Options offered by the dropdown.
pub const CHOICES: [&str; 3] = ["option-1", "option-2", "option-3"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormState {
    pub counter: i64,
    pub text: String,
    pub checked: bool,
    pub choice: String,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            counter: 0,
            text: String::new(),
            checked: false,
            choice: CHOICES[0].to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormMessage {
    Increment,
    Decrement,
    SetText(String),
    Toggle,
    Select(String),
    Reset,
}

/// What the host should do after an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    Save,
    Clear,
}

impl FormState {
    /// Build the form from a snapshot. Fields that are missing or of the
    /// wrong type keep their `Default` value.
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let mut form = Self::default();
        if let Some(counter) = snapshot.get("counter").and_then(Value::as_i64) {
            form.counter = counter;
        }
        if let Some(text) = snapshot.get("text").and_then(Value::as_str) {
            form.text = text.to_string();
        }
        if let Some(checked) = snapshot.get("checked").and_then(Value::as_bool) {
            form.checked = checked;
        }
        if let Some(choice) = snapshot.get("choice").and_then(Value::as_str)
            && CHOICES.contains(&choice)
        {
            form.choice = choice.to_string();
        }
        form
    }

    pub fn to_snapshot(&self) -> Snapshot {
        let mut snapshot = Snapshot::new();
        snapshot.insert("counter", self.counter);
        snapshot.insert("text", self.text.clone());
        snapshot.insert("checked", self.checked);
        snapshot.insert("choice", self.choice.clone());
        snapshot
    }

    /// Apply `message`. Every change asks for a save; `Reset` asks for the
    /// persisted state to be cleared instead.
    pub fn update(&mut self, message: FormMessage) -> Effect {
        let before = self.clone();
        match message {
            FormMessage::Increment => self.counter = self.counter.saturating_add(1),
            FormMessage::Decrement => self.counter = self.counter.saturating_sub(1),
            FormMessage::SetText(text) => self.text = text,
            FormMessage::Toggle => self.checked = !self.checked,
            FormMessage::Select(choice) => {
                if CHOICES.contains(&choice.as_str()) {
                    self.choice = choice;
                }
            }
            FormMessage::Reset => return Effect::Clear,
        }

        if *self == before {
            Effect::None
        } else {
            Effect::Save
        }
    }
}

impl fmt::Display for FormState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "counter={} text={:?} checked={} choice={}",
            self.counter, self.text, self.checked, self.choice
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn changes_request_a_save() {
        let mut form = FormState::default();
        assert_eq!(form.update(FormMessage::Increment), Effect::Save);
        assert_eq!(form.update(FormMessage::Toggle), Effect::Save);
        assert_eq!(form.update(FormMessage::SetText("hi".into())), Effect::Save);
        assert_eq!(form.counter, 1);
        assert!(form.checked);
        assert_eq!(form.text, "hi");
    }

    #[test]
    fn unknown_choice_is_ignored() {
        let mut form = FormState::default();
        assert_eq!(form.update(FormMessage::Select("nope".into())), Effect::None);
        assert_eq!(form.choice, "option-1");
        assert_eq!(form.update(FormMessage::Select("option-3".into())), Effect::Save);
        assert_eq!(form.choice, "option-3");
    }

    #[test]
    fn unchanged_text_needs_no_save() {
        let mut form = FormState::default();
        assert_eq!(form.update(FormMessage::SetText(String::new())), Effect::None);
    }

    #[test]
    fn reset_requests_clear() {
        let mut form = FormState::default();
        form.update(FormMessage::Increment);
        assert_eq!(form.update(FormMessage::Reset), Effect::Clear);
    }

    #[test]
    fn snapshot_round_trip() {
        let form = FormState {
            counter: 4,
            text: "hello".to_string(),
            checked: true,
            choice: "option-2".to_string(),
        };
        assert_eq!(FormState::from_snapshot(&form.to_snapshot()), form);
    }

    #[test]
    fn bad_snapshot_fields_fall_back() {
        let snapshot: Snapshot = [
            ("counter", json!("seven")),
            ("choice", json!("option-9")),
            ("checked", json!(true)),
        ]
        .into_iter()
        .collect();
        let form = FormState::from_snapshot(&snapshot);
        assert_eq!(form.counter, 0);
        assert_eq!(form.choice, "option-1");
        assert!(form.checked);
    }
}
