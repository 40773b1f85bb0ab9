//! Schema checks applied on the way into and out of storage.

use plugstate_core::schema::describe;
use plugstate_core::{Configuration, Snapshot, ValidationPolicy};
use tracing::{debug, warn};

use crate::error::{StateError, StateResult};

/// Reduce `state` to the preserved fields and check each against the schema.
///
/// Fields outside `preserve_keys` are dropped with a single warning. Under
/// [`ValidationPolicy::Reject`] a wrongly-typed or missing required field
/// fails the save; under [`ValidationPolicy::SubstituteDefault`] it is
/// replaced by its default. Missing optional fields are left out.
pub(crate) fn prepare_for_save(config: &Configuration, state: Snapshot) -> StateResult<Snapshot> {
    let mut incoming = state.into_inner();
    let mut prepared = Snapshot::new();

    for key in &config.preserve_keys {
        let Some(field) = config.state_schema.get(key) else {
            continue;
        };

        match incoming.remove(key) {
            Some(value) if field.accepts(&value) => {
                prepared.insert(key.clone(), value);
            }
            Some(value) => {
                let reason = format!("expected {}, got {}", field.field_type, describe(&value));
                match config.validation {
                    ValidationPolicy::Reject => {
                        return Err(StateError::Validation {
                            field: key.clone(),
                            reason,
                        });
                    }
                    ValidationPolicy::SubstituteDefault => {
                        warn!(plugin_id = %config.plugin_id, field = %key, %reason, "substituting default for invalid value");
                        prepared.insert(key.clone(), field.default_value());
                    }
                }
            }
            None if field.required => match config.validation {
                ValidationPolicy::Reject => {
                    return Err(StateError::Validation {
                        field: key.clone(),
                        reason: "required field is missing".to_string(),
                    });
                }
                ValidationPolicy::SubstituteDefault => {
                    debug!(plugin_id = %config.plugin_id, field = %key, "filling missing required field with default");
                    prepared.insert(key.clone(), field.default_value());
                }
            },
            None => {}
        }
    }

    if !incoming.is_empty() {
        let dropped: Vec<&str> = incoming.keys().map(String::as_str).collect();
        warn!(plugin_id = %config.plugin_id, ?dropped, "dropping fields not listed in preserve_keys");
    }

    Ok(prepared)
}

/// Rebuild a persisted snapshot against the current schema.
///
/// Every preserved field ends up present: missing ones get their default,
/// and ones whose type drifted since the save fall back to the default too.
/// Persisted fields that are no longer preserved are discarded.
pub(crate) fn reconcile_restored(config: &Configuration, persisted: &Snapshot) -> Snapshot {
    let mut restored = Snapshot::new();

    for key in &config.preserve_keys {
        let Some(field) = config.state_schema.get(key) else {
            continue;
        };

        match persisted.get(key) {
            Some(value) if field.accepts(value) => {
                restored.insert(key.clone(), value.clone());
            }
            Some(value) => {
                warn!(
                    plugin_id = %config.plugin_id,
                    field = %key,
                    expected = %field.field_type,
                    found = describe(value),
                    "persisted value no longer matches schema, using default"
                );
                restored.insert(key.clone(), field.default_value());
            }
            None => {
                restored.insert(key.clone(), field.default_value());
            }
        }
    }

    restored
}

#[cfg(test)]
mod tests {
    use super::*;
    use plugstate_core::{FieldSchema, FieldType, StateStrategy};
    use serde_json::json;

    fn form_config(policy: ValidationPolicy) -> Configuration {
        Configuration::new("form", StateStrategy::Session)
            .preserve(
                "counter",
                FieldSchema::new(FieldType::Integer).required().with_default(0),
            )
            .preserve("text", FieldSchema::new(FieldType::String).with_default("hi"))
            .field("scratch", FieldSchema::new(FieldType::String))
            .validation(policy)
    }

    fn snap(pairs: &[(&str, serde_json::Value)]) -> Snapshot {
        pairs.iter().map(|(k, v)| (*k, v.clone())).collect()
    }

    #[test]
    fn extras_and_unpreserved_fields_are_dropped() {
        let config = form_config(ValidationPolicy::Reject);
        let prepared = prepare_for_save(
            &config,
            snap(&[
                ("counter", json!(5)),
                ("scratch", json!("x")),
                ("extraneous", json!(true)),
            ]),
        )
        .unwrap();
        assert_eq!(prepared, snap(&[("counter", json!(5))]));
    }

    #[test]
    fn reject_policy_fails_on_wrong_type() {
        let config = form_config(ValidationPolicy::Reject);
        let err = prepare_for_save(&config, snap(&[("counter", json!("five"))])).unwrap_err();
        match err {
            StateError::Validation { field, reason } => {
                assert_eq!(field, "counter");
                assert_eq!(reason, "expected integer, got string");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn reject_policy_fails_on_missing_required_field() {
        let config = form_config(ValidationPolicy::Reject);
        let err = prepare_for_save(&config, snap(&[("text", json!("a"))])).unwrap_err();
        assert!(matches!(err, StateError::Validation { ref field, .. } if field == "counter"));
    }

    #[test]
    fn substitute_policy_uses_defaults() {
        let config = form_config(ValidationPolicy::SubstituteDefault);
        let prepared = prepare_for_save(&config, snap(&[("text", json!(42))])).unwrap();
        assert_eq!(
            prepared,
            snap(&[("counter", json!(0)), ("text", json!("hi"))])
        );
    }

    #[test]
    fn missing_optional_field_is_omitted() {
        let config = form_config(ValidationPolicy::Reject);
        let prepared = prepare_for_save(&config, snap(&[("counter", json!(1))])).unwrap();
        assert!(!prepared.contains_key("text"));
    }

    #[test]
    fn restore_fills_missing_and_drifted_fields() {
        let config = form_config(ValidationPolicy::Reject);
        let persisted = snap(&[
            ("counter", json!("stale string")),
            ("legacy", json!(1)),
        ]);
        let restored = reconcile_restored(&config, &persisted);
        assert_eq!(
            restored,
            snap(&[("counter", json!(0)), ("text", json!("hi"))])
        );
    }
}
