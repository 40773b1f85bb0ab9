//! plugstate.toml configuration parser and validation.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{ConfigError, ConfigResult};
use crate::schema::{FieldSchema, FieldType};
use crate::snapshot::Snapshot;

/// Lifetime of persisted state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum StateStrategy {
    /// Dropped when the hosting session ends.
    Session,
    /// Survives restarts.
    Durable,
}

impl StateStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateStrategy::Session => "session",
            StateStrategy::Durable => "durable",
        }
    }
}

impl fmt::Display for StateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StateStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "session" => Ok(StateStrategy::Session),
            "durable" => Ok(StateStrategy::Durable),
            other => Err(ConfigError::invalid(
                "state_strategy",
                format!("unknown strategy `{other}` (expected `session` or `durable`)"),
            )),
        }
    }
}

impl TryFrom<String> for StateStrategy {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// What a save does with a field whose value doesn't match its schema type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationPolicy {
    /// Fail the whole save.
    #[default]
    Reject,
    /// Replace the value with the field's default and keep going.
    SubstituteDefault,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    pub plugin_id: String,
    pub state_strategy: StateStrategy,
    /// Upper bound, in bytes, on the serialized snapshot.
    pub max_state_size: usize,
    #[serde(default)]
    pub validation: ValidationPolicy,
    /// Fields carried across save/restore. Must all appear in `state_schema`.
    #[serde(default)]
    pub preserve_keys: Vec<String>,
    #[serde(default)]
    pub state_schema: BTreeMap<String, FieldSchema>,
}

impl Configuration {
    /// An empty schema with a 1024-byte limit.
    pub fn new(plugin_id: impl Into<String>, state_strategy: StateStrategy) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            state_strategy,
            max_state_size: 1024,
            validation: ValidationPolicy::default(),
            preserve_keys: Vec::new(),
            state_schema: BTreeMap::new(),
        }
    }

    /// Declare a field and mark it preserved.
    pub fn preserve(mut self, name: impl Into<String>, field: FieldSchema) -> Self {
        let name = name.into();
        self.state_schema.insert(name.clone(), field);
        self.preserve_keys.push(name);
        self
    }

    /// Declare a field without preserving it.
    pub fn field(mut self, name: impl Into<String>, field: FieldSchema) -> Self {
        self.state_schema.insert(name.into(), field);
        self
    }

    pub fn max_state_size(mut self, bytes: usize) -> Self {
        self.max_state_size = bytes;
        self
    }

    pub fn validation(mut self, policy: ValidationPolicy) -> Self {
        self.validation = policy;
        self
    }

    /// Check every structural invariant. Strategy availability is the
    /// store's concern, since only it knows which media are installed.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.plugin_id.trim().is_empty() {
            return Err(ConfigError::invalid("plugin_id", "must not be empty"));
        }
        if self.max_state_size == 0 {
            return Err(ConfigError::invalid(
                "max_state_size",
                "must be a positive number of bytes",
            ));
        }

        let mut seen = HashSet::new();
        for key in &self.preserve_keys {
            if !seen.insert(key.as_str()) {
                return Err(ConfigError::invalid(
                    "preserve_keys",
                    format!("duplicate key `{key}`"),
                ));
            }
            if !self.state_schema.contains_key(key) {
                return Err(ConfigError::invalid(
                    "preserve_keys",
                    format!("`{key}` is not declared in state_schema"),
                ));
            }
        }

        for (name, field) in &self.state_schema {
            if let Some(default) = &field.default
                && !field.accepts(default)
            {
                return Err(ConfigError::invalid(
                    format!("state_schema.{name}.default"),
                    format!(
                        "expected {}, got {}",
                        field.field_type,
                        crate::schema::describe(default)
                    ),
                ));
            }
        }

        Ok(())
    }

    /// Default value of every preserved field.
    pub fn defaults(&self) -> Snapshot {
        self.preserve_keys
            .iter()
            .filter_map(|key| {
                self.state_schema
                    .get(key)
                    .map(|field| (key.clone(), field.default_value()))
            })
            .collect()
    }

    /// Load and validate a plugstate.toml file.
    ///
    /// An unknown `state_strategy` is reported as an invalid field rather
    /// than a TOML parse error.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let table: toml::Table = toml::from_str(&content)?;
        if let Some(strategy) = table.get("state_strategy").and_then(toml::Value::as_str) {
            strategy.parse::<StateStrategy>()?;
        }
        let config: Configuration = toml::Value::Table(table).try_into()?;
        config.validate()?;
        Ok(config)
    }

    /// Render as plugstate.toml.
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Configuration of the demo form: a counter, a text field, a checkbox,
    /// and a dropdown choice.
    pub fn scaffold(plugin_id: &str) -> Self {
        Configuration::new(plugin_id, StateStrategy::Durable)
            .preserve(
                "counter",
                FieldSchema::new(FieldType::Integer).required().with_default(0),
            )
            .preserve("text", FieldSchema::new(FieldType::String).with_default(""))
            .preserve(
                "checked",
                FieldSchema::new(FieldType::Boolean).with_default(false),
            )
            .preserve(
                "choice",
                FieldSchema::new(FieldType::String).with_default("option-1"),
            )
            .max_state_size(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn counter_config() -> Configuration {
        Configuration::new("counter-plugin", StateStrategy::Session).preserve(
            "counter",
            FieldSchema::new(FieldType::Number).with_default(0),
        )
    }

    #[test]
    fn test_scaffold() {
        let config = Configuration::scaffold("state-demo");
        config.validate().unwrap();
        let toml_str = config.to_toml_string().unwrap();
        assert!(toml_str.contains("state-demo"));
        assert!(toml_str.contains("durable"));

        let parsed: Configuration = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_parse_minimal() {
        let toml_str = r#"
plugin_id = "counter-plugin"
state_strategy = "session"
max_state_size = 512
preserve_keys = ["counter"]

[state_schema.counter]
type = "number"
default = 0
"#;
        let config: Configuration = toml::from_str(toml_str).unwrap();
        assert_eq!(config, counter_config().max_state_size(512));
        assert_eq!(config.validation, ValidationPolicy::Reject);
    }

    #[test]
    fn unknown_strategy_names_the_field() {
        let toml_str = r#"
plugin_id = "test"
state_strategy = "cloud"
max_state_size = 512
"#;
        let err = toml::from_str::<Configuration>(toml_str).unwrap_err();
        assert!(err.to_string().contains("unknown strategy `cloud`"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plugstate.toml");
        std::fs::write(&path, toml_str).unwrap();

        let err = Configuration::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        assert_eq!(err.field(), Some("state_strategy"));
        assert!(err.to_string().contains("cloud"));
    }

    #[test]
    fn from_file_loads_valid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plugstate.toml");
        let config = Configuration::scaffold("state-demo");
        std::fs::write(&path, config.to_toml_string().unwrap()).unwrap();

        assert_eq!(Configuration::from_file(&path).unwrap(), config);
    }

    #[test]
    fn empty_plugin_id_is_rejected() {
        let mut config = counter_config();
        config.plugin_id = "  ".to_string();
        assert_eq!(config.validate().unwrap_err().field(), Some("plugin_id"));
    }

    #[test]
    fn zero_size_limit_is_rejected() {
        let config = counter_config().max_state_size(0);
        assert_eq!(config.validate().unwrap_err().field(), Some("max_state_size"));
    }

    #[test]
    fn preserve_keys_must_be_declared() {
        let mut config = counter_config();
        config.preserve_keys.push("missing".to_string());
        let err = config.validate().unwrap_err();
        assert_eq!(err.field(), Some("preserve_keys"));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn duplicate_preserve_keys_are_rejected() {
        let mut config = counter_config();
        config.preserve_keys.push("counter".to_string());
        assert_eq!(config.validate().unwrap_err().field(), Some("preserve_keys"));
    }

    #[test]
    fn default_must_match_declared_type() {
        let config = counter_config().field(
            "theme",
            FieldSchema::new(FieldType::String).with_default(3),
        );
        assert_eq!(
            config.validate().unwrap_err().field(),
            Some("state_schema.theme.default")
        );
    }

    #[test]
    fn defaults_cover_preserved_fields_only() {
        let config = counter_config().field("scratch", FieldSchema::new(FieldType::String));
        let defaults = config.defaults();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults.get("counter"), Some(&json!(0)));
    }

    #[test]
    fn from_file_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plugstate.toml");
        std::fs::write(
            &path,
            r#"
plugin_id = "test"
state_strategy = "durable"
max_state_size = 64
preserve_keys = ["nope"]
"#,
        )
        .unwrap();

        let err = Configuration::from_file(&path).unwrap_err();
        assert_eq!(err.field(), Some("preserve_keys"));
    }
}
