//! Point-in-time state of a plugin, as a JSON object.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Field name → value mapping saved and restored by the state store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(Map<String, Value>);

impl Snapshot {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    pub fn contains_key(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Merge `other` into this snapshot, overwriting fields present in both.
    pub fn merge(&mut self, other: Snapshot) {
        self.0.extend(other.0);
    }

    /// Compact JSON encoding; its length is what state size limits measure.
    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&self.0)
    }

    /// Decode a snapshot; anything but a JSON object is an error.
    pub fn from_json_bytes(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

/// Compact JSON, as persisted.
impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(&self.0).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

impl From<Map<String, Value>> for Snapshot {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl IntoIterator for Snapshot {
    type Item = (String, Value);
    type IntoIter = serde_json::map::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn encoding_is_compact() {
        let snap: Snapshot = [("counter", json!(5))].into_iter().collect();
        assert_eq!(snap.to_json_bytes().unwrap(), br#"{"counter":5}"#);
        assert_eq!(snap.to_string(), r#"{"counter":5}"#);
    }

    #[test]
    fn decoding_rejects_non_objects() {
        assert!(Snapshot::from_json_bytes(b"[1,2,3]").is_err());
        assert!(Snapshot::from_json_bytes(b"not json").is_err());
        assert!(Snapshot::from_json_bytes(b"{}").unwrap().is_empty());
    }

    #[test]
    fn merge_overwrites_shared_fields() {
        let mut base: Snapshot = [("counter", json!(1)), ("text", json!("a"))]
            .into_iter()
            .collect();
        base.merge([("counter", json!(2))].into_iter().collect());
        assert_eq!(base.get("counter"), Some(&json!(2)));
        assert_eq!(base.get("text"), Some(&json!("a")));
    }
}
