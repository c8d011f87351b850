//! Frame domain model.
//!
//! A frame is the decoded form of one BOOTP/DHCPv4 packet: an ordered
//! mapping from option name to value, where the value shape is dictated by
//! the option registry. The same representation is the JSON contract with
//! the backend.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single option value.
///
/// The shape follows the option mode: textual modes are `Str`, INTEGER is
/// `Int`, BOOLEAN is `Bool`, and list options are `List` of the scalar
/// shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(values) => Some(values),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Value::List(values)
    }
}

/// An unordered option-name to value mapping for one packet.
///
/// Backed by a `BTreeMap` so option emission and JSON output are
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Frame(BTreeMap<String, Value>);

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// String value of an option, `None` when absent or not a string.
    pub fn str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// Integer value of an option, `None` when absent or not an integer.
    pub fn int(&self, name: &str) -> Option<i64> {
        self.0.get(name).and_then(Value::as_int)
    }

    /// Boolean value of an option, `false` when absent or not a boolean.
    pub fn boolean(&self, name: &str) -> bool {
        self.0
            .get(name)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `chaddr/xid` label used to tag log events for one transaction.
    pub fn txid(&self) -> String {
        format!(
            "{}/{}",
            self.str("client-hardware-address").unwrap_or_default(),
            self.str("bootp-transaction-id").unwrap_or_default()
        )
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Frame {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Frame(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_accessors() {
        let mut frame = Frame::new();
        frame.insert("hostname", "pxe-client");
        frame.insert("address-lease-time", 86400i64);
        frame.insert("bootp-broadcast", true);

        assert_eq!(frame.str("hostname"), Some("pxe-client"));
        assert_eq!(frame.int("address-lease-time"), Some(86400));
        assert!(frame.boolean("bootp-broadcast"));
        assert!(!frame.boolean("ip-forwarding"));
        assert_eq!(frame.str("address-lease-time"), None);
    }

    #[test]
    fn json_round_trip_preserves_shapes() {
        let mut frame = Frame::new();
        frame.insert("dhcp-message-type", "offer");
        frame.insert("address-lease-time", 3600i64);
        frame.insert("bootp-broadcast", false);
        frame.insert(
            "routers",
            vec![Value::from("192.0.2.1"), Value::from("192.0.2.2")],
        );

        let payload = serde_json::to_string(&frame).unwrap();
        let decoded: Frame = serde_json::from_str(&payload).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn json_scalars_deserialize_to_the_right_variant() {
        let frame: Frame =
            serde_json::from_str(r#"{"a": true, "b": 5, "c": "x", "d": ["y"]}"#).unwrap();
        assert_eq!(frame.get("a"), Some(&Value::Bool(true)));
        assert_eq!(frame.get("b"), Some(&Value::Int(5)));
        assert_eq!(frame.get("c"), Some(&Value::Str("x".into())));
        assert_eq!(
            frame.get("d"),
            Some(&Value::List(vec![Value::Str("y".into())]))
        );
    }

    #[test]
    fn txid_label() {
        let mut frame = Frame::new();
        frame.insert("client-hardware-address", "00:11:22:33:44:55");
        frame.insert("bootp-transaction-id", "deadbeef");
        assert_eq!(frame.txid(), "00:11:22:33:44:55/deadbeef");
    }
}
