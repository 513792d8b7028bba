//! Typed port values.
//!
//! Node inputs and outputs are not opaque JSON: every [`Port`] declares a
//! [`PortType`] and values crossing a port are tagged with the variant they
//! were produced as. This catches a node writing a string onto a port
//! declared `integer` before the value ever reaches a downstream node.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The declared type of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
    Any,
}

/// A tagged value flowing across a port.
///
/// Serializes as `{"type": "...", "value": ...}` so the wire format keeps
/// the producer's declared type alongside the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PortValue {
    String(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    Object(HashMap<String, PortValue>),
    Array(Vec<PortValue>),
}

impl PortValue {
    /// The [`PortType`] this value was tagged with.
    pub fn port_type(&self) -> PortType {
        match self {
            PortValue::String(_) => PortType::String,
            PortValue::Integer(_) => PortType::Integer,
            PortValue::Number(_) => PortType::Number,
            PortValue::Boolean(_) => PortType::Boolean,
            PortValue::Object(_) => PortType::Object,
            PortValue::Array(_) => PortType::Array,
        }
    }

    /// True if `self` may be accepted by a port declared as `declared`.
    ///
    /// `Any` accepts everything; every other pairing requires an exact
    /// tag match. Integers are not implicitly widened to numbers: a node
    /// that wants to accept either declares its port `any` and matches at
    /// runtime.
    pub fn is_compatible_with(&self, declared: PortType) -> bool {
        declared == PortType::Any || self.port_type() == declared
    }
}

/// A map of named port values, as passed into and out of node execution.
pub type PortValues = HashMap<String, PortValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_port_accepts_every_value() {
        assert!(PortValue::String("x".into()).is_compatible_with(PortType::Any));
        assert!(PortValue::Integer(1).is_compatible_with(PortType::Any));
    }

    #[test]
    fn typed_port_rejects_mismatched_tag() {
        let v = PortValue::String("x".into());
        assert!(v.is_compatible_with(PortType::String));
        assert!(!v.is_compatible_with(PortType::Integer));
        assert!(!v.is_compatible_with(PortType::Number));
    }

    #[test]
    fn integer_and_number_are_distinct() {
        assert!(!PortValue::Integer(1).is_compatible_with(PortType::Number));
        assert!(!PortValue::Number(1.0).is_compatible_with(PortType::Integer));
    }

    #[test]
    fn serde_round_trip_keeps_tag() {
        let v = PortValue::Object(HashMap::from([("a".to_string(), PortValue::Integer(3))]));
        let json = serde_json::to_string(&v).unwrap();
        let back: PortValue = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
    }
}
