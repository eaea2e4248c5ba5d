//! Typed Field Values
//!
//! Every type-specific node field carries a [`FieldValue`], the closed value
//! model that replaces open reflection: the set of representable values is
//! exactly the set the wire encoder knows how to render. Each node type
//! declares its fields as [`FieldKind`]s in the registry, and inbound payload
//! values are coerced to the declared kind before they reach a node.
//!
//! Coercion is deliberately lenient: a payload value that cannot be coerced
//! to the declared kind is skipped, never an error. Partial or garbage
//! payloads degrade to partial updates.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::node::Node;

/// Number of 100ns ticks between 0001-01-01 and the Unix epoch.
///
/// Timestamps travel on the wire as .NET-style tick counts. Protocol
/// compatibility, not a convenience.
pub const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;

/// Declared kind of a node field.
///
/// Mirrors [`FieldValue`] variant for variant. `Choice` carries the allowed
/// member names, checked during coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Str,
    Bool,
    Int,
    Float,
    Timestamp,
    Choice(&'static [&'static str]),
    Map,
    List,
    Nodes,
}

/// A typed field value attached to a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Str(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    Timestamp(DateTime<Utc>),
    /// An enum member, encoded by name.
    Choice(String),
    /// A nested string-keyed object.
    Map(BTreeMap<String, FieldValue>),
    /// A heterogeneous sequence of values.
    List(Vec<FieldValue>),
    /// An embedded node sequence, encoded as already-deep (no relation
    /// expansion below it).
    Nodes(Vec<Node>),
}

impl FieldValue {
    /// Coerce a JSON payload value to the declared kind.
    ///
    /// Returns `None` when the value cannot represent the kind; the caller
    /// skips the field and applies the rest of the payload.
    pub fn coerce(kind: FieldKind, value: &Value) -> Option<FieldValue> {
        match kind {
            FieldKind::Str => match value {
                Value::String(s) => Some(FieldValue::Str(s.clone())),
                Value::Number(n) => Some(FieldValue::Str(n.to_string())),
                Value::Bool(b) => Some(FieldValue::Str(b.to_string())),
                _ => None,
            },
            FieldKind::Bool => match value {
                Value::Bool(b) => Some(FieldValue::Bool(*b)),
                Value::Number(n) => match n.as_i64() {
                    Some(0) => Some(FieldValue::Bool(false)),
                    Some(1) => Some(FieldValue::Bool(true)),
                    _ => None,
                },
                Value::String(s) => match s.to_ascii_lowercase().as_str() {
                    "true" | "1" => Some(FieldValue::Bool(true)),
                    "false" | "0" => Some(FieldValue::Bool(false)),
                    _ => None,
                },
                _ => None,
            },
            FieldKind::Int => match value {
                Value::Number(n) => n.as_i64().map(FieldValue::Int),
                Value::String(s) => s.parse().ok().map(FieldValue::Int),
                _ => None,
            },
            FieldKind::Float => match value {
                Value::Number(n) => n.as_f64().map(FieldValue::Float),
                Value::String(s) => s.parse().ok().map(FieldValue::Float),
                _ => None,
            },
            FieldKind::Timestamp => match value {
                Value::String(s) => DateTime::parse_from_rfc3339(s)
                    .ok()
                    .map(|dt| FieldValue::Timestamp(dt.with_timezone(&Utc))),
                // Integers are tick counts, matching the wire encoding.
                Value::Number(n) => n.as_i64().and_then(timestamp_from_ticks),
                _ => None,
            },
            FieldKind::Choice(allowed) => match value {
                Value::String(s) if allowed.contains(&s.as_str()) => {
                    Some(FieldValue::Choice(s.clone()))
                }
                _ => None,
            },
            FieldKind::Map => match value {
                Value::Object(map) => Some(FieldValue::Map(
                    map.iter()
                        .filter_map(|(k, v)| Self::infer(v).map(|fv| (k.clone(), fv)))
                        .collect(),
                )),
                _ => None,
            },
            FieldKind::List => match value {
                Value::Array(items) => Some(FieldValue::List(
                    items.iter().filter_map(Self::infer).collect(),
                )),
                _ => None,
            },
            // Node sequences are built programmatically, never from payloads.
            FieldKind::Nodes => None,
        }
    }

    /// Infer a value for an undeclared position (map entries, list items).
    fn infer(value: &Value) -> Option<FieldValue> {
        match value {
            Value::String(s) => Some(FieldValue::Str(s.clone())),
            Value::Bool(b) => Some(FieldValue::Bool(*b)),
            Value::Number(n) => n
                .as_i64()
                .map(FieldValue::Int)
                .or_else(|| n.as_f64().map(FieldValue::Float)),
            Value::Object(_) => Self::coerce(FieldKind::Map, value),
            Value::Array(_) => Self::coerce(FieldKind::List, value),
            Value::Null => None,
        }
    }

    /// Read this value back as a string, when it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) | FieldValue::Choice(s) => Some(s),
            _ => None,
        }
    }
}

/// Wire tick count for a timestamp.
pub fn ticks(dt: &DateTime<Utc>) -> i64 {
    UNIX_EPOCH_TICKS + dt.timestamp() * 10_000_000 + i64::from(dt.timestamp_subsec_nanos()) / 100
}

fn timestamp_from_ticks(ticks: i64) -> Option<FieldValue> {
    let unix_ticks = ticks.checked_sub(UNIX_EPOCH_TICKS)?;
    let secs = unix_ticks.div_euclid(10_000_000);
    let nanos = (unix_ticks.rem_euclid(10_000_000) * 100) as u32;
    Utc.timestamp_opt(secs, nanos)
        .single()
        .map(FieldValue::Timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coerces_strings_from_strings_and_numbers() {
        assert_eq!(
            FieldValue::coerce(FieldKind::Str, &json!("About")),
            Some(FieldValue::Str("About".into()))
        );
        assert_eq!(
            FieldValue::coerce(FieldKind::Str, &json!(42)),
            Some(FieldValue::Str("42".into()))
        );
    }

    #[test]
    fn coerces_booleans_leniently() {
        assert_eq!(
            FieldValue::coerce(FieldKind::Bool, &json!(true)),
            Some(FieldValue::Bool(true))
        );
        assert_eq!(
            FieldValue::coerce(FieldKind::Bool, &json!("0")),
            Some(FieldValue::Bool(false))
        );
        assert_eq!(
            FieldValue::coerce(FieldKind::Bool, &json!(1)),
            Some(FieldValue::Bool(true))
        );
    }

    #[test]
    fn rejects_unrepresentable_values() {
        assert_eq!(FieldValue::coerce(FieldKind::Int, &json!("not a number")), None);
        assert_eq!(FieldValue::coerce(FieldKind::Bool, &json!("neigh")), None);
        assert_eq!(
            FieldValue::coerce(FieldKind::Choice(&["pending", "shipped"]), &json!("lost")),
            None
        );
    }

    #[test]
    fn choice_accepts_declared_members_only() {
        let allowed: &[&str] = &["pending", "shipped"];
        assert_eq!(
            FieldValue::coerce(FieldKind::Choice(allowed), &json!("shipped")),
            Some(FieldValue::Choice("shipped".into()))
        );
    }

    #[test]
    fn coerces_nested_maps_and_lists() {
        let value = json!({"depth": 2, "labels": ["a", "b"]});
        let coerced = FieldValue::coerce(FieldKind::Map, &value).unwrap();
        match coerced {
            FieldValue::Map(map) => {
                assert_eq!(map.get("depth"), Some(&FieldValue::Int(2)));
                assert_eq!(
                    map.get("labels"),
                    Some(&FieldValue::List(vec![
                        FieldValue::Str("a".into()),
                        FieldValue::Str("b".into())
                    ]))
                );
            }
            other => panic!("expected map, got {other:?}"),
        }
    }

    #[test]
    fn timestamps_round_trip_through_ticks() {
        let dt = Utc.with_ymd_and_hms(2024, 5, 17, 12, 30, 0).unwrap();
        let t = ticks(&dt);
        assert_eq!(
            FieldValue::coerce(FieldKind::Timestamp, &json!(t)),
            Some(FieldValue::Timestamp(dt))
        );
    }

    #[test]
    fn epoch_tick_count_matches_dotnet() {
        let epoch = Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(ticks(&epoch), UNIX_EPOCH_TICKS);
    }
}
