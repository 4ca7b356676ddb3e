//! The in-flight representation of a single log call.

use std::fmt::{self, Write as _};

use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;

use crate::Level;

/// Ordered structured fields attached to a record.
pub type Fields = Vec<(String, Value)>;

/// A log record, built once per log call and shared by every destination.
#[derive(Debug, Clone)]
pub struct Record {
    /// Severity of the record.
    pub level: Level,

    /// Moment the record was created, in UTC.
    pub time: OffsetDateTime,

    /// The rendered primary message.
    pub message: String,

    /// Structured fields, bound fields first.
    pub fields: Fields,

    /// Stack trace captured at the log call, if any.
    pub stack: Option<String>,
}

impl Record {
    /// Creates a record stamped with the current time and no stack trace.
    pub fn new(level: Level, message: String, fields: Fields) -> Self {
        Self {
            level,
            time: OffsetDateTime::now_utc(),
            message,
            fields,
            stack: None,
        }
    }
}

/// Pairs an alternating key/value sequence into structured fields.
///
/// String keys are used as-is, any other key is used by its JSON text. A trailing value without
/// a partner is kept under the `ignored` key rather than dropped.
pub fn pair_fields(keys_and_values: &[Value]) -> Fields {
    let mut fields = Vec::with_capacity(keys_and_values.len().div_ceil(2));
    let mut iter = keys_and_values.iter();

    while let Some(key) = iter.next() {
        match iter.next() {
            Some(value) => {
                let key = match key {
                    Value::String(key) => key.clone(),
                    other => other.to_string(),
                };
                fields.push((key, value.clone()));
            }
            None => fields.push((crate::keys::IGNORED.to_string(), key.clone())),
        }
    }

    fields
}

/// Converts any serializable value into a field value.
///
/// Values that fail to serialize are replaced by a string describing the failure, so that logging
/// never fails because of a field.
pub fn field_value<T>(value: &T) -> Value
where
    T: Serialize + ?Sized,
{
    serde_json::to_value(value)
        .unwrap_or_else(|error| Value::String(format!("<unserializable: {error}>")))
}

/// Concatenates the textual representation of each value, without separators.
///
/// No space is inserted between adjacent values, even if neither is a string.
pub fn concat(values: &[&dyn fmt::Display]) -> String {
    let mut message = String::new();
    for value in values {
        // Writing into a `String` cannot fail
        let _ = write!(message, "{value}");
    }
    message
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use super::*;

    #[test]
    fn pairs_even_sequences_in_order() {
        let fields = pair_fields(&[json!("user"), json!("bob"), json!("attempt"), json!(3)]);
        assert_eq!(
            fields,
            vec![
                ("user".to_string(), json!("bob")),
                ("attempt".to_string(), json!(3)),
            ]
        );
    }

    #[test]
    fn keeps_trailing_value_under_ignored_key() {
        let fields = pair_fields(&[json!("user"), json!("bob"), json!("dangling")]);
        assert_eq!(
            fields,
            vec![
                ("user".to_string(), json!("bob")),
                ("ignored".to_string(), json!("dangling")),
            ]
        );
    }

    #[test]
    fn renders_non_string_keys_as_json() {
        let fields = pair_fields(&[json!(7), json!(true)]);
        assert_eq!(fields, vec![("7".to_string(), json!(true))]);
    }

    #[test]
    fn empty_sequence_has_no_fields() {
        assert!(pair_fields(&[]).is_empty());
    }

    #[test]
    fn unserializable_values_become_strings() {
        let mut map = BTreeMap::new();
        map.insert((1, 2), "tuple keys are not valid JSON object keys");

        let value = field_value(&map);
        assert!(matches!(value, Value::String(text) if text.starts_with("<unserializable")));
    }

    #[test]
    fn concatenates_without_separators() {
        assert_eq!(concat(&[&"a", &1, &2.5]), "a12.5");
        assert_eq!(concat(&[&1, &2]), "12");
        assert_eq!(concat(&[&1, &" ", &2]), "1 2");
        assert_eq!(concat(&[]), "");
    }
}
