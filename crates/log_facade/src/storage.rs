//! Captures the fields of `tracing` spans and events as structured log fields.

use std::fmt;

use serde_json::Value;
use tracing::field::{Field, Visit};

/// Key-value data recorded for a span or an event.
///
/// Stored in span extensions by [`FacadeLayer`][crate::FacadeLayer]; child spans start from a copy
/// of their parent's storage.
#[derive(Clone, Debug, Default)]
pub(crate) struct Storage {
    /// Recorded fields, in recording order. Recording a key again replaces its value in place.
    values: Vec<(&'static str, Value)>,

    /// The primary message of an event, if captured.
    message: Option<String>,
}

impl Storage {
    pub(crate) fn record_value(&mut self, key: &'static str, value: Value) {
        match self.values.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = value,
            None => self.values.push((key, value)),
        }
    }

    pub(crate) fn values(&self) -> &[(&'static str, Value)] {
        &self.values
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.values.iter().any(|(existing, _)| *existing == key)
    }

    pub(crate) fn take_message(&mut self) -> Option<String> {
        self.message.take()
    }

    fn record_message(&mut self, field: &Field, value: impl FnOnce() -> String) -> bool {
        if field.name() != crate::keys::MESSAGE {
            return false;
        }
        if self.message.is_none() {
            self.message = Some(value());
        }
        true
    }
}

impl Visit for Storage {
    fn record_f64(&mut self, field: &Field, value: f64) {
        if !self.record_message(field, || value.to_string()) {
            self.record_value(field.name(), Value::from(value));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        if !self.record_message(field, || value.to_string()) {
            self.record_value(field.name(), Value::from(value));
        }
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        if !self.record_message(field, || value.to_string()) {
            self.record_value(field.name(), Value::from(value));
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        if !self.record_message(field, || value.to_string()) {
            self.record_value(field.name(), Value::from(value));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == crate::keys::MESSAGE {
            self.message = Some(value.to_string()); // `record_str()` is preferred for `message`
        } else {
            self.record_value(field.name(), Value::from(value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if self.record_message(field, || format!("{value:?}")) {
            return;
        }

        match field.name() {
            // Metadata of events forwarded from the `log` crate
            name if name.starts_with("log.") => (),
            name if name.starts_with("r#") => {
                self.record_value(
                    name.get(2..).unwrap_or(name),
                    Value::from(format!("{value:?}")),
                );
            }
            name => self.record_value(name, Value::from(format!("{value:?}"))),
        }
    }
}
