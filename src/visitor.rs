use std::{collections::BTreeMap, fmt};

use tracing_core::field::{Field, Visit};

/// Collects a `tracing` event's fields into a raw message plus key-value
/// data.
///
/// The `message` field becomes the event's raw message; every other field is
/// kept as data. [`JsonLayer`](crate::JsonLayer) turns events that carry
/// data fields into structured payloads and message-only events into text
/// payloads.
pub(crate) struct EventVisitor {
    message: Option<String>,
    fields: BTreeMap<&'static str, serde_json::Value>,
}

impl EventVisitor {
    pub(crate) fn new() -> Self {
        Self {
            message: None,
            fields: BTreeMap::new(),
        }
    }

    pub(crate) fn finish(self) -> (Option<String>, BTreeMap<&'static str, serde_json::Value>) {
        (self.message, self.fields)
    }

    fn record(&mut self, field: &Field, value: serde_json::Value) {
        match field.name() {
            "message" => {
                self.message = Some(match value {
                    serde_json::Value::String(text) => text,
                    other => other.to_string(),
                });
            },
            name if name.starts_with("r#") => {
                self.fields.insert(&name[2..], value);
            },
            name => {
                self.fields.insert(name, value);
            },
        }
    }
}

impl Visit for EventVisitor {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.record(field, serde_json::Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record(field, serde_json::Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record(field, serde_json::Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.record(field, serde_json::Value::from(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.record(field, serde_json::Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record(field, serde_json::Value::from(format!("{value:?}")));
    }
}
