use std::{ffi::OsStr, path::Path};

use serde_json::Value;
use tracing_core::Level;

use crate::{event::LogEvent, formatter::Derived};

/// The closed set of event attributes selectable by name in formatter
/// output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldKind {
    Name,
    Level,
    LevelName,
    Pathname,
    Filename,
    Module,
    Line,
    Function,
    Created,
    Timestamp,
    Msecs,
    RelativeCreated,
    ThreadId,
    ThreadName,
    Process,
    Message,
}

/// A configured field name bound to its accessor.
///
/// Names are resolved once when the formatter is built; `kind` stays `None`
/// for names outside the known set, and those fail the formatting call that
/// first uses them.
#[derive(Debug, Clone)]
pub(crate) struct Selector {
    pub(crate) name: String,
    pub(crate) kind: Option<FieldKind>,
}

impl Selector {
    pub(crate) fn resolve(name: String) -> Self {
        let kind = FieldKind::from_name(&name);
        Self { name, kind }
    }
}

impl FieldKind {
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "name" => Self::Name,
            "level" => Self::Level,
            "level_name" => Self::LevelName,
            "pathname" => Self::Pathname,
            "filename" => Self::Filename,
            "module" => Self::Module,
            "line" => Self::Line,
            "function" => Self::Function,
            "created" => Self::Created,
            "timestamp" => Self::Timestamp,
            "msecs" => Self::Msecs,
            "relative_created" => Self::RelativeCreated,
            "thread_id" => Self::ThreadId,
            "thread_name" => Self::ThreadName,
            "process" => Self::Process,
            "message" => Self::Message,
            _ => return None,
        })
    }

    /// Copies the attribute's value out of the event. Attributes the event
    /// does not carry serialize as `null`; only unknown *names* are errors,
    /// and those never reach this point.
    pub(crate) fn value(self, event: &LogEvent, derived: &Derived) -> Value {
        match self {
            Self::Name => Value::from(event.name.as_str()),
            Self::Level => Value::from(level_no(event.level)),
            Self::LevelName => Value::from(event.level.as_str()),
            Self::Pathname => opt_str(event.file.as_deref()),
            Self::Filename => opt_str(event.file.as_deref().map(basename)),
            Self::Module => opt_str(event.module.as_deref()),
            Self::Line => event.line.map_or(Value::Null, Value::from),
            Self::Function => opt_str(event.function.as_deref()),
            Self::Created => Value::from(event.created.timestamp_micros() as f64 / 1e6),
            Self::Timestamp => Value::from(derived.timestamp.as_str()),
            Self::Msecs => Value::from(event.created.timestamp_subsec_millis()),
            Self::RelativeCreated => Value::from(event.relative_created_ms),
            Self::ThreadId => Value::from(event.thread_id.as_str()),
            Self::ThreadName => opt_str(event.thread_name.as_deref()),
            Self::Process => Value::from(event.process),
            Self::Message => derived.message.clone(),
        }
    }
}

fn opt_str(value: Option<&str>) -> Value {
    value.map_or(Value::Null, Value::from)
}

fn basename(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(OsStr::to_str)
        .unwrap_or(path)
}

fn level_no(level: Level) -> u8 {
    match level {
        Level::TRACE => 10,
        Level::DEBUG => 20,
        Level::INFO => 30,
        Level::WARN => 40,
        Level::ERROR => 50,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_names_resolve() {
        let known = [
            "name",
            "level",
            "level_name",
            "pathname",
            "filename",
            "module",
            "line",
            "function",
            "created",
            "timestamp",
            "msecs",
            "relative_created",
            "thread_id",
            "thread_name",
            "process",
            "message",
        ];
        for name in known {
            assert!(FieldKind::from_name(name).is_some(), "{name} should resolve");
        }
    }

    #[test]
    fn unknown_names_do_not_resolve() {
        assert!(FieldKind::from_name("asctime").is_none());
        assert!(FieldKind::from_name("this is an invalid field").is_none());
        assert!(FieldKind::from_name("").is_none());
    }

    #[test]
    fn level_codes_grow_with_severity() {
        assert_eq!(level_no(Level::TRACE), 10);
        assert_eq!(level_no(Level::DEBUG), 20);
        assert_eq!(level_no(Level::INFO), 30);
        assert_eq!(level_no(Level::WARN), 40);
        assert_eq!(level_no(Level::ERROR), 50);
    }

    #[test]
    fn basename_strips_directories() {
        assert_eq!(basename("src/app/server.rs"), "server.rs");
        assert_eq!(basename("server.rs"), "server.rs");
    }
}
