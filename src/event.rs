use std::{error::Error, fmt::Write as _, thread};

use chrono::{DateTime, Utc};
use tracing_core::Level;

/// The raw message carried by a [`LogEvent`].
#[derive(Debug, Clone)]
pub enum Payload {
    /// A message that has already been rendered to text.
    Text(String),
    /// A structured value, usually a mapping or a sequence. Whether it is
    /// embedded in the output verbatim or stringified is decided by the
    /// formatter's [`structured_messages`] option.
    ///
    /// [`structured_messages`]: crate::FormatterBuilder::structured_messages
    Structured(serde_json::Value),
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Self::Structured(value)
    }
}

/// Describes an error attached to a [`LogEvent`].
#[derive(Debug, Clone)]
pub struct ExceptionInfo {
    /// Short name of the error type.
    pub kind: String,
    /// The error's own message.
    pub message: String,
    /// Additional renderable context, one frame or cause per line.
    pub backtrace: Option<String>,
    /// Pre-rendered exception text. When present it is used as-is and
    /// [`render`](Self::render) is never called.
    pub rendered: Option<String>,
}

impl ExceptionInfo {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            backtrace: None,
            rendered: None,
        }
    }

    /// Builds a descriptor from an error value, recording its `source` chain
    /// as the backtrace.
    pub fn from_error<E>(error: &E) -> Self
    where
        E: Error,
    {
        let kind = std::any::type_name::<E>()
            .rsplit("::")
            .next()
            .unwrap_or("error");
        let mut info = Self::new(kind, error.to_string());

        let mut backtrace = String::new();
        let mut source = error.source();
        while let Some(cause) = source {
            let _ = writeln!(backtrace, "caused by: {cause}");
            source = cause.source();
        }
        if !backtrace.is_empty() {
            info.backtrace = Some(backtrace);
        }
        info
    }

    pub fn with_backtrace(mut self, backtrace: impl Into<String>) -> Self {
        self.backtrace = Some(backtrace.into());
        self
    }

    pub fn with_rendered(mut self, rendered: impl Into<String>) -> Self {
        self.rendered = Some(rendered.into());
        self
    }

    /// Renders the descriptor to text: one line for the error itself,
    /// followed by the backtrace lines if there are any.
    pub fn render(&self) -> String {
        let mut text = format!("{}: {}", self.kind, self.message);
        if let Some(backtrace) = &self.backtrace {
            text.push('\n');
            text.push_str(backtrace);
        }
        text
    }
}

/// A single structured log occurrence.
///
/// Instances are normally built by [`JsonLayer`](crate::JsonLayer) from
/// `tracing` events, but any dispatcher can construct them directly and hand
/// them to [`JsonFormatter::format`](crate::JsonFormatter::format). The
/// formatter only ever reads an event.
#[derive(Debug, Clone)]
pub struct LogEvent {
    /// Logger or target name.
    pub name: String,
    pub level: Level,
    /// Full path of the source file that emitted the event.
    pub file: Option<String>,
    pub module: Option<String>,
    pub line: Option<u32>,
    pub function: Option<String>,
    /// Creation timestamp.
    pub created: DateTime<Utc>,
    /// Milliseconds since the dispatching subsystem started.
    pub relative_created_ms: f64,
    pub thread_id: String,
    pub thread_name: Option<String>,
    pub process: u32,
    pub payload: Payload,
    pub exception: Option<ExceptionInfo>,
    /// Captured call-stack snapshot.
    pub stack: Option<String>,
}

impl LogEvent {
    /// Creates an event, capturing the creation time, thread, and process id
    /// from the current environment.
    pub fn new(name: impl Into<String>, level: Level, payload: impl Into<Payload>) -> Self {
        let current = thread::current();
        Self {
            name: name.into(),
            level,
            file: None,
            module: None,
            line: None,
            function: None,
            created: Utc::now(),
            relative_created_ms: 0.0,
            thread_id: format!("{:?}", current.id()),
            thread_name: current.name().map(str::to_owned),
            process: std::process::id(),
            payload: payload.into(),
            exception: None,
            stack: None,
        }
    }

    pub fn with_created(mut self, created: DateTime<Utc>) -> Self {
        self.created = created;
        self
    }

    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }

    pub fn with_exception(mut self, exception: ExceptionInfo) -> Self {
        self.exception = Some(exception);
        self
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use std::fmt;

    use super::*;

    #[test]
    fn render_includes_backtrace_lines() {
        let exception =
            ExceptionInfo::new("TypeError", "boom").with_backtrace("line one\nline two");
        assert_eq!(exception.render(), "TypeError: boom\nline one\nline two");
    }

    #[test]
    fn render_without_backtrace_is_one_line() {
        let exception = ExceptionInfo::new("TypeError", "boom");
        assert_eq!(exception.render(), "TypeError: boom");
    }

    #[test]
    fn from_error_walks_source_chain() {
        #[derive(Debug)]
        struct Outer(Inner);

        #[derive(Debug)]
        struct Inner;

        impl fmt::Display for Outer {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("outer failed")
            }
        }

        impl fmt::Display for Inner {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("inner failed")
            }
        }

        impl Error for Outer {
            fn source(&self) -> Option<&(dyn Error + 'static)> {
                Some(&self.0)
            }
        }

        impl Error for Inner {}

        let info = ExceptionInfo::from_error(&Outer(Inner));
        assert_eq!(info.kind, "Outer");
        assert_eq!(info.message, "outer failed");
        assert_eq!(info.backtrace.as_deref(), Some("caused by: inner failed\n"));
        assert_eq!(
            info.render(),
            "Outer: outer failed\ncaused by: inner failed\n"
        );
    }

    #[test]
    fn new_captures_the_environment() {
        let event = LogEvent::new("app", Level::INFO, "hello");
        assert_eq!(event.process, std::process::id());
        assert!(event.thread_id.starts_with("ThreadId"));
        assert!(matches!(&event.payload, Payload::Text(text) if text == "hello"));
    }
}
