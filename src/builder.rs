use std::io;

use tracing_core::Subscriber;
use tracing_subscriber::{
    fmt::{MakeWriter, TestWriter},
    layer::SubscriberExt,
    registry::LookupSpan,
};

use crate::{
    formatter::{FormatterBuilder, Indent},
    layer::JsonLayer,
};

/// Builds a complete subscriber around a [`JsonLayer`].
///
/// Formatter options are forwarded to [`FormatterBuilder`] and share its
/// defaulting rules.
pub struct SubscriberBuilder<W = fn() -> io::Stdout> {
    formatter: FormatterBuilder,
    make_writer: W,
    log_internal_errors: bool,
}

impl Default for SubscriberBuilder {
    fn default() -> Self {
        Self {
            formatter: FormatterBuilder::default(),
            make_writer: io::stdout,
            log_internal_errors: true,
        }
    }
}

impl<W> SubscriberBuilder<W>
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    pub fn finish(self) -> impl Subscriber + for<'lookup> LookupSpan<'lookup> {
        let layer = JsonLayer::new(self.formatter.build(), self.make_writer)
            .log_internal_errors(self.log_internal_errors);
        tracing_subscriber::registry().with(layer)
    }

    /// Installs the configured subscriber globally.
    ///
    /// # Errors
    ///
    /// Returns an error if a global subscriber was already installed.
    pub fn try_init(self) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
        use tracing_subscriber::util::SubscriberInitExt;

        self.finish().try_init().map_err(Into::into)
    }

    /// Installs the configured subscriber globally.
    ///
    /// # Panics
    ///
    /// Panics if a global subscriber was already installed.
    pub fn init(self) {
        self.try_init().expect("unable to install global subscriber");
    }
}

impl<W> SubscriberBuilder<W> {
    /// Sets the ordered list of fields to emit for each event.
    pub fn with_fields<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.formatter = self.formatter.with_fields(fields);
        self
    }

    /// Sets the strftime pattern used to render the `timestamp` field.
    pub fn with_time_format(mut self, time_format: impl Into<String>) -> Self {
        self.formatter = self.formatter.with_time_format(time_format);
        self
    }

    /// Pretty-prints each record with the given indentation.
    pub fn with_indent(mut self, indent: impl Into<Indent>) -> Self {
        self.formatter = self.formatter.with_indent(indent);
        self
    }

    /// Embeds structured message payloads as native JSON values instead of
    /// stringifying them.
    pub fn structured_messages(mut self, structured_messages: bool) -> Self {
        self.formatter = self.formatter.structured_messages(structured_messages);
        self
    }

    /// Sets whether formatting and write failures are reported on stderr.
    pub fn log_internal_errors(mut self, log_internal_errors: bool) -> Self {
        self.log_internal_errors = log_internal_errors;
        self
    }

    /// Sets the [`MakeWriter`] that the subscriber being built will use to
    /// write events.
    ///
    /// ```rust
    /// let subscriber = json_formatter::fmt()
    ///     .with_writer(std::io::stderr)
    ///     .finish();
    /// # let _ = subscriber;
    /// ```
    pub fn with_writer<W2>(self, make_writer: W2) -> SubscriberBuilder<W2>
    where
        W2: for<'writer> MakeWriter<'writer> + 'static,
    {
        SubscriberBuilder {
            formatter: self.formatter,
            make_writer,
            log_internal_errors: self.log_internal_errors,
        }
    }

    /// Configures the subscriber to support `libtest`'s output capturing
    /// when used in unit tests.
    pub fn with_test_writer(self) -> SubscriberBuilder<TestWriter> {
        SubscriberBuilder {
            formatter: self.formatter,
            make_writer: TestWriter::default(),
            log_internal_errors: self.log_internal_errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};
    use tracing::subscriber::with_default;

    use super::SubscriberBuilder;
    use crate::{formatter::Indent, tests::MockMakeWriter};

    fn last_line_as_json(make_writer: &MockMakeWriter) -> Value {
        let contents = make_writer.contents();
        let line = contents.lines().last().expect("expected at least one line");
        serde_json::from_str(line).expect("line should be valid JSON")
    }

    #[test]
    fn default_fields_roundtrip() {
        let make_writer = MockMakeWriter::default();
        let subscriber = SubscriberBuilder::default()
            .with_writer(make_writer.clone())
            .finish();

        with_default(subscriber, || {
            tracing::info!("hello");
        });

        let value = last_line_as_json(&make_writer);
        assert_eq!(value["message"], "hello");
        assert_eq!(value["level_name"], "INFO");
        assert_eq!(value.as_object().unwrap().len(), 3);

        let raw = make_writer.contents();
        let timestamp = raw.find(r#""timestamp""#).unwrap();
        let level_name = raw.find(r#""level_name""#).unwrap();
        let message = raw.find(r#""message""#).unwrap();
        assert!(timestamp < level_name && level_name < message);
    }

    #[test]
    fn source_fields_come_from_metadata() {
        let make_writer = MockMakeWriter::default();
        let subscriber = SubscriberBuilder::default()
            .with_fields(["level_name", "name", "module", "filename", "line", "message"])
            .with_writer(make_writer.clone())
            .finish();

        with_default(subscriber, || {
            tracing::warn!("careful");
        });

        let value = last_line_as_json(&make_writer);
        assert_eq!(value["level_name"], "WARN");
        assert_eq!(value["name"], "json_formatter::builder::tests");
        assert_eq!(value["module"], "json_formatter::builder::tests");
        assert_eq!(value["filename"], "builder.rs");
        assert!(value["line"].is_number());
        assert_eq!(value["message"], "careful");
    }

    #[test]
    fn unknown_field_drops_the_event() {
        let make_writer = MockMakeWriter::default();
        let subscriber = SubscriberBuilder::default()
            .with_fields(["no such field", "message"])
            .log_internal_errors(false)
            .with_writer(make_writer.clone())
            .finish();

        with_default(subscriber, || {
            tracing::info!("this event cannot be formatted");
        });

        assert!(make_writer.contents().is_empty());
    }

    #[test]
    fn structured_event_preserves_fields() {
        let make_writer = MockMakeWriter::default();
        let subscriber = SubscriberBuilder::default()
            .structured_messages(true)
            .with_writer(make_writer.clone())
            .finish();

        with_default(subscriber, || {
            tracing::info!(id = "001", name = "test", msg = "This is test.");
        });

        let value = last_line_as_json(&make_writer);
        assert_eq!(
            value["message"],
            json!({"id": "001", "name": "test", "msg": "This is test."}),
        );
    }

    #[test]
    fn structured_event_keeps_message_text() {
        let make_writer = MockMakeWriter::default();
        let subscriber = SubscriberBuilder::default()
            .structured_messages(true)
            .with_writer(make_writer.clone())
            .finish();

        with_default(subscriber, || {
            tracing::info!(id = "001", "something happened");
        });

        let value = last_line_as_json(&make_writer);
        assert_eq!(value["message"]["message"], "something happened");
        assert_eq!(value["message"]["id"], "001");
    }

    #[test]
    fn structured_event_is_stringified_by_default() {
        let make_writer = MockMakeWriter::default();
        let subscriber = SubscriberBuilder::default()
            .with_writer(make_writer.clone())
            .finish();

        with_default(subscriber, || {
            tracing::info!(id = "001");
        });

        let value = last_line_as_json(&make_writer);
        assert_eq!(value["message"], r#"{"id":"001"}"#);
    }

    #[test]
    fn runtime_fields_are_selectable() {
        let make_writer = MockMakeWriter::default();
        let subscriber = SubscriberBuilder::default()
            .with_fields(["thread_id", "process", "relative_created", "message"])
            .with_writer(make_writer.clone())
            .finish();

        with_default(subscriber, || {
            tracing::info!("hello");
        });

        let value = last_line_as_json(&make_writer);
        assert!(value["thread_id"].as_str().unwrap().starts_with("ThreadId"));
        assert_eq!(value["process"], u64::from(std::process::id()));
        assert!(value["relative_created"].is_number());
    }

    #[test]
    fn indent_through_the_builder() {
        let make_writer = MockMakeWriter::default();
        let subscriber = SubscriberBuilder::default()
            .with_fields(["level_name", "message"])
            .with_indent(Indent::Spaces(2))
            .with_writer(make_writer.clone())
            .finish();

        with_default(subscriber, || {
            tracing::info!("hello");
        });

        assert_eq!(
            make_writer.contents(),
            "{\n  \"level_name\": \"INFO\",\n  \"message\": \"hello\"\n}\n",
        );
    }
}
