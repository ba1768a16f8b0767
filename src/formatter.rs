use std::io;

use chrono::format::{Item, StrftimeItems};
use serde::ser::{SerializeMap, Serializer as _};
use serde_json::ser::PrettyFormatter;

use crate::{
    error::FormatError,
    event::{LogEvent, Payload},
    fields::Selector,
    write_adaptor::WriteAdaptor,
};

pub(crate) const DEFAULT_FIELDS: [&str; 3] = ["timestamp", "level_name", "message"];
pub(crate) const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Pretty-print indentation: a number of spaces or a literal string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Indent {
    Spaces(usize),
    Literal(String),
}

impl Indent {
    fn into_string(self) -> String {
        match self {
            Self::Spaces(width) => " ".repeat(width),
            Self::Literal(literal) => literal,
        }
    }
}

impl From<usize> for Indent {
    fn from(width: usize) -> Self {
        Self::Spaces(width)
    }
}

impl From<&str> for Indent {
    fn from(literal: &str) -> Self {
        Self::Literal(literal.to_owned())
    }
}

impl From<String> for Indent {
    fn from(literal: String) -> Self {
        Self::Literal(literal)
    }
}

/// Renders [`LogEvent`]s as JSON text, one object per event.
///
/// The formatter owns an ordered list of field selectors fixed when it is
/// built and is otherwise stateless, so [`format`](Self::format) can be
/// called concurrently from any number of threads.
///
/// ```rust
/// use json_formatter::{JsonFormatter, LogEvent};
/// use tracing::Level;
///
/// let formatter = JsonFormatter::builder()
///     .with_fields(["level_name", "message"])
///     .build();
/// let event = LogEvent::new("app", Level::INFO, "ready");
/// let line = formatter.format(&event)?;
/// assert_eq!(line, r#"{"level_name":"INFO","message":"ready"}"#);
/// # Ok::<(), json_formatter::FormatError>(())
/// ```
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    fields: Vec<Selector>,
    time_format: String,
    indent: Option<String>,
    structured_messages: bool,
}

/// Values derived from an event at the start of a formatting call. The event
/// itself is never written to.
pub(crate) struct Derived {
    pub(crate) message: serde_json::Value,
    pub(crate) timestamp: String,
    exception_text: Option<String>,
}

impl Default for JsonFormatter {
    fn default() -> Self {
        FormatterBuilder::default().build()
    }
}

impl JsonFormatter {
    pub fn builder() -> FormatterBuilder {
        FormatterBuilder::default()
    }

    /// Formats one event.
    ///
    /// Fails when a configured field name is not an attribute of the event;
    /// nothing is emitted on that path. Key order in the output is exactly
    /// the configured field order, with `traceback` and `stack` appended
    /// after it when the event carries failure context.
    pub fn format(&self, event: &LogEvent) -> Result<String, FormatError> {
        let derived = self.derive(event);
        let mut out = String::with_capacity(128);

        match &self.indent {
            Some(indent) => {
                let formatter = PrettyFormatter::with_indent(indent.as_bytes());
                let mut serializer =
                    serde_json::Serializer::with_formatter(WriteAdaptor::new(&mut out), formatter);
                self.write_record(&mut serializer, event, &derived)?;
            },
            None => {
                let mut serializer = serde_json::Serializer::new(WriteAdaptor::new(&mut out));
                self.write_record(&mut serializer, event, &derived)?;
            },
        }

        Ok(out)
    }

    fn derive(&self, event: &LogEvent) -> Derived {
        let message = match &event.payload {
            Payload::Text(text) => serde_json::Value::from(text.as_str()),
            Payload::Structured(value) if self.structured_messages => value.clone(),
            Payload::Structured(value) => serde_json::Value::from(value.to_string()),
        };
        let timestamp = event.created.format(&self.time_format).to_string();
        let exception_text = event.exception.as_ref().map(|exception| {
            exception
                .rendered
                .clone()
                .unwrap_or_else(|| exception.render())
        });

        Derived {
            message,
            timestamp,
            exception_text,
        }
    }

    fn write_record<W, F>(
        &self,
        serializer: &mut serde_json::Serializer<W, F>,
        event: &LogEvent,
        derived: &Derived,
    ) -> Result<(), FormatError>
    where
        W: io::Write,
        F: serde_json::ser::Formatter,
    {
        let mut record = serializer.serialize_map(None)?;

        for selector in &self.fields {
            let kind = selector
                .kind
                .ok_or_else(|| FormatError::UnknownField(selector.name.clone()))?;
            record.serialize_entry(&selector.name, &kind.value(event, derived))?;
        }

        if let Some(text) = &derived.exception_text {
            let lines = text
                .trim()
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>();
            record.serialize_entry("traceback", &lines)?;
        }
        if let Some(stack) = &event.stack {
            record.serialize_entry("stack", stack.trim())?;
        }

        record.end()?;
        Ok(())
    }
}

/// Configures a [`JsonFormatter`].
///
/// Every option falls back to its documented default when unset or unusable,
/// so [`build`](Self::build) cannot fail.
#[derive(Debug, Clone, Default)]
pub struct FormatterBuilder {
    fields: Option<Vec<String>>,
    time_format: Option<String>,
    indent: Option<Indent>,
    structured_messages: bool,
}

impl FormatterBuilder {
    /// Sets the ordered list of fields to emit. Defaults to `timestamp`,
    /// `level_name`, `message`; an empty list behaves as if the option was
    /// never set.
    pub fn with_fields<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the strftime pattern used to render the `timestamp` field.
    /// Defaults to `%Y-%m-%d %H:%M:%S`; a pattern chrono cannot parse is
    /// replaced by the default.
    pub fn with_time_format(mut self, time_format: impl Into<String>) -> Self {
        self.time_format = Some(time_format.into());
        self
    }

    /// Pretty-prints output with the given indentation instead of the
    /// default compact encoding.
    pub fn with_indent(mut self, indent: impl Into<Indent>) -> Self {
        self.indent = Some(indent.into());
        self
    }

    /// Embeds structured message payloads as native JSON values instead of
    /// stringifying them.
    pub fn structured_messages(mut self, structured_messages: bool) -> Self {
        self.structured_messages = structured_messages;
        self
    }

    pub fn build(self) -> JsonFormatter {
        let fields = match self.fields {
            Some(fields) if !fields.is_empty() => fields,
            _ => DEFAULT_FIELDS.iter().map(|&field| field.to_owned()).collect(),
        };
        let time_format = match self.time_format {
            Some(pattern) if valid_time_format(&pattern) => pattern,
            _ => DEFAULT_TIME_FORMAT.to_owned(),
        };

        JsonFormatter {
            fields: fields.into_iter().map(Selector::resolve).collect(),
            time_format,
            indent: self.indent.map(Indent::into_string),
            structured_messages: self.structured_messages,
        }
    }
}

fn valid_time_format(pattern: &str) -> bool {
    StrftimeItems::new(pattern).all(|item| !matches!(item, Item::Error))
}
