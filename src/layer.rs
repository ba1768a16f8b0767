use std::{io, time::Instant};

use tracing_core::{Event, Subscriber};
use tracing_subscriber::{
    fmt::{MakeWriter, TestWriter},
    layer::Context,
    Layer,
};

use crate::{
    event::{LogEvent, Payload},
    formatter::JsonFormatter,
    visitor::EventVisitor,
};

/// Layer that renders each event through a [`JsonFormatter`] and writes one
/// line of JSON to the configured output.
///
/// Events the formatter rejects (an unknown configured field) are reported
/// on stderr and dropped; the dispatch path never sees the failure.
pub struct JsonLayer<W = fn() -> io::Stdout> {
    formatter: JsonFormatter,
    make_writer: W,
    log_internal_errors: bool,
    epoch: Instant,
}

impl Default for JsonLayer {
    fn default() -> Self {
        Self::stdout()
    }
}

impl JsonLayer {
    /// Creates a layer with the default formatter, writing to stdout.
    pub fn stdout() -> JsonLayer<fn() -> io::Stdout> {
        JsonLayer::new(JsonFormatter::default(), io::stdout)
    }

    /// Creates a layer with the default formatter, writing to stderr.
    pub fn stderr() -> JsonLayer<fn() -> io::Stderr> {
        JsonLayer::new(JsonFormatter::default(), io::stderr)
    }
}

impl<W> JsonLayer<W> {
    pub fn new(formatter: JsonFormatter, make_writer: W) -> JsonLayer<W>
    where
        W: for<'writer> MakeWriter<'writer> + 'static,
    {
        JsonLayer {
            formatter,
            make_writer,
            log_internal_errors: true,
            epoch: Instant::now(),
        }
    }

    /// Sets the [`MakeWriter`] used to write events.
    ///
    /// ```rust
    /// use tracing_subscriber::prelude::*;
    ///
    /// let layer = json_formatter::JsonLayer::stdout().with_writer(std::io::stderr);
    /// # tracing_subscriber::registry().with(layer);
    /// ```
    pub fn with_writer<W2>(self, make_writer: W2) -> JsonLayer<W2>
    where
        W2: for<'writer> MakeWriter<'writer> + 'static,
    {
        JsonLayer {
            formatter: self.formatter,
            make_writer,
            log_internal_errors: self.log_internal_errors,
            epoch: self.epoch,
        }
    }

    /// Configures the layer to support `libtest`'s output capturing when
    /// used in unit tests.
    pub fn with_test_writer(self) -> JsonLayer<TestWriter> {
        JsonLayer {
            formatter: self.formatter,
            make_writer: TestWriter::default(),
            log_internal_errors: self.log_internal_errors,
            epoch: self.epoch,
        }
    }

    /// Sets whether formatting and write failures are reported on stderr.
    /// Defaults to true. A failed event is dropped either way.
    pub fn log_internal_errors(mut self, log_internal_errors: bool) -> Self {
        self.log_internal_errors = log_internal_errors;
        self
    }

    fn make_log_event(&self, event: &Event<'_>) -> LogEvent {
        let metadata = event.metadata();

        let mut visitor = EventVisitor::new();
        event.record(&mut visitor);
        let (message, fields) = visitor.finish();

        let payload = if fields.is_empty() {
            Payload::Text(message.unwrap_or_default())
        } else {
            let mut map = serde_json::Map::new();
            if let Some(message) = message {
                map.insert("message".to_owned(), serde_json::Value::from(message));
            }
            for (key, value) in fields {
                map.insert(key.to_owned(), value);
            }
            Payload::Structured(serde_json::Value::Object(map))
        };

        let mut log_event = LogEvent::new(metadata.target(), *metadata.level(), payload);
        log_event.file = metadata.file().map(str::to_owned);
        log_event.module = metadata.module_path().map(str::to_owned);
        log_event.line = metadata.line();
        log_event.relative_created_ms = self.epoch.elapsed().as_secs_f64() * 1000.0;
        log_event
    }
}

impl<S, W> Layer<S> for JsonLayer<W>
where
    S: Subscriber,
    W: for<'writer> MakeWriter<'writer> + 'static,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let log_event = self.make_log_event(event);

        match self.formatter.format(&log_event) {
            Ok(mut line) => {
                line.push('\n');
                let mut writer = self.make_writer.make_writer_for(event.metadata());
                if let Err(error) = io::Write::write_all(&mut writer, line.as_bytes()) {
                    if self.log_internal_errors {
                        eprintln!("[json-formatter] unable to write an event: {error}");
                    }
                }
            },
            Err(error) => {
                if self.log_internal_errors {
                    eprintln!("[json-formatter] unable to format an event, dropping it: {error}");
                }
            },
        }
    }
}
