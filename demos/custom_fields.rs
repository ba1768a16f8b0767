//! Formats a hand-built event, including failure context, without going
//! through a subscriber.
//!
//! Run with `cargo run --example custom-fields`.

use json_formatter::{ExceptionInfo, Indent, JsonFormatter, LogEvent};
use tracing::Level;

fn main() {
    let formatter = JsonFormatter::builder()
        .with_fields(["timestamp", "level_name", "filename", "line", "message"])
        .with_indent(Indent::Spaces(2))
        .build();

    let mut event = LogEvent::new("demo", Level::ERROR, "error occurred !!").with_exception(
        ExceptionInfo::new("ConnectionReset", "connection reset by peer")
            .with_backtrace("at demo::handle\nat demo::main"),
    );
    event.file = Some(file!().to_owned());
    event.line = Some(line!());

    match formatter.format(&event) {
        Ok(record) => println!("{record}"),
        Err(error) => eprintln!("{error}"),
    }
}
