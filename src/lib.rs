mod builder;
mod error;
mod event;
mod fields;
mod fmt;
mod formatter;
mod layer;
mod visitor;
mod write_adaptor;

#[cfg(test)]
mod tests;

pub use builder::SubscriberBuilder;
pub use error::FormatError;
pub use event::{ExceptionInfo, LogEvent, Payload};
pub use fmt::{fmt, init, layer, try_init};
pub use formatter::{FormatterBuilder, Indent, JsonFormatter};
pub use layer::JsonLayer;
