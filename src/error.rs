use thiserror::Error;

/// Errors surfaced by [`JsonFormatter::format`](crate::JsonFormatter::format).
///
/// The formatter performs no recovery of its own. [`JsonLayer`](crate::JsonLayer)
/// reports the error on stderr and drops the event; other callers decide for
/// themselves.
#[derive(Debug, Error)]
pub enum FormatError {
    /// A configured field name is not an attribute of the log event.
    #[error("formatting field not found in log record: `{0}`")]
    UnknownField(String),

    /// The record could not be serialized, e.g. a structured message holding
    /// a value the serializer rejects.
    #[error("unable to serialize log record")]
    Serialize(#[from] serde_json::Error),
}
