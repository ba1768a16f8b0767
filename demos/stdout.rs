//! Emits a few JSON log lines to stdout through the global subscriber.
//!
//! Run with `cargo run --example stdout`.

fn main() {
    json_formatter::fmt()
        .with_fields(["timestamp", "level_name", "name", "message"])
        .init();

    tracing::info!("server listening");
    tracing::warn!(port = 8080, "port already in use");
    tracing::error!("shutting down");
}
