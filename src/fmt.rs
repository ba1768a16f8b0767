use std::error::Error;

use crate::{builder::SubscriberBuilder, layer::JsonLayer};

/// Returns a new [`SubscriberBuilder`] for configuring a JSON formatting
/// subscriber.
///
/// This is essentially shorthand for [`SubscriberBuilder::default()`].
///
/// # Examples
///
/// Using [`init`](SubscriberBuilder::init) to set the default subscriber:
///
/// ```rust
/// json_formatter::fmt().init();
/// ```
///
/// Configuring the output format:
///
/// ```rust
/// json_formatter::fmt()
///     .with_fields(["timestamp", "level_name", "name", "message"])
///     .with_time_format("%H:%M:%S")
///     .init();
/// ```
pub fn fmt() -> SubscriberBuilder {
    SubscriberBuilder::default()
}

/// Returns a new JSON formatting [layer] that can be composed with other
/// layers to construct a subscriber.
///
/// [layer]: JsonLayer
pub fn layer() -> JsonLayer {
    JsonLayer::default()
}

/// Install a global subscriber that formats events as JSON, filtered by the
/// value of the `RUST_LOG` environment variable (default level `INFO`).
///
/// # Errors
///
/// Returns an error if the initialization was unsuccessful, likely because a
/// global subscriber was already installed.
pub fn try_init() -> Result<(), Box<dyn Error + Send + Sync + 'static>> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let subscriber = fmt().finish();

    #[cfg(feature = "env-filter")]
    let subscriber = subscriber.with(tracing_subscriber::EnvFilter::from_default_env());

    #[cfg(not(feature = "env-filter"))]
    let subscriber = {
        use std::{env, str::FromStr};

        use tracing_subscriber::filter::Targets;

        let targets = match env::var("RUST_LOG") {
            Ok(var) => Targets::from_str(&var)
                .map_err(|error| {
                    eprintln!("ignoring `RUST_LOG={var:?}`: {error}");
                })
                .unwrap_or_default(),
            Err(env::VarError::NotPresent) => {
                Targets::new().with_default(tracing_core::LevelFilter::INFO)
            },
            Err(error) => {
                eprintln!("ignoring `RUST_LOG`: {error}");
                Targets::new().with_default(tracing_core::LevelFilter::INFO)
            },
        };
        subscriber.with(targets)
    };

    subscriber.try_init().map_err(Into::into)
}

/// Install a global subscriber that formats events as JSON.
///
/// # Panics
///
/// Panics if the initialization was unsuccessful, likely because a global
/// subscriber was already installed.
pub fn init() {
    try_init().expect("unable to install global subscriber");
}
