//! Subscriber setup for test binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when neither `RUST_LOG` nor an explicit directive is given
pub const DEFAULT_FILTER: &str = "sightline=info";

/// Build the filter: `RUST_LOG` when set, else `directive`, else
/// [`DEFAULT_FILTER`]. Unparsable directives fall back to the default.
#[must_use]
pub fn env_filter(directive: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(directive.unwrap_or(DEFAULT_FILTER))
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    })
}

/// Install a `fmt` subscriber. Returns `false` if one was already installed.
pub fn init_tracing(directive: Option<&str>) -> bool {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .with(env_filter(directive))
        .try_init()
        .is_ok()
}
