use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub const LOG_ENV_VAR: &str = "COBRANCA_LOG";
const DEFAULT_DIRECTIVE: &str = "warn";

/// Sends library events to stderr so stdout stays reserved for command output.
pub fn init_logging() {
    let filter = build_filter(std::env::var(LOG_ENV_VAR).ok().as_deref());
    let stderr_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .try_init();
}

fn build_filter(raw: Option<&str>) -> EnvFilter {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        Some(directives) => {
            EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
        }
        None => EnvFilter::new(DEFAULT_DIRECTIVE),
    }
}
