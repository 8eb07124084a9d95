//! Structured logging (§4.8, ambient): one `tracing_subscriber`
//! subscriber installed once per process, selected by the two
//! environment variables the core owns — `DELI_LOG_LEVEL` and
//! `DELI_LOG_FORMAT`. Deliberately narrow (no CLI verbosity flags) since
//! those are an external, CLI-level concern here.

use tracing_subscriber::EnvFilter;

const LOG_LEVEL_VAR: &str = "DELI_LOG_LEVEL";
const LOG_FORMAT_VAR: &str = "DELI_LOG_FORMAT";

/// Output shape selected by `DELI_LOG_FORMAT` (§6): `text` is the
/// default human-readable formatter, `json` switches to
/// `tracing_subscriber::fmt().json()`. Any other value falls back to
/// `text` rather than failing startup over a typo'd env var.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    fn from_env() -> Self {
        match std::env::var(LOG_FORMAT_VAR).as_deref() {
            Ok("json") => Self::Json,
            _ => Self::Text,
        }
    }
}

fn filter_from_env() -> EnvFilter {
    std::env::var(LOG_LEVEL_VAR).map_or_else(
        |_| EnvFilter::new("info"),
        |value| EnvFilter::try_new(value).unwrap_or_else(|_| EnvFilter::new("info")),
    )
}

/// Install the global `tracing` subscriber. Safe to call more than once
/// per process (a second call is a no-op); callers that embed this crate
/// in a larger process that already installed its own subscriber are
/// free to skip this entirely.
pub fn init_logging() {
    let filter = filter_from_env();

    let result = match LogFormat::from_env() {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .try_init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).try_init(),
    };

    if let Err(err) = result {
        eprintln!("failed to install global tracing subscriber: {err}");
    }
}
