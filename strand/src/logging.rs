//! Log output for the scheduler's `tracing` events.
//!
//! The crate only emits events: `trace` for every resume and resolution,
//! `debug` for launches and completions, `warn` for protocol violations and
//! unobserved failures. Install a subscriber to see them:
//!
//! ```rust,ignore
//! strand::logging::init_with_level(LogLevel::Debug);
//! ```

use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{Layer, Registry, layer::SubscriberExt};

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Installs the global subscriber at `WARN` level.
///
/// Does nothing if a subscriber is already installed.
pub fn init() {
    init_with_level(LogLevel::Warn);
}

/// Installs the global subscriber at `level`.
///
/// Does nothing if a subscriber is already installed.
pub fn init_with_level(level: LogLevel) {
    let _ = try_init(level);
}

/// Installs the global subscriber, failing if one is already set.
pub fn try_init(level: LogLevel) -> Result<(), TryInitError> {
    let filter = tracing_subscriber::filter::LevelFilter::from_level(level.into());

    let layer = tracing_subscriber::fmt::layer()
        .without_time()
        .with_target(false)
        .with_level(true)
        .compact()
        .with_filter(filter);

    Registry::default().with(layer).try_init()
}
