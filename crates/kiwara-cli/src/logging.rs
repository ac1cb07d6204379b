//! Logging initialization for the CLI.
//!
//! The core only talks to the [`Logger`] capability; this module owns the
//! actual sink and forwards every core message to `tracing`.

use kiwara_core::Logger;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Target used for every message forwarded from the core.
const TARGET: &str = "kiwara";

/// Initialize the tracing subscriber.
///
/// * `verbosity` - 0 = INFO, 1 = DEBUG, 2+ = TRACE
/// * `json` - If true, emit JSON lines instead of human text
///
/// Logs always go to stderr so stdout stays reserved for the report.
pub fn init(verbosity: u8, json: bool) {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    // RUST_LOG is honoured, the verbosity flag overrides it for our target
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    if let Ok(directive) = format!("{TARGET}={level}").parse() {
        filter = filter.add_directive(directive);
    }

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}

/// Forwards core log calls to `tracing`. `log` is the chattiest core level
/// and maps to DEBUG, so progress lines need `-v`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, message: &str) {
        tracing::debug!(target: TARGET, "{message}");
    }

    fn info(&self, message: &str) {
        tracing::info!(target: TARGET, "{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: TARGET, "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(target: TARGET, "{message}");
    }
}
