//! Logging setup, command timing and span constructors.

use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install a human-readable subscriber filtered by `RUST_LOG` (default
/// `info`). A second call, or a subscriber installed elsewhere, is left alone.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .try_init();
}

/// Like [`init`] with one JSON object per line.
pub fn init_json() {
    let _ = tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter())
        .with_target(true)
        .try_init();
}

/// Guard for timing command dispatch and recording metrics.
///
/// Records latency when dropped.
pub struct CommandTimer {
    command: String,
    start: Instant,
}

impl CommandTimer {
    /// Start timing a command.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            start: Instant::now(),
        }
    }
}

impl Drop for CommandTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        crate::metrics::record_command_latency(&self.command, duration);
    }
}

/// Standardized span constructors.
pub mod spans {
    use tracing::{Span, info_span};

    /// Span wrapping one session actor for its whole life.
    pub fn session(network: &str) -> Span {
        info_span!("session", network = %network)
    }

    /// Create a span for a command dispatch.
    pub fn command(network: &str, name: &str) -> Span {
        info_span!("command", network = %network, name = %name)
    }
}
