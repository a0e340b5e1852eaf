//! Prometheus metrics collection for slirc-bnc.
//!
//! Collectors live in `OnceLock`s and are registered once by [`init`].
//! Recording before `init` is a no-op, so library users that never call it
//! pay nothing. Exposing [`gather`] over HTTP is the embedder's job.
//!
//! - `bnc_events_total{network}` - raw events processed per network
//! - `bnc_archive_failures_total` - archive writes that returned an error
//! - `bnc_archive_dropped_total` - archive writes dropped on a full queue
//! - `bnc_bus_lagged_total` - subscribers dropped for falling behind
//! - `bnc_sessions` - live sessions
//! - `bnc_commands_total{command,result}` - dispatched commands
//! - `bnc_command_duration_seconds{command}` - dispatch latency

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::{Once, OnceLock};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Counters (monotonic increasing)
// ========================================================================

/// Raw events processed, by network.
pub static EVENTS: OnceLock<IntCounterVec> = OnceLock::new();

/// Archive writes that failed in the backend.
pub static ARCHIVE_FAILURES: OnceLock<IntCounter> = OnceLock::new();

/// Archive writes dropped because a writer queue was full.
pub static ARCHIVE_DROPPED: OnceLock<IntCounter> = OnceLock::new();

/// Bus subscribers disconnected for lagging.
pub static BUS_LAGGED: OnceLock<IntCounter> = OnceLock::new();

/// Dispatched commands by name and outcome.
pub static COMMANDS: OnceLock<IntCounterVec> = OnceLock::new();

// ========================================================================
// Gauges and histograms
// ========================================================================

/// Sessions currently registered.
pub static SESSIONS: OnceLock<IntGauge> = OnceLock::new();

/// Command dispatch latency by command.
pub static COMMAND_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

static INIT: Once = Once::new();

/// Initialize the Prometheus metrics registry. Idempotent.
pub fn init() {
    INIT.call_once(register_all);
}

fn register_all() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            match $init {
                Ok(m) => {
                    if let Err(e) = r.register(Box::new(m.clone())) {
                        tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
                    }
                    let _ = $metric.set(m);
                }
                Err(e) => {
                    tracing::warn!(error = %e, concat!("Failed to create metric ", stringify!($metric)));
                }
            }
        };
    }

    register!(EVENTS, IntCounterVec::new(Opts::new("bnc_events_total", "Raw IRC events processed"), &["network"]));
    register!(ARCHIVE_FAILURES, IntCounter::new("bnc_archive_failures_total", "Archive writes that failed"));
    register!(ARCHIVE_DROPPED, IntCounter::new("bnc_archive_dropped_total", "Archive writes dropped on a full queue"));
    register!(BUS_LAGGED, IntCounter::new("bnc_bus_lagged_total", "Bus subscribers dropped for lagging"));
    register!(COMMANDS, IntCounterVec::new(Opts::new("bnc_commands_total", "Dispatched commands"), &["command", "result"]));
    register!(SESSIONS, IntGauge::new("bnc_sessions", "Registered network sessions"));
    register!(COMMAND_LATENCY, HistogramVec::new(
        HistogramOpts::new("bnc_command_duration_seconds", "Command dispatch latency")
            .buckets(vec![0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]),
        &["command"]));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

// ============================================================================
// Helper functions for metric updates
// ============================================================================

#[inline]
pub fn record_event(network: &str) {
    if let Some(c) = EVENTS.get() {
        c.with_label_values(&[network]).inc();
    }
}

#[inline]
pub fn record_archive_failure() {
    if let Some(c) = ARCHIVE_FAILURES.get() {
        c.inc();
    }
}

#[inline]
pub fn record_archive_dropped() {
    if let Some(c) = ARCHIVE_DROPPED.get() {
        c.inc();
    }
}

#[inline]
pub fn record_bus_lagged() {
    if let Some(c) = BUS_LAGGED.get() {
        c.inc();
    }
}

/// Record a dispatched command. `result` is `"ok"` or an error code.
#[inline]
pub fn record_command(command: &str, result: &str) {
    if let Some(c) = COMMANDS.get() {
        c.with_label_values(&[command, result]).inc();
    }
}

#[inline]
pub fn record_command_latency(command: &str, duration_secs: f64) {
    if let Some(h) = COMMAND_LATENCY.get() {
        h.with_label_values(&[command]).observe(duration_secs);
    }
}

#[inline]
pub fn set_sessions(count: usize) {
    if let Some(g) = SESSIONS.get() {
        g.set(i64::try_from(count).unwrap_or(i64::MAX));
    }
}
