//! Default value functions for configuration.
//!
//! Separated into its own module for clarity and reuse.

/// Returns `true` (for serde defaults).
pub fn default_true() -> bool {
    true
}

// =============================================================================
// Archive Defaults
// =============================================================================

pub fn default_archive_path() -> String {
    "bnc.db".to_string()
}

/// Ring size per conversation for the memory backend.
pub fn default_archive_capacity() -> usize {
    500
}

pub fn default_archive_queue_depth() -> usize {
    1024
}

pub fn default_retention_days() -> u32 {
    30
}

pub fn default_prune_interval_secs() -> u64 {
    86_400
}

// =============================================================================
// Bus Defaults
// =============================================================================

pub fn default_bus_capacity() -> usize {
    1024
}

pub fn default_system_buffer() -> usize {
    100
}

// =============================================================================
// Session Defaults
// =============================================================================

pub fn default_inbox_depth() -> usize {
    256
}

pub fn default_shutdown_timeout_ms() -> u64 {
    5_000
}

// =============================================================================
// Network Defaults
// =============================================================================

pub fn default_port() -> u16 {
    6667
}

pub fn default_max_retries() -> u32 {
    30
}
