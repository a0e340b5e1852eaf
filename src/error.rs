//! Unified error handling for slirc-bnc.
//!
//! Command dispatch never surfaces a panic or an opaque error to callers:
//! every [`CommandError`] folds into a [`DispatchResult`], and every error
//! carries a static code for metric labels.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Transport Errors (outbound primitives)
// ============================================================================

/// Failure reported by a transport's outbound primitive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("not connected")]
    NotConnected,

    #[error("transport closed")]
    Closed,

    #[error("session inbox full")]
    InboxFull,

    #[error("{0}")]
    Other(String),
}

// ============================================================================
// Command Errors (dispatch)
// ============================================================================

/// Errors that can occur while dispatching an outbound command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("network not found")]
    NetworkNotFound,

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("{0} requires a target")]
    MissingTarget(String),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("session closed")]
    SessionClosed,
}

impl CommandError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NetworkNotFound => "network_not_found",
            Self::UnknownCommand(_) => "unknown_command",
            Self::MissingTarget(_) => "missing_target",
            Self::Transport(_) => "transport_error",
            Self::SessionClosed => "session_closed",
        }
    }
}

/// Result type for command dispatch inside the crate.
pub type CommandResult = Result<(), CommandError>;

/// Wire-level outcome of `dispatch`: `{success, error?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DispatchResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

impl From<CommandResult> for DispatchResult {
    fn from(result: CommandResult) -> Self {
        match result {
            Ok(()) => Self::ok(),
            Err(e) => Self::failed(e.to_string()),
        }
    }
}

impl From<CommandError> for DispatchResult {
    fn from(e: CommandError) -> Self {
        Self::failed(e.to_string())
    }
}
