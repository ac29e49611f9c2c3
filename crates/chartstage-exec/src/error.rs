//! Error types for subprocess execution
//!
//! A command that ran and exited non-zero is not an error at this layer;
//! it comes back as a [`CommandOutput`](crate::CommandOutput) for the
//! caller to interpret.

use thiserror::Error;

/// Subprocess execution errors
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("empty command line")]
    EmptyCommand,

    #[error("'{program}' closed its output but did not exit within {grace_secs}s")]
    ReapTimeout { program: String, grace_secs: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExecError {
    /// Check whether the binary could not be started at all
    pub fn is_spawn_failure(&self) -> bool {
        matches!(self, ExecError::Spawn { .. })
    }
}

/// Result type for execution operations
pub type Result<T> = std::result::Result<T, ExecError>;
