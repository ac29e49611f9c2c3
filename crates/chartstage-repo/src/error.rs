//! Error types for dependency resolution

use std::path::PathBuf;

use chartstage_core::CoreError;
use chartstage_exec::ExecError;
use thiserror::Error;

/// Dependency resolution errors
#[derive(Debug, Error)]
pub enum RepoError {
    // ============ Package manager ============
    #[error("`helm {command}` failed with exit code {exit_code}:\n{output}")]
    RepositorySetupFailed {
        command: String,
        exit_code: i32,
        output: String,
    },

    #[error("Failed to pull dependency '{name}' (exit code {exit_code}):\n{output}")]
    PullFailed {
        name: String,
        exit_code: i32,
        output: String,
    },

    #[error("Pull of '{name}' succeeded but {} was not created", marker.display())]
    PullIncomplete { name: String, marker: PathBuf },

    // ============ Local charts ============
    #[error("Local chart for '{name}' not found at {}", path.display())]
    LocalChartNotFound { name: String, path: PathBuf },

    // ============ Wrapped ============
    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for resolution operations
pub type Result<T> = std::result::Result<T, RepoError>;
