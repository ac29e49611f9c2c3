//! Error types for chartstage-kube

use std::path::PathBuf;

use chartstage_exec::ExecError;
use thiserror::Error;

/// Result type for chartstage-kube operations
pub type Result<T> = std::result::Result<T, KubeError>;

/// Errors that can occur while reconciling releases
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KubeError {
    /// The chart path holds no staged chart
    #[error("no staged chart at {}\nHint: Run `chartstage render` first", path.display())]
    ChartNotStaged { path: PathBuf },

    /// The package manager ran and reported failure
    #[error("{action} of release '{name}' in namespace '{namespace}' failed with exit code {exit_code}:\n{output}")]
    OperationFailed {
        action: String,
        name: String,
        namespace: String,
        exit_code: i32,
        output: String,
    },

    /// The package manager could not be run
    #[error(transparent)]
    Exec(#[from] ExecError),
}
