//! chartstage Exec - running the package manager as a subprocess
//!
//! - `ProcessRunner`: process-group execution with live, prefixed output
//!   and a timeout that terminates the whole group
//! - `MockRunner`: recorded, scripted runner for tests
//! - `HelmClient`/`HelmCommand`: the commands chartstage issues and how
//!   their results are read back

pub mod error;
pub mod helm;
pub mod mock;
pub mod process;
pub mod release;

pub use error::{ExecError, Result};
pub use helm::{HelmClient, HelmCommand, ReleaseRequest};
pub use mock::{Invocation, MockRunner};
pub use process::{CommandOutput, CommandRunner, ProcessRunner, RunOptions};
pub use release::{ReleaseStatus, ReleaseSummary};
