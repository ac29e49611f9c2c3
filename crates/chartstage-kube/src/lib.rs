//! chartstage Kube - release reconciliation
//!
//! `deploy` queries live release state and issues install or upgrade
//! against a staged chart; `destroy` issues uninstall and treats a missing
//! release as a no-op. Outcomes are returned as data: a failed package
//! manager run is a [`ReleaseOutcome`] that did not succeed, not an error.

pub mod actions;
pub mod error;
pub mod reconciler;

pub use actions::{DeployOptions, DestroyOptions};
pub use error::{KubeError, Result};
pub use reconciler::{ReleaseAction, ReleaseOutcome, ReleaseReconciler, ReleaseState};
