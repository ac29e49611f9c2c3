//! chartstage Engine - bundle assembly
//!
//! Copies a chart template into a reusable staging directory, merges value
//! overrides, writes the chart identity, resolves dependencies into
//! `charts/` with `file://` locators, and returns the staged tree as a
//! virtual file manifest addressed at the published output location.

pub mod assembler;
pub mod error;
pub mod staging;

pub use assembler::{BundleAssembler, RenderOutput};
pub use error::{EngineError, Result};
pub use staging::{StageContext, StageLayout};
