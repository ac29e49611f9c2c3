//! Engine error types

use std::path::PathBuf;

use chartstage_core::CoreError;
use chartstage_repo::RepoError;
use miette::Diagnostic;
use thiserror::Error;

/// Bundle assembly errors
#[derive(Error, Debug, Diagnostic)]
pub enum EngineError {
    #[error("Template chart not found at {}", path.display())]
    #[diagnostic(
        code(chartstage::engine::template_not_found),
        help("`bundle.template` must point at a chart directory")
    )]
    TemplateNotFound { path: PathBuf },

    #[error("Invalid staging key component '{value}': {reason}")]
    #[diagnostic(code(chartstage::engine::invalid_stage_key))]
    InvalidStageKey { value: String, reason: String },

    #[error("Dependency resolution failed")]
    #[diagnostic(code(chartstage::engine::dependency))]
    Dependency(#[from] RepoError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
