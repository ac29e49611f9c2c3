//! CLI error types with exit code handling
//!
//! Library errors are flattened into a message carrying their whole source
//! chain, and classified by the exit code the process should end with.

use std::error::Error as StdError;

use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Configuration file missing or invalid
    #[error("Configuration error: {message}")]
    #[diagnostic(code(chartstage::cli::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Deploy-time values missing or malformed
    #[error("Input error: {message}")]
    #[diagnostic(code(chartstage::cli::input))]
    Input {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Malformed command line argument
    #[error("Usage error: {message}")]
    #[diagnostic(code(chartstage::cli::usage))]
    Usage { message: String },

    /// Staging the bundle failed
    #[error("Render failed: {message}")]
    #[diagnostic(code(chartstage::cli::render))]
    Render {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// The package manager reported failure
    #[error("{message}")]
    #[diagnostic(code(chartstage::cli::release))]
    Release { message: String },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(chartstage::cli::io))]
    Io { message: String },

    /// Wrapped error for passthrough (stores the formatted message)
    #[error("{message}")]
    #[diagnostic(code(chartstage::cli::error))]
    Other { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config { .. } => exit_codes::CONFIG_ERROR,
            CliError::Input { .. } => exit_codes::INPUT_ERROR,
            CliError::Usage { .. } => exit_codes::USAGE_ERROR,
            CliError::Render { .. } => exit_codes::RENDER_ERROR,
            CliError::Release { .. } => exit_codes::RELEASE_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    /// Create a configuration error with help text
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a configuration error from a library error
    pub fn config(err: impl StdError) -> Self {
        Self::Config {
            message: chain(&err),
            help: None,
        }
    }

    /// Create an input error with help text
    pub fn input_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a usage error
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    /// Create a render error from a library error
    pub fn render(err: impl StdError) -> Self {
        Self::Render {
            message: chain(&err),
            help: None,
        }
    }

    /// Create a release error from a library error
    pub fn release(err: impl StdError) -> Self {
        Self::Release {
            message: chain(&err),
        }
    }

    /// Create a passthrough error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

/// Join an error and its sources into one message
fn chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
