//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Failed to parse YAML document: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid version: {0}")]
    InvalidVersion(#[from] semver::Error),

    #[error("Invalid document {path}: {message}")]
    InvalidDocument { path: String, message: String },

    #[error("Invalid bundle name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Invalid repository locator for '{name}': {message}")]
    InvalidLocator { name: String, message: String },

    #[error("Required value `{name}` not found in stage outputs")]
    MissingRequiredValue { name: String },

    #[error("Placeholder `{{{placeholder}}}` in '{template}' is not a declared required value")]
    UnknownPlaceholder {
        placeholder: String,
        template: String,
    },

    #[error("Invalid template string '{template}': {message}")]
    InvalidTemplate { template: String, message: String },

    #[error("Invalid stage configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Failed to walk directory {path}: {message}")]
    Walk { path: String, message: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;
