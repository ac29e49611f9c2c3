//! CLI commands

pub mod render;

// Release lifecycle
pub mod deploy;
pub mod destroy;
pub mod list;
pub mod status;

// Repository management
pub mod repo;
