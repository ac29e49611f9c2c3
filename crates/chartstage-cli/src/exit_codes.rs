//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Input error - missing or malformed deploy-time values
pub const INPUT_ERROR: i32 = 2;

/// Render error - staging the bundle failed
pub const RENDER_ERROR: i32 = 3;

/// Config error - invalid or missing chartstage.yaml
pub const CONFIG_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Release error - install, upgrade or uninstall reported failure
pub const RELEASE_ERROR: i32 = 6;

/// Usage error - invalid arguments or options (following sysexits.h convention)
pub const USAGE_ERROR: i32 = 64;
