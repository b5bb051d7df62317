//! Shell assembly: options, on-disk configuration, builder and runner.

// ============================================================================
// Submodules
// ============================================================================

mod builder;
mod config;
mod core;
mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ShellBuilder;
pub use config::{CONFIG_FILE_NAME, DEFAULT_USER_DATA, ShellConfig, resolve_address};
pub use core::Shell;
pub use options::{DEFAULT_WINDOW_TITLE, ShellOptions};
