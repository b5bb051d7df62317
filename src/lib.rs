//! Tab Shell - multi-tab browsing shell core.
//!
//! Manages the tabs of a single-window browser: each tab owns an isolated
//! rendering view, exactly one view is bound to the window at a time, and
//! tabs can be duplicated either by reloading their address or by cloning
//! the live DOM without touching the network.
//!
//! # Architecture
//!
//! The shell follows a client-server model:
//!
//! - **Local End (Rust)**: Owns tab state, builds menus, decides which view
//!   is shown
//! - **Remote End (renderer host)**: Owns the native window and the web
//!   views, executes commands, emits title and menu events
//!
//! The tab core only sees the collaborator traits in [`view`], so it runs
//! just as well against the in-process [`view::memory`] backend.
//!
//! # Quick Start
//!
//! ```no_run
//! use tab_shell::{Result, Shell};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let shell = Shell::builder()
//!         .config_file("./config.json")
//!         .home_address("https://example.com/")
//!         .bind()
//!         .await?;
//!
//!     println!("renderer host should connect to {}", shell.ws_url());
//!     shell.run().await
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`tabs`] | [`TabManager`], registry, view host, cloner, menu |
//! | [`view`] | Collaborator traits and the in-memory backend |
//! | [`remote`] | Renderer host backend over WebSocket |
//! | [`shell`] | Options, configuration file, builder, runner |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | WebSocket message types |
//! | [`transport`] | WebSocket server and connection |

// ============================================================================
// Modules
// ============================================================================

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// WebSocket protocol message types.
pub mod protocol;

/// Renderer host backend.
pub mod remote;

/// Shell assembly and runner.
pub mod shell;

/// Tab lifecycle.
///
/// - [`TabManager`] - Creates, switches, duplicates and closes tabs
/// - [`MenuProjector`] - Derives the menu from registry state
pub mod tabs;

/// WebSocket transport layer.
pub mod transport;

/// Collaborator seams and the in-memory backend.
pub mod view;

// ============================================================================
// Re-exports
// ============================================================================

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{RequestId, TabId};

// Tab types
pub use tabs::{
    CloneStrategy, MenuAction, MenuModel, MenuProjector, RegistrySnapshot, ShellEvent,
    TabManager, TabMode, TabPhase, TabSummary,
};

// Shell types
pub use shell::{Shell, ShellBuilder, ShellConfig, ShellOptions};

// Backend types
pub use remote::{HostSignal, RemoteHost};
pub use view::{ContentControl, HostWindow, RenderingSurface, ViewFactory};
