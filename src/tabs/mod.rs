//! Tab lifecycle: registry, view binding, cloning and menu projection.
//!
//! | Type | Role |
//! |------|------|
//! | [`TabManager`] | Entry point; owns the registry and drives the others |
//! | [`TabRegistry`] | Insertion-ordered tabs plus the active pointer |
//! | [`ViewHost`] | Binds exactly one surface to the host window |
//! | [`StateCloner`] | Reproduces a view from a DOM snapshot |
//! | [`MenuProjector`] | Builds the menu bar from a registry snapshot |

// ============================================================================
// Submodules
// ============================================================================

mod cloner;
mod manager;
mod menu;
mod registry;
mod tab;
mod view_host;

// ============================================================================
// Re-exports
// ============================================================================

pub use cloner::{DocumentSnapshot, StateCloner};
pub use manager::{CloneStrategy, ShellEvent, TabManager};
pub use menu::{
    ACTIVE_MARKER, EMPTY_PLACEHOLDER, MenuAction, MenuItem, MenuModel, MenuProjector,
    TabMenuEntry,
};
pub use registry::{RegistrySnapshot, TabRegistry, TabSummary};
pub use tab::{Tab, TabMode, TabPhase, TabState, UNTITLED, ViewHandles, display_name};
pub use view_host::{Insets, ViewHost, content_bounds};
