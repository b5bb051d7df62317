//! Collaborator seams: host window, rendering surfaces and content controls.
//!
//! The tab core never talks to a renderer directly. Backends implement the
//! traits in this module:
//!
//! | Trait | Role |
//! |-------|------|
//! | [`HostWindow`] | The single top-level window; shows at most one surface |
//! | [`RenderingSurface`] | An isolated view that can be bound to the window |
//! | [`ContentControl`] | Navigation, history and script access for a view |
//! | [`ViewFactory`] | Allocates a surface + control pair for a new tab |
//!
//! Two backends ship with the crate: [`memory`] (in-process, used by tests
//! and benches) and [`crate::remote`] (renderer host over WebSocket).

// ============================================================================
// Submodules
// ============================================================================

/// In-process backend with scripted resources.
pub mod memory;

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::identifiers::TabId;
use crate::tabs::{MenuModel, TabMode};

// ============================================================================
// Constants
// ============================================================================

/// Address of the empty document used as a clone target.
///
/// Navigating here never fetches anything.
pub const BLANK_ADDRESS: &str = "about:blank";

/// Serializes the current document, doctype included.
pub(crate) const SERIALIZE_DOCUMENT_SCRIPT: &str = "return (document.doctype \
    ? new XMLSerializer().serializeToString(document.doctype) : '') \
    + document.documentElement.outerHTML";

// ============================================================================
// Geometry
// ============================================================================

/// Surface bounds in window content coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Which dimensions follow window resizes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoResize {
    /// Track window width.
    pub width: bool,
    /// Track window height.
    pub height: bool,
}

impl AutoResize {
    /// Tracks both dimensions.
    pub const BOTH: Self = Self {
        width: true,
        height: true,
    };
}

// ============================================================================
// Events
// ============================================================================

/// Notification emitted by a content control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentEvent {
    /// The document title changed.
    TitleChanged(String),
}

// ============================================================================
// ViewPair
// ============================================================================

/// A freshly created view: its surface, its control, and its event stream.
pub struct ViewPair {
    /// Rendering surface bound to the host window on attach.
    pub surface: Arc<dyn RenderingSurface>,
    /// Navigation and script handle.
    pub control: Arc<dyn ContentControl>,
    /// Title notifications. Closes when the view is destroyed.
    pub events: mpsc::UnboundedReceiver<ContentEvent>,
}

impl std::fmt::Debug for ViewPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewPair")
            .field("tab_id", &self.surface.tab_id())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Traits
// ============================================================================

/// The single top-level window.
///
/// All calls are synchronous from the shell's point of view.
pub trait HostWindow: Send + Sync {
    /// Current content area size as `(width, height)`.
    fn content_size(&self) -> (u32, u32);

    /// Binds a surface to the content area.
    fn add_view(&self, surface: &dyn RenderingSurface);

    /// Unbinds a surface without destroying it.
    fn remove_view(&self, surface: &dyn RenderingSurface);

    /// Sets the window title.
    fn set_title(&self, title: &str);

    /// Installs the application menu.
    fn set_menu(&self, menu: &MenuModel);
}

/// An isolated rendering area.
pub trait RenderingSurface: Send + Sync {
    /// Tab owning this surface.
    fn tab_id(&self) -> TabId;

    /// Positions the surface in the window content area.
    fn set_bounds(&self, bounds: Bounds);

    /// Enables continuous tracking of window resizes.
    fn set_auto_resize(&self, auto_resize: AutoResize);

    /// Releases the surface and its renderer.
    fn destroy(&self);

    /// Returns `true` once [`destroy`](Self::destroy) has run.
    fn is_destroyed(&self) -> bool;
}

/// Navigation, history and script access for one view.
#[async_trait]
pub trait ContentControl: Send + Sync {
    /// Navigates and resolves once the load settles.
    async fn load_url(&self, url: &str) -> Result<()>;

    /// Current address.
    async fn url(&self) -> Result<String>;

    /// Current document title.
    async fn title(&self) -> Result<String>;

    /// Returns `true` if there is a previous history entry.
    async fn can_go_back(&self) -> Result<bool>;

    /// Moves back one history entry.
    async fn go_back(&self) -> Result<()>;

    /// Returns `true` if there is a next history entry.
    async fn can_go_forward(&self) -> Result<bool>;

    /// Moves forward one history entry.
    async fn go_forward(&self) -> Result<()>;

    /// Runs a script in the page and returns its value.
    async fn execute_script(&self, script: &str) -> Result<Value>;

    /// Static serialization of the rendered document.
    async fn serialized_markup(&self) -> Result<String> {
        let value = self.execute_script(SERIALIZE_DOCUMENT_SCRIPT).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| Error::script("document serialization returned no markup"))
    }

    /// Replaces the document with `markup` through a document stream.
    async fn write_document(&self, markup: &str) -> Result<()> {
        self.execute_script(&document_replace_script(markup)).await?;
        Ok(())
    }

    /// Rewrites the current history entry to `url` without reloading.
    async fn replace_history_entry(&self, url: &str) -> Result<()> {
        let script = format!("history.replaceState(history.state, '', {});", json_string(url));
        self.execute_script(&script).await?;
        Ok(())
    }
}

/// Allocates views for new tabs.
#[async_trait]
pub trait ViewFactory: Send + Sync {
    /// Creates a surface + control pair owned by `tab_id`.
    async fn create_view(&self, tab_id: TabId, mode: TabMode) -> Result<ViewPair>;
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Builds the open/write/close script that swaps in `markup`.
#[must_use]
pub fn document_replace_script(markup: &str) -> String {
    format!(
        "document.open(); document.write({}); document.close();",
        json_string(markup)
    )
}

/// Escapes a string as a JavaScript literal.
pub(crate) fn json_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{}\"", s))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_replace_script_escapes_markup() {
        let script = document_replace_script("<p class=\"a\">it's</p>\n");
        assert_eq!(
            script,
            r#"document.open(); document.write("<p class=\"a\">it's</p>\n"); document.close();"#
        );
    }

    #[test]
    fn test_auto_resize_both() {
        assert!(AutoResize::BOTH.width && AutoResize::BOTH.height);
        assert_eq!(AutoResize::default(), AutoResize { width: false, height: false });
    }

    #[test]
    fn test_bounds_serialization() {
        let bounds = Bounds { x: 0, y: 40, width: 800, height: 560 };
        let json = serde_json::to_value(bounds).expect("serialize");
        assert_eq!(json["y"], 40);
        assert_eq!(json["width"], 800);
    }
}
