//! Tab record and its lifecycle state.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::identifiers::TabId;
use crate::view::{ContentControl, RenderingSurface};

// ============================================================================
// Constants
// ============================================================================

/// Display name used when a document has no title.
pub const UNTITLED: &str = "Untitled";

// ============================================================================
// TabMode
// ============================================================================

/// Whether a tab's view is rendered for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabMode {
    /// Rendered and interactive.
    #[default]
    Headful,
    /// Loaded but not displayed.
    Headless,
}

impl TabMode {
    /// Returns the wire name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Headful => "headful",
            Self::Headless => "headless",
        }
    }
}

// ============================================================================
// ViewHandles
// ============================================================================

/// The two handles a tab owns exclusively.
#[derive(Clone)]
pub struct ViewHandles {
    /// Rendering surface.
    pub surface: Arc<dyn RenderingSurface>,
    /// Content control.
    pub control: Arc<dyn ContentControl>,
}

impl fmt::Debug for ViewHandles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewHandles")
            .field("tab_id", &self.surface.tab_id())
            .field("destroyed", &self.surface.is_destroyed())
            .finish()
    }
}

// ============================================================================
// TabState
// ============================================================================

/// Lifecycle state. Handles only exist in the live variants.
#[derive(Debug)]
pub enum TabState {
    /// Initial content is still resolving.
    Loading(ViewHandles),
    /// Initial content resolved, never shown.
    Ready(ViewHandles),
    /// Surface has been bound to the host window at least once.
    Attached(ViewHandles),
    /// Handles released.
    Closed,
}

/// Handle-free view of [`TabState`] for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabPhase {
    /// See [`TabState::Loading`].
    Loading,
    /// See [`TabState::Ready`].
    Ready,
    /// See [`TabState::Attached`].
    Attached,
    /// See [`TabState::Closed`].
    Closed,
}

impl TabState {
    /// Returns the phase without the handles.
    #[must_use]
    pub fn phase(&self) -> TabPhase {
        match self {
            Self::Loading(_) => TabPhase::Loading,
            Self::Ready(_) => TabPhase::Ready,
            Self::Attached(_) => TabPhase::Attached,
            Self::Closed => TabPhase::Closed,
        }
    }

    /// Returns the handles unless closed.
    #[must_use]
    pub fn handles(&self) -> Option<&ViewHandles> {
        match self {
            Self::Loading(h) | Self::Ready(h) | Self::Attached(h) => Some(h),
            Self::Closed => None,
        }
    }
}

// ============================================================================
// Tab
// ============================================================================

/// A registered tab.
pub struct Tab {
    id: TabId,
    mode: TabMode,
    name: String,
    state: TabState,
    /// Task forwarding title notifications; aborted on close.
    title_listener: Option<JoinHandle<()>>,
}

impl fmt::Debug for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tab")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("name", &self.name)
            .field("phase", &self.state.phase())
            .finish_non_exhaustive()
    }
}

impl Tab {
    /// Creates a tab whose initial content is still loading.
    #[must_use]
    pub fn loading(id: TabId, mode: TabMode, handles: ViewHandles) -> Self {
        Self {
            id,
            mode,
            name: UNTITLED.to_string(),
            state: TabState::Loading(handles),
            title_listener: None,
        }
    }

    /// Returns the tab ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> TabId {
        self.id
    }

    /// Returns the mode.
    #[inline]
    #[must_use]
    pub fn mode(&self) -> TabMode {
        self.mode
    }

    /// Returns the display name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the lifecycle phase.
    #[inline]
    #[must_use]
    pub fn phase(&self) -> TabPhase {
        self.state.phase()
    }

    /// Returns the handles unless closed.
    #[inline]
    #[must_use]
    pub fn handles(&self) -> Option<&ViewHandles> {
        self.state.handles()
    }

    /// Updates the display name from a document title.
    pub fn set_title(&mut self, title: &str) {
        self.name = display_name(title);
    }

    /// `Loading → Ready`. Other states are left untouched.
    pub fn mark_ready(&mut self, title: &str) {
        self.set_title(title);
        self.state = match std::mem::replace(&mut self.state, TabState::Closed) {
            TabState::Loading(h) => TabState::Ready(h),
            other => other,
        };
    }

    /// `Ready → Attached`. Re-attaching an attached tab keeps its state.
    pub fn mark_attached(&mut self) {
        self.state = match std::mem::replace(&mut self.state, TabState::Closed) {
            TabState::Ready(h) | TabState::Loading(h) => TabState::Attached(h),
            other => other,
        };
    }

    /// Stores the title listener task.
    pub(crate) fn set_title_listener(&mut self, handle: JoinHandle<()>) {
        if let Some(previous) = self.title_listener.replace(handle) {
            previous.abort();
        }
    }

    /// Moves to `Closed`, handing back the handles for release.
    pub fn close(&mut self) -> Option<ViewHandles> {
        if let Some(listener) = self.title_listener.take() {
            listener.abort();
        }
        match std::mem::replace(&mut self.state, TabState::Closed) {
            TabState::Loading(h) | TabState::Ready(h) | TabState::Attached(h) => Some(h),
            TabState::Closed => None,
        }
    }
}

impl Drop for Tab {
    fn drop(&mut self) {
        if let Some(listener) = self.title_listener.take() {
            listener.abort();
        }
    }
}

/// Maps a document title to a display name.
#[must_use]
pub fn display_name(title: &str) -> String {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        UNTITLED.to_string()
    } else {
        trimmed.to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::view::memory::MemoryBackend;
    use crate::view::ViewFactory;

    async fn handles(backend: &MemoryBackend) -> (TabId, ViewHandles) {
        let id = TabId::generate();
        let pair = backend
            .create_view(id, TabMode::Headful)
            .await
            .expect("create view");
        (
            id,
            ViewHandles {
                surface: pair.surface,
                control: pair.control,
            },
        )
    }

    #[test]
    fn test_display_name_fallback() {
        assert_eq!(display_name(""), "Untitled");
        assert_eq!(display_name("   "), "Untitled");
        assert_eq!(display_name(" Docs "), "Docs");
    }

    #[test]
    fn test_mode_wire_names() {
        assert_eq!(TabMode::default(), TabMode::Headful);
        assert_eq!(TabMode::Headless.as_str(), "headless");
        assert_eq!(
            serde_json::to_string(&TabMode::Headful).expect("serialize"),
            "\"headful\""
        );
    }

    #[tokio::test]
    async fn test_lifecycle_transitions() {
        let backend = MemoryBackend::new();
        let (id, h) = handles(&backend).await;

        let mut tab = Tab::loading(id, TabMode::Headful, h);
        assert_eq!(tab.phase(), TabPhase::Loading);
        assert_eq!(tab.name(), UNTITLED);

        tab.mark_ready("Start");
        assert_eq!(tab.phase(), TabPhase::Ready);
        assert_eq!(tab.name(), "Start");

        tab.mark_attached();
        assert_eq!(tab.phase(), TabPhase::Attached);
        tab.mark_attached();
        assert_eq!(tab.phase(), TabPhase::Attached);

        let released = tab.close();
        assert!(released.is_some());
        assert_eq!(tab.phase(), TabPhase::Closed);
        assert!(tab.handles().is_none());
        assert!(tab.close().is_none());
    }

    #[tokio::test]
    async fn test_closed_tab_stays_closed() {
        let backend = MemoryBackend::new();
        let (id, h) = handles(&backend).await;

        let mut tab = Tab::loading(id, TabMode::Headless, h);
        tab.close();
        tab.mark_ready("late");
        tab.mark_attached();
        assert_eq!(tab.phase(), TabPhase::Closed);
    }
}
