//! Binding of the displayed surface to the host window.
//!
//! Exactly one surface may be bound at a time and [`ViewHost`] is the only
//! code that changes that binding.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::identifiers::TabId;
use crate::view::{AutoResize, Bounds, HostWindow, RenderingSurface};

// ============================================================================
// Insets
// ============================================================================

/// Chrome region reserved around the content area.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insets {
    /// Reserved rows at the top (tab strip, toolbar).
    pub top: u32,
    /// Reserved columns on the right.
    pub right: u32,
    /// Reserved rows at the bottom (status bar).
    pub bottom: u32,
    /// Reserved columns on the left.
    pub left: u32,
}

impl Insets {
    /// No reserved chrome.
    pub const NONE: Self = Self {
        top: 0,
        right: 0,
        bottom: 0,
        left: 0,
    };

    /// Reserves a strip at the top only.
    #[inline]
    #[must_use]
    pub const fn top(top: u32) -> Self {
        Self {
            top,
            right: 0,
            bottom: 0,
            left: 0,
        }
    }
}

/// Bounds of the content area minus `insets`, clamped at zero size.
#[must_use]
pub fn content_bounds((width, height): (u32, u32), insets: Insets) -> Bounds {
    Bounds {
        x: i32::try_from(insets.left).unwrap_or(i32::MAX),
        y: i32::try_from(insets.top).unwrap_or(i32::MAX),
        width: width.saturating_sub(insets.left.saturating_add(insets.right)),
        height: height.saturating_sub(insets.top.saturating_add(insets.bottom)),
    }
}

// ============================================================================
// ViewHost
// ============================================================================

struct Attachment {
    tab_id: TabId,
    surface: Arc<dyn RenderingSurface>,
}

/// Keeps one surface bound to the host window and sized to it.
pub struct ViewHost {
    window: Arc<dyn HostWindow>,
    insets: Insets,
    attached: Mutex<Option<Attachment>>,
}

impl fmt::Debug for ViewHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewHost")
            .field("insets", &self.insets)
            .field("attached", &self.attached_tab())
            .finish_non_exhaustive()
    }
}

impl ViewHost {
    /// Creates a host with nothing attached.
    #[must_use]
    pub fn new(window: Arc<dyn HostWindow>, insets: Insets) -> Self {
        Self {
            window,
            insets,
            attached: Mutex::new(None),
        }
    }

    /// Binds `surface`, unbinding the previous one without destroying it.
    ///
    /// The surface is sized to the content area and then follows window
    /// resizes on its own until the next attach.
    pub fn attach(&self, tab_id: TabId, surface: Arc<dyn RenderingSurface>) {
        let mut slot = self.attached.lock();
        if let Some(previous) = slot.take() {
            self.window.remove_view(previous.surface.as_ref());
        }

        self.window.add_view(surface.as_ref());
        let bounds = self.content_bounds();
        surface.set_bounds(bounds);
        surface.set_auto_resize(AutoResize::BOTH);

        debug!(tab_id = %tab_id, width = bounds.width, height = bounds.height, "Surface attached");
        *slot = Some(Attachment { tab_id, surface });
    }

    /// Unbinds the current surface without destroying it.
    pub fn detach(&self) -> Option<TabId> {
        let previous = self.attached.lock().take()?;
        self.window.remove_view(previous.surface.as_ref());
        debug!(tab_id = %previous.tab_id, "Surface detached");
        Some(previous.tab_id)
    }

    /// Unbinds the current surface and destroys it.
    pub fn detach_and_destroy(&self) -> Option<TabId> {
        let previous = self.attached.lock().take()?;
        self.window.remove_view(previous.surface.as_ref());
        previous.surface.destroy();
        debug!(tab_id = %previous.tab_id, "Surface detached and destroyed");
        Some(previous.tab_id)
    }

    /// Returns the tab whose surface is bound.
    #[must_use]
    pub fn attached_tab(&self) -> Option<TabId> {
        self.attached.lock().as_ref().map(|a| a.tab_id)
    }

    /// Current content bounds for an attached surface.
    #[must_use]
    pub fn content_bounds(&self) -> Bounds {
        content_bounds(self.window.content_size(), self.insets)
    }

    /// Returns the window this host binds into.
    #[inline]
    #[must_use]
    pub fn window(&self) -> &Arc<dyn HostWindow> {
        &self.window
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::tabs::TabMode;
    use crate::view::memory::{MemoryBackend, MemoryWindow};
    use crate::view::ViewFactory;

    async fn surface(backend: &MemoryBackend) -> (TabId, Arc<dyn RenderingSurface>) {
        let id = TabId::generate();
        let pair = backend
            .create_view(id, TabMode::Headful)
            .await
            .expect("create view");
        (id, pair.surface)
    }

    #[test]
    fn test_content_bounds_subtracts_insets() {
        let bounds = content_bounds((1200, 800), Insets { top: 40, right: 0, bottom: 20, left: 10 });
        assert_eq!(bounds, Bounds { x: 10, y: 40, width: 1190, height: 740 });
    }

    #[test]
    fn test_content_bounds_saturates() {
        let bounds = content_bounds((30, 30), Insets::top(100));
        assert_eq!(bounds.height, 0);
        assert_eq!(bounds.width, 30);
    }

    #[test]
    fn test_content_bounds_origin_clamps_huge_insets() {
        let insets = Insets {
            top: u32::MAX,
            right: 0,
            bottom: 0,
            left: u32::MAX - 1,
        };
        let bounds = content_bounds((800, 600), insets);
        assert_eq!(bounds.x, i32::MAX);
        assert_eq!(bounds.y, i32::MAX);
        assert_eq!((bounds.width, bounds.height), (0, 0));
    }

    #[tokio::test]
    async fn test_attach_binds_and_sizes() {
        let window = Arc::new(MemoryWindow::new(1200, 800));
        let backend = MemoryBackend::with_window(Arc::clone(&window));
        let host = ViewHost::new(window.clone(), Insets::top(30));

        let (id, surface) = surface(&backend).await;
        host.attach(id, surface);

        assert_eq!(host.attached_tab(), Some(id));
        assert_eq!(window.attached(), vec![id]);
        let view = backend.view(id).expect("view");
        assert_eq!(view.bounds(), Bounds { x: 0, y: 30, width: 1200, height: 770 });
        assert_eq!(view.auto_resize(), AutoResize::BOTH);
    }

    #[tokio::test]
    async fn test_attach_replaces_without_destroying() {
        let window = Arc::new(MemoryWindow::new(800, 600));
        let backend = MemoryBackend::with_window(Arc::clone(&window));
        let host = ViewHost::new(window.clone(), Insets::NONE);

        let (first, s1) = surface(&backend).await;
        let (second, s2) = surface(&backend).await;
        host.attach(first, s1);
        host.attach(second, s2);

        assert_eq!(window.attached(), vec![second]);
        assert!(!backend.view(first).expect("view").is_destroyed());
    }

    #[tokio::test]
    async fn test_detach_variants() {
        let window = Arc::new(MemoryWindow::new(800, 600));
        let backend = MemoryBackend::with_window(Arc::clone(&window));
        let host = ViewHost::new(window.clone(), Insets::NONE);

        let (id, s) = surface(&backend).await;
        host.attach(id, Arc::clone(&s));
        assert_eq!(host.detach(), Some(id));
        assert!(window.attached().is_empty());
        assert!(!s.is_destroyed());
        assert_eq!(host.detach(), None);

        host.attach(id, Arc::clone(&s));
        assert_eq!(host.detach_and_destroy(), Some(id));
        assert!(window.attached().is_empty());
        assert!(s.is_destroyed());
    }
}
