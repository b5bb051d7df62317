//! In-process backend.
//!
//! Documents come from a table of scripted resources instead of the network.
//! Every navigation to a non-blank address is recorded, so callers can tell
//! a refetch from a snapshot clone. Loads can be made to succeed, wait, fail
//! or never settle per address with [`LoadBehavior`].
//!
//! Views never evaluate scripts. Document serialization, document writes and
//! history rewrites operate on the stored markup directly, and titles are
//! read from the markup's `<title>` element.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use regex::Regex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::trace;

use crate::error::{Error, Result};
use crate::identifiers::TabId;
use crate::tabs::{MenuModel, TabMode};

use super::{
    AutoResize, BLANK_ADDRESS, Bounds, ContentControl, ContentEvent, HostWindow, RenderingSurface,
    ViewFactory, ViewPair,
};

// ============================================================================
// Constants
// ============================================================================

/// Default content area of [`MemoryBackend::new`].
const DEFAULT_SIZE: (u32, u32) = (1280, 800);

/// Markup of [`BLANK_ADDRESS`].
const BLANK_MARKUP: &str = "<html><head></head><body></body></html>";

static TITLE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid title pattern"));

// ============================================================================
// LoadBehavior
// ============================================================================

/// How navigations to one address settle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LoadBehavior {
    /// Resolve right away.
    #[default]
    Immediate,
    /// Resolve after a delay.
    Delay(Duration),
    /// Fail with the given message.
    Fail(String),
    /// Never settle.
    Hang,
}

// ============================================================================
// MemoryWindow
// ============================================================================

/// Host window that records what the shell asked of it.
#[derive(Debug)]
pub struct MemoryWindow {
    size: Mutex<(u32, u32)>,
    attached: Mutex<Vec<TabId>>,
    title: Mutex<String>,
    menu: Mutex<Option<MenuModel>>,
    menu_builds: AtomicUsize,
}

impl MemoryWindow {
    /// Creates a window with the given content size.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: Mutex::new((width, height)),
            attached: Mutex::new(Vec::new()),
            title: Mutex::new(String::new()),
            menu: Mutex::new(None),
            menu_builds: AtomicUsize::new(0),
        }
    }

    /// Tabs whose surfaces are currently bound, in bind order.
    #[must_use]
    pub fn attached(&self) -> Vec<TabId> {
        self.attached.lock().clone()
    }

    /// Last title set.
    #[must_use]
    pub fn title(&self) -> String {
        self.title.lock().clone()
    }

    /// Last installed menu.
    #[must_use]
    pub fn menu(&self) -> Option<MenuModel> {
        self.menu.lock().clone()
    }

    /// Number of menus installed so far.
    #[must_use]
    pub fn menu_builds(&self) -> usize {
        self.menu_builds.load(Ordering::Acquire)
    }

    /// Simulates a window resize.
    pub fn set_content_size(&self, width: u32, height: u32) {
        *self.size.lock() = (width, height);
    }
}

impl HostWindow for MemoryWindow {
    fn content_size(&self) -> (u32, u32) {
        *self.size.lock()
    }

    fn add_view(&self, surface: &dyn RenderingSurface) {
        let id = surface.tab_id();
        let mut attached = self.attached.lock();
        if !attached.contains(&id) {
            attached.push(id);
        }
    }

    fn remove_view(&self, surface: &dyn RenderingSurface) {
        let id = surface.tab_id();
        self.attached.lock().retain(|existing| *existing != id);
    }

    fn set_title(&self, title: &str) {
        *self.title.lock() = title.to_string();
    }

    fn set_menu(&self, menu: &MenuModel) {
        *self.menu.lock() = Some(menu.clone());
        self.menu_builds.fetch_add(1, Ordering::AcqRel);
    }
}

// ============================================================================
// MemoryBackend
// ============================================================================

#[derive(Debug, Default)]
struct Catalog {
    resources: FxHashMap<String, String>,
    behaviors: FxHashMap<String, LoadBehavior>,
    fetches: Vec<(TabId, String)>,
    views: FxHashMap<TabId, Arc<MemoryView>>,
    last_view: Option<TabId>,
}

/// View factory over scripted resources.
///
/// Views and fetch records are kept after a view is destroyed so tests can
/// inspect them. Long-lived backends call [`MemoryBackend::prune_destroyed`].
#[derive(Debug)]
pub struct MemoryBackend {
    window: Arc<MemoryWindow>,
    catalog: Arc<Mutex<Catalog>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Creates a backend with its own default-sized window.
    #[must_use]
    pub fn new() -> Self {
        Self::with_window(Arc::new(MemoryWindow::new(DEFAULT_SIZE.0, DEFAULT_SIZE.1)))
    }

    /// Creates a backend bound to `window`.
    #[must_use]
    pub fn with_window(window: Arc<MemoryWindow>) -> Self {
        Self {
            window,
            catalog: Arc::new(Mutex::new(Catalog::default())),
        }
    }

    /// Returns the window.
    #[must_use]
    pub fn window(&self) -> Arc<MemoryWindow> {
        Arc::clone(&self.window)
    }

    /// Serves `markup` at `address`.
    pub fn add_resource(&self, address: impl Into<String>, markup: impl Into<String>) {
        self.catalog
            .lock()
            .resources
            .insert(address.into(), markup.into());
    }

    /// Sets how navigations to `address` settle.
    pub fn set_behavior(&self, address: impl Into<String>, behavior: LoadBehavior) {
        self.catalog
            .lock()
            .behaviors
            .insert(address.into(), behavior);
    }

    /// Number of fetches of `address` across all views.
    #[must_use]
    pub fn fetch_count(&self, address: &str) -> usize {
        self.catalog
            .lock()
            .fetches
            .iter()
            .filter(|(_, fetched)| fetched == address)
            .count()
    }

    /// Addresses fetched by one view, in order.
    #[must_use]
    pub fn fetches_for(&self, tab_id: TabId) -> Vec<String> {
        self.catalog
            .lock()
            .fetches
            .iter()
            .filter(|(owner, _)| *owner == tab_id)
            .map(|(_, address)| address.clone())
            .collect()
    }

    /// View created for `tab_id`.
    #[must_use]
    pub fn view(&self, tab_id: TabId) -> Option<Arc<MemoryView>> {
        self.catalog.lock().views.get(&tab_id).cloned()
    }

    /// Most recently created view.
    #[must_use]
    pub fn last_view(&self) -> Option<Arc<MemoryView>> {
        let catalog = self.catalog.lock();
        catalog.last_view.and_then(|id| catalog.views.get(&id).cloned())
    }

    /// Drops destroyed views and their fetch records. Returns how many views
    /// were removed.
    pub fn prune_destroyed(&self) -> usize {
        let mut catalog = self.catalog.lock();
        let before = catalog.views.len();
        catalog.views.retain(|_, view| !view.is_destroyed());

        let Catalog { fetches, views, last_view, .. } = &mut *catalog;
        fetches.retain(|(owner, _)| views.contains_key(owner));
        if last_view.is_some_and(|id| !views.contains_key(&id)) {
            *last_view = None;
        }
        before - views.len()
    }
}

#[async_trait]
impl ViewFactory for MemoryBackend {
    async fn create_view(&self, tab_id: TabId, mode: TabMode) -> Result<ViewPair> {
        let (tx, rx) = mpsc::unbounded_channel();
        let view = Arc::new(MemoryView {
            tab_id,
            mode,
            catalog: Arc::clone(&self.catalog),
            page: Mutex::new(History::default()),
            bounds: Mutex::new(Bounds::default()),
            auto_resize: Mutex::new(AutoResize::default()),
            destroyed: AtomicBool::new(false),
            events: tx,
        });

        {
            let mut catalog = self.catalog.lock();
            catalog.views.insert(tab_id, Arc::clone(&view));
            catalog.last_view = Some(tab_id);
        }
        trace!(tab_id = %tab_id, mode = mode.as_str(), "Memory view created");

        Ok(ViewPair {
            surface: view.clone(),
            control: view,
            events: rx,
        })
    }
}

// ============================================================================
// MemoryView
// ============================================================================

#[derive(Debug, Clone)]
struct Entry {
    address: String,
    markup: String,
}

#[derive(Debug, Default)]
struct History {
    entries: Vec<Entry>,
    index: usize,
}

impl History {
    fn current(&self) -> Option<&Entry> {
        self.entries.get(self.index)
    }

    fn current_mut(&mut self) -> Option<&mut Entry> {
        self.entries.get_mut(self.index)
    }

    fn push(&mut self, entry: Entry) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.index + 1);
        }
        self.entries.push(entry);
        self.index = self.entries.len() - 1;
    }
}

/// Surface and control of one in-memory view.
pub struct MemoryView {
    tab_id: TabId,
    mode: TabMode,
    catalog: Arc<Mutex<Catalog>>,
    page: Mutex<History>,
    bounds: Mutex<Bounds>,
    auto_resize: Mutex<AutoResize>,
    destroyed: AtomicBool,
    events: mpsc::UnboundedSender<ContentEvent>,
}

impl std::fmt::Debug for MemoryView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryView")
            .field("tab_id", &self.tab_id)
            .field("mode", &self.mode)
            .field("destroyed", &self.destroyed.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl MemoryView {
    /// Mode the view was created with.
    #[must_use]
    pub fn mode(&self) -> TabMode {
        self.mode
    }

    /// Last bounds set.
    #[must_use]
    pub fn bounds(&self) -> Bounds {
        *self.bounds.lock()
    }

    /// Last auto-resize setting.
    #[must_use]
    pub fn auto_resize(&self) -> AutoResize {
        *self.auto_resize.lock()
    }

    /// Returns `true` once destroyed.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    /// Current markup.
    #[must_use]
    pub fn markup(&self) -> String {
        self.page
            .lock()
            .current()
            .map_or_else(|| BLANK_MARKUP.to_string(), |e| e.markup.clone())
    }

    /// Replaces the current markup in place, like edits made by a user.
    pub fn mutate_document(&self, markup: &str) {
        if let Some(entry) = self.page.lock().current_mut() {
            entry.markup = markup.to_string();
        }
    }

    /// Emits a title notification.
    pub fn emit_title(&self, title: &str) {
        let _ = self
            .events
            .send(ContentEvent::TitleChanged(title.to_string()));
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.is_destroyed() {
            return Err(Error::view_destroyed(self.tab_id));
        }
        Ok(())
    }

    async fn settle(&self, address: &str) -> Result<()> {
        let behavior = self
            .catalog
            .lock()
            .behaviors
            .get(address)
            .cloned()
            .unwrap_or_default();

        match behavior {
            LoadBehavior::Immediate => Ok(()),
            LoadBehavior::Delay(delay) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
            LoadBehavior::Fail(message) => Err(Error::load(address, message)),
            LoadBehavior::Hang => std::future::pending().await,
        }
    }
}

impl RenderingSurface for MemoryView {
    fn tab_id(&self) -> TabId {
        self.tab_id
    }

    fn set_bounds(&self, bounds: Bounds) {
        *self.bounds.lock() = bounds;
    }

    fn set_auto_resize(&self, auto_resize: AutoResize) {
        *self.auto_resize.lock() = auto_resize;
    }

    fn destroy(&self) {
        self.destroyed.store(true, Ordering::Release);
        trace!(tab_id = %self.tab_id, "Memory view destroyed");
    }

    fn is_destroyed(&self) -> bool {
        MemoryView::is_destroyed(self)
    }
}

#[async_trait]
impl ContentControl for MemoryView {
    async fn load_url(&self, url: &str) -> Result<()> {
        self.ensure_alive()?;
        self.settle(url).await?;
        self.ensure_alive()?;

        let markup = if url == BLANK_ADDRESS {
            BLANK_MARKUP.to_string()
        } else {
            let mut catalog = self.catalog.lock();
            let markup = catalog
                .resources
                .get(url)
                .cloned()
                .ok_or_else(|| Error::load(url, "resource not found"))?;
            catalog.fetches.push((self.tab_id, url.to_string()));
            markup
        };

        self.page.lock().push(Entry {
            address: url.to_string(),
            markup,
        });
        Ok(())
    }

    async fn url(&self) -> Result<String> {
        self.ensure_alive()?;
        Ok(self
            .page
            .lock()
            .current()
            .map_or_else(|| BLANK_ADDRESS.to_string(), |e| e.address.clone()))
    }

    async fn title(&self) -> Result<String> {
        self.ensure_alive()?;
        let markup = self.markup();
        Ok(TITLE_PATTERN
            .captures(&markup)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default())
    }

    async fn can_go_back(&self) -> Result<bool> {
        self.ensure_alive()?;
        Ok(self.page.lock().index > 0)
    }

    async fn go_back(&self) -> Result<()> {
        self.ensure_alive()?;
        let mut page = self.page.lock();
        page.index = page.index.saturating_sub(1);
        Ok(())
    }

    async fn can_go_forward(&self) -> Result<bool> {
        self.ensure_alive()?;
        let page = self.page.lock();
        Ok(page.index + 1 < page.entries.len())
    }

    async fn go_forward(&self) -> Result<()> {
        self.ensure_alive()?;
        let mut page = self.page.lock();
        if page.index + 1 < page.entries.len() {
            page.index += 1;
        }
        Ok(())
    }

    async fn execute_script(&self, _script: &str) -> Result<Value> {
        Err(Error::script("memory views do not evaluate scripts"))
    }

    async fn serialized_markup(&self) -> Result<String> {
        self.ensure_alive()?;
        Ok(self.markup())
    }

    async fn write_document(&self, markup: &str) -> Result<()> {
        self.ensure_alive()?;
        self.mutate_document(markup);
        Ok(())
    }

    async fn replace_history_entry(&self, url: &str) -> Result<()> {
        self.ensure_alive()?;
        if let Some(entry) = self.page.lock().current_mut() {
            entry.address = url.to_string();
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fresh_view_is_blank() {
        let backend = MemoryBackend::new();
        let pair = backend
            .create_view(TabId::generate(), TabMode::Headful)
            .await
            .expect("create");

        assert_eq!(pair.control.url().await.expect("url"), BLANK_ADDRESS);
        assert_eq!(pair.control.title().await.expect("title"), "");
        assert!(!pair.control.can_go_back().await.expect("back"));
    }

    #[tokio::test]
    async fn test_load_records_fetch_and_title() {
        let backend = MemoryBackend::new();
        backend.add_resource("https://a.test/", "<title> Alpha </title>");
        let id = TabId::generate();
        let pair = backend.create_view(id, TabMode::Headless).await.expect("create");

        pair.control.load_url("https://a.test/").await.expect("load");
        pair.control.load_url(BLANK_ADDRESS).await.expect("blank");

        assert_eq!(backend.fetches_for(id), vec!["https://a.test/".to_string()]);
        assert_eq!(backend.fetch_count(BLANK_ADDRESS), 0);
        pair.control.go_back().await.expect("back");
        assert_eq!(pair.control.title().await.expect("title"), "Alpha");
        assert_eq!(backend.view(id).expect("view").mode(), TabMode::Headless);
    }

    #[tokio::test]
    async fn test_unknown_resource_fails() {
        let backend = MemoryBackend::new();
        let pair = backend
            .create_view(TabId::generate(), TabMode::Headful)
            .await
            .expect("create");

        let err = pair
            .control
            .load_url("https://missing.test/")
            .await
            .expect_err("not found");
        assert!(err.is_load_error());
    }

    #[tokio::test]
    async fn test_navigation_truncates_forward_history() {
        let backend = MemoryBackend::new();
        for address in ["https://1.test/", "https://2.test/", "https://3.test/"] {
            backend.add_resource(address, "<html></html>");
        }
        let pair = backend
            .create_view(TabId::generate(), TabMode::Headful)
            .await
            .expect("create");
        let control = pair.control;

        control.load_url("https://1.test/").await.expect("1");
        control.load_url("https://2.test/").await.expect("2");
        control.go_back().await.expect("back");
        control.load_url("https://3.test/").await.expect("3");

        assert!(!control.can_go_forward().await.expect("forward"));
        control.go_back().await.expect("back");
        assert_eq!(control.url().await.expect("url"), "https://1.test/");
    }

    #[tokio::test]
    async fn test_destroyed_view_rejects_calls() {
        let backend = MemoryBackend::new();
        let id = TabId::generate();
        let pair = backend.create_view(id, TabMode::Headful).await.expect("create");

        pair.surface.destroy();
        let err = pair.control.url().await.expect_err("destroyed");
        assert!(matches!(err, Error::ViewDestroyed { tab_id } if tab_id == id));
    }

    #[tokio::test]
    async fn test_prune_destroyed_drops_records() {
        let backend = MemoryBackend::new();
        backend.add_resource("https://a.test/", "<title>A</title>");

        let kept = TabId::generate();
        let kept_pair = backend.create_view(kept, TabMode::Headful).await.expect("create");
        kept_pair.control.load_url("https://a.test/").await.expect("load");

        let gone = TabId::generate();
        let gone_pair = backend.create_view(gone, TabMode::Headful).await.expect("create");
        gone_pair.control.load_url("https://a.test/").await.expect("load");
        gone_pair.surface.destroy();

        assert_eq!(backend.prune_destroyed(), 1);
        assert!(backend.view(gone).is_none());
        assert!(backend.fetches_for(gone).is_empty());
        assert!(backend.last_view().is_none());
        assert_eq!(backend.fetches_for(kept), vec!["https://a.test/".to_string()]);
        assert_eq!(backend.prune_destroyed(), 0);
    }

    #[tokio::test]
    async fn test_emit_title_reaches_event_stream() {
        let backend = MemoryBackend::new();
        let id = TabId::generate();
        let mut pair = backend.create_view(id, TabMode::Headful).await.expect("create");

        backend.view(id).expect("view").emit_title("Hello");
        assert_eq!(
            pair.events.recv().await,
            Some(ContentEvent::TitleChanged("Hello".to_string()))
        );
    }

    #[test]
    fn test_window_records_menu_and_title() {
        let window = MemoryWindow::new(640, 480);
        window.set_title("Shell");
        window.set_menu(&MenuModel::default());
        window.set_content_size(800, 600);

        assert_eq!(window.title(), "Shell");
        assert_eq!(window.menu_builds(), 1);
        assert_eq!(window.content_size(), (800, 600));
    }
}
