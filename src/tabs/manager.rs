//! Tab lifecycle controller.
//!
//! [`TabManager`] is the only writer of the tab registry. Every operation
//! follows the same shape: validate, mutate the registry and the view
//! binding under one lock, then rebuild the menu. Menu installs and window
//! title updates happen with the registry lock held, so concurrent actions
//! cannot leave a stale menu or title behind.
//!
//! # Ordering
//!
//! The initial load of a new tab is the only suspension point before it is
//! registered. Two overlapping [`TabManager::create_tab`] calls therefore
//! both register their tab, and whichever load settles last ends up active.
//! This is intentional; callers that need ordering must serialize the calls
//! themselves.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::TabId;
use crate::shell::ShellOptions;
use crate::view::{ContentControl, ContentEvent, HostWindow, ViewFactory, ViewPair};

use super::cloner::StateCloner;
use super::menu::{MenuAction, MenuProjector};
use super::registry::{RegistrySnapshot, TabRegistry, TabSummary};
use super::tab::{Tab, TabMode, ViewHandles, display_name};
use super::view_host::ViewHost;

// ============================================================================
// Constants
// ============================================================================

/// Buffered shell events per subscriber.
const EVENT_CAPACITY: usize = 64;

// ============================================================================
// Types
// ============================================================================

/// How [`TabManager::duplicate_tab`] reproduces the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloneStrategy {
    /// Static DOM snapshot, no network fetch.
    Full,
    /// Fresh navigation to the source address.
    Refetch,
}

/// Notifications broadcast by the manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellEvent {
    /// Registry or active pointer changed; the menu has been rebuilt.
    TabsChanged,
    /// A tab's document title changed.
    TitleChanged {
        /// Tab whose title changed.
        tab_id: TabId,
        /// New title as reported by the page.
        title: String,
    },
    /// A tab never became ready and was discarded.
    LoadFailed {
        /// Id that had been allocated to the tab.
        tab_id: TabId,
        /// Address that was loading.
        address: String,
        /// Failure description.
        message: String,
    },
}

/// Internal shared state for a manager.
pub(crate) struct ManagerInner {
    registry: Mutex<TabRegistry>,
    view_host: ViewHost,
    factory: Arc<dyn ViewFactory>,
    options: ShellOptions,
    events: broadcast::Sender<ShellEvent>,
}

// ============================================================================
// TabManager
// ============================================================================

/// Creates, switches, duplicates and closes tabs.
///
/// Cheap to clone; all clones drive the same registry.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
///
/// use tab_shell::view::memory::MemoryBackend;
/// use tab_shell::{CloneStrategy, ShellOptions, TabManager, TabMode};
///
/// # async fn example() -> tab_shell::Result<()> {
/// let backend = Arc::new(MemoryBackend::new());
/// backend.add_resource("https://example.com", "<title>Example</title>");
///
/// let manager = TabManager::new(backend.window(), backend.clone(), ShellOptions::new());
/// let first = manager.create_tab("https://example.com", TabMode::Headful).await?;
/// let copy = manager.duplicate_tab(CloneStrategy::Full).await?;
///
/// manager.switch_to_tab(first);
/// manager.remove_active_tab();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TabManager {
    pub(crate) inner: Arc<ManagerInner>,
}

impl fmt::Debug for TabManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.inner.registry.lock();
        f.debug_struct("TabManager")
            .field("tab_count", &registry.len())
            .field("active", &registry.active_id())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// TabManager - Constructor
// ============================================================================

impl TabManager {
    /// Creates a manager with an empty registry.
    ///
    /// Installs the initial (placeholder) menu right away.
    #[must_use]
    pub fn new(
        window: Arc<dyn HostWindow>,
        factory: Arc<dyn ViewFactory>,
        options: ShellOptions,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let manager = Self {
            inner: Arc::new(ManagerInner {
                registry: Mutex::new(TabRegistry::new()),
                view_host: ViewHost::new(window, options.chrome_insets),
                factory,
                options,
                events,
            }),
        };
        manager.refresh_menu();
        manager
    }

    fn from_weak(weak: &Weak<ManagerInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }
}

// ============================================================================
// TabManager - Accessors
// ============================================================================

impl TabManager {
    /// Subscribes to [`ShellEvent`]s.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ShellEvent> {
        self.inner.events.subscribe()
    }

    /// Returns the options this manager was built with.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &ShellOptions {
        &self.inner.options
    }

    /// Returns the active tab.
    #[must_use]
    pub fn active_tab(&self) -> Option<TabId> {
        self.inner.registry.lock().active_id()
    }

    /// Returns the tab whose surface is bound to the window.
    #[must_use]
    pub fn attached_tab(&self) -> Option<TabId> {
        self.inner.view_host.attached_tab()
    }

    /// Number of registered tabs.
    #[must_use]
    pub fn tab_count(&self) -> usize {
        self.inner.registry.lock().len()
    }

    /// Registered ids in insertion order.
    #[must_use]
    pub fn tab_ids(&self) -> Vec<TabId> {
        self.inner.registry.lock().ids_in_order().to_vec()
    }

    /// Summary of one tab.
    #[must_use]
    pub fn tab_info(&self, id: TabId) -> Option<TabSummary> {
        self.snapshot().tabs.into_iter().find(|t| t.id == id)
    }

    /// Immutable copy of the registry.
    #[must_use]
    pub fn snapshot(&self) -> RegistrySnapshot {
        self.inner.registry.lock().snapshot()
    }

    /// Content control of a registered tab.
    #[must_use]
    pub fn content_control(&self, id: TabId) -> Option<Arc<dyn ContentControl>> {
        let registry = self.inner.registry.lock();
        registry
            .get(id)
            .and_then(Tab::handles)
            .map(|h| Arc::clone(&h.control))
    }

    fn active_control(&self) -> Option<Arc<dyn ContentControl>> {
        let registry = self.inner.registry.lock();
        registry
            .active_id()
            .and_then(|id| registry.get(id))
            .and_then(Tab::handles)
            .map(|h| Arc::clone(&h.control))
    }
}

// ============================================================================
// TabManager - Lifecycle
// ============================================================================

impl TabManager {
    /// Opens a tab on `address`.
    ///
    /// The tab is registered, activated and attached only after its initial
    /// load settles. Without a configured load timeout a load that never
    /// settles leaves nothing registered, bounded only by the backend's own
    /// request limits.
    ///
    /// # Errors
    ///
    /// - [`Error::Load`] / [`Error::LoadTimeout`] if the initial load fails;
    ///   the view is destroyed and [`ShellEvent::LoadFailed`] is broadcast
    /// - any error from the view factory
    pub async fn create_tab(&self, address: &str, mode: TabMode) -> Result<TabId> {
        let id = TabId::generate();
        debug!(tab_id = %id, address = %address, mode = mode.as_str(), "Creating tab");

        let pair = self.inner.factory.create_view(id, mode).await?;

        if let Err(e) = self.await_initial_load(pair.control.as_ref(), address).await {
            pair.surface.destroy();
            return Err(self.load_failed(id, address, e));
        }

        let title = pair.control.title().await.unwrap_or_default();
        self.register(id, mode, pair, &title)?;

        info!(tab_id = %id, address = %address, "Tab opened");
        Ok(id)
    }

    /// Activates `id` and binds its surface.
    ///
    /// Returns `false` without side effects if `id` is unknown or already
    /// active.
    pub fn switch_to_tab(&self, id: TabId) -> bool {
        {
            let mut registry = self.inner.registry.lock();
            if !registry.contains(id) || registry.active_id() == Some(id) {
                debug!(tab_id = %id, "Switch ignored");
                return false;
            }
            if let Err(e) = self.activate_locked(&mut registry, id) {
                error!(tab_id = %id, error = %e, "Switch aborted");
                return false;
            }
        }

        debug!(tab_id = %id, "Switched tab");
        self.tabs_changed();
        true
    }

    /// Closes the active tab and activates the first remaining one.
    ///
    /// Returns `false` if there was no active tab.
    pub fn remove_active_tab(&self) -> bool {
        let closed = {
            let mut registry = self.inner.registry.lock();
            let Some(active) = registry.active_id() else {
                return false;
            };

            if self.inner.view_host.attached_tab() == Some(active) {
                self.inner.view_host.detach_and_destroy();
            }

            if let Some(mut tab) = registry.remove(active)
                && let Some(handles) = tab.close()
                && !handles.surface.is_destroyed()
            {
                handles.surface.destroy();
            }

            match registry.first_id() {
                Some(next) => {
                    if let Err(e) = self.activate_locked(&mut registry, next) {
                        error!(tab_id = %next, error = %e, "Failed to activate next tab");
                    }
                }
                None => {
                    self.inner.view_host.detach();
                    self.inner
                        .view_host
                        .window()
                        .set_title(&self.inner.options.window_title);
                }
            }
            active
        };

        info!(tab_id = %closed, "Tab closed");
        self.tabs_changed();
        true
    }

    /// Closes every tab.
    pub fn close_all_tabs(&self) {
        while self.remove_active_tab() {}
    }

    /// Duplicates the active tab.
    ///
    /// Returns `Ok(None)` if there is no active tab.
    ///
    /// # Errors
    ///
    /// Errors from reading the source view, and the same load errors as
    /// [`create_tab`](Self::create_tab).
    pub async fn duplicate_tab(&self, strategy: CloneStrategy) -> Result<Option<TabId>> {
        let source = {
            let registry = self.inner.registry.lock();
            registry
                .active_id()
                .and_then(|id| registry.get(id))
                .and_then(|tab| {
                    tab.handles()
                        .map(|h| (tab.id(), tab.mode(), Arc::clone(&h.control)))
                })
        };
        let Some((source_id, mode, control)) = source else {
            debug!("Duplicate ignored: no active tab");
            return Ok(None);
        };

        let id = match strategy {
            CloneStrategy::Refetch => {
                let address = control.url().await?;
                self.create_tab(&address, mode).await?
            }
            CloneStrategy::Full => self.clone_from_snapshot(control.as_ref(), mode).await?,
        };

        info!(source = %source_id, tab_id = %id, ?strategy, "Tab duplicated");
        Ok(Some(id))
    }

    async fn clone_from_snapshot(&self, source: &dyn ContentControl, mode: TabMode) -> Result<TabId> {
        let snapshot = StateCloner::capture(source).await?;
        let id = TabId::generate();

        let pair = match StateCloner::new(self.inner.factory.as_ref())
            .with_load_timeout(self.inner.options.load_timeout)
            .materialize(id, mode, &snapshot)
            .await
        {
            Ok(pair) => pair,
            Err(e) => return Err(self.load_failed(id, &snapshot.address, e)),
        };

        let title = pair.control.title().await.unwrap_or_default();
        self.register(id, mode, pair, &title)?;
        Ok(id)
    }
}

// ============================================================================
// TabManager - Navigation & Menu
// ============================================================================

impl TabManager {
    /// History back on the active tab, if possible.
    pub async fn go_back(&self) -> Result<bool> {
        let Some(control) = self.active_control() else {
            return Ok(false);
        };
        if !control.can_go_back().await? {
            return Ok(false);
        }
        control.go_back().await?;
        Ok(true)
    }

    /// History forward on the active tab, if possible.
    pub async fn go_forward(&self) -> Result<bool> {
        let Some(control) = self.active_control() else {
            return Ok(false);
        };
        if !control.can_go_forward().await? {
            return Ok(false);
        }
        control.go_forward().await?;
        Ok(true)
    }

    /// Rebuilds the menu from the current registry.
    pub fn refresh_menu(&self) {
        let registry = self.inner.registry.lock();
        self.install_menu_locked(&registry);
    }

    /// Runs a menu command.
    ///
    /// # Errors
    ///
    /// Propagates errors from the underlying operation.
    pub async fn dispatch(&self, action: MenuAction) -> Result<()> {
        debug!(?action, "Dispatching menu action");
        match action {
            MenuAction::NewTab => {
                let home = self.inner.options.home_address.clone();
                self.create_tab(&home, TabMode::Headful).await?;
            }
            MenuAction::FullClone => {
                self.duplicate_tab(CloneStrategy::Full).await?;
            }
            MenuAction::CloneAndRefetch => {
                self.duplicate_tab(CloneStrategy::Refetch).await?;
            }
            MenuAction::CloseTab => {
                self.remove_active_tab();
            }
            MenuAction::SelectTab(id) => {
                self.switch_to_tab(id);
            }
            MenuAction::Back => {
                self.go_back().await?;
            }
            MenuAction::Forward => {
                self.go_forward().await?;
            }
        }
        Ok(())
    }

    /// Applies a title notification for `id`.
    ///
    /// Returns `false` if the tab is no longer registered.
    pub fn on_title_changed(&self, id: TabId, title: &str) -> bool {
        {
            let mut registry = self.inner.registry.lock();
            let is_active = registry.active_id() == Some(id);
            let Some(tab) = registry.get_mut(id) else {
                return false;
            };
            tab.set_title(title);

            if is_active {
                self.inner
                    .view_host
                    .window()
                    .set_title(&display_name(title));
            }
        }

        self.tabs_changed();
        let _ = self.inner.events.send(ShellEvent::TitleChanged {
            tab_id: id,
            title: title.to_string(),
        });
        true
    }
}

// ============================================================================
// TabManager - Internal
// ============================================================================

impl TabManager {
    async fn await_initial_load(&self, control: &dyn ContentControl, address: &str) -> Result<()> {
        let result = match self.inner.options.load_timeout {
            Some(limit) => timeout(limit, control.load_url(address))
                .await
                .map_err(|_| Error::load_timeout(address, limit.as_millis() as u64))?,
            None => control.load_url(address).await,
        };

        result.map_err(|e| {
            if e.is_load_error() {
                e
            } else {
                Error::load(address, e.to_string())
            }
        })
    }

    fn load_failed(&self, id: TabId, address: &str, error: Error) -> Error {
        warn!(tab_id = %id, address = %address, error = %error, "Tab discarded before registration");
        let _ = self.inner.events.send(ShellEvent::LoadFailed {
            tab_id: id,
            address: address.to_string(),
            message: error.to_string(),
        });
        error
    }

    /// `Ready`: insert, activate, attach, listen for titles, rebuild menu.
    fn register(&self, id: TabId, mode: TabMode, pair: ViewPair, title: &str) -> Result<()> {
        let ViewPair {
            surface,
            control,
            events,
        } = pair;

        let mut tab = Tab::loading(
            id,
            mode,
            ViewHandles {
                surface: Arc::clone(&surface),
                control,
            },
        );
        tab.mark_ready(title);

        {
            let mut registry = self.inner.registry.lock();
            if let Err(e) = registry.insert(tab) {
                error!(tab_id = %id, error = %e, "Registry invariant violated, discarding tab");
                surface.destroy();
                return Err(e);
            }
            self.activate_locked(&mut registry, id)?;

            let listener = self.spawn_title_listener(id, events);
            if let Some(tab) = registry.get_mut(id) {
                tab.set_title_listener(listener);
            }
        }

        self.tabs_changed();
        Ok(())
    }

    /// Points the registry at `id` and binds its surface.
    fn activate_locked(&self, registry: &mut TabRegistry, id: TabId) -> Result<()> {
        registry.set_active(id)?;
        let tab = registry.get_mut(id).ok_or_else(|| Error::unknown_tab(id))?;
        let surface = tab
            .handles()
            .map(|h| Arc::clone(&h.surface))
            .ok_or_else(|| Error::view_destroyed(id))?;

        tab.mark_attached();
        self.inner.view_host.attach(id, surface);
        self.inner.view_host.window().set_title(tab.name());
        Ok(())
    }

    fn spawn_title_listener(
        &self,
        id: TabId,
        mut events: mpsc::UnboundedReceiver<ContentEvent>,
    ) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let Some(manager) = Self::from_weak(&weak) else {
                    break;
                };
                match event {
                    ContentEvent::TitleChanged(title) => {
                        manager.on_title_changed(id, &title);
                    }
                }
            }
            trace!(tab_id = %id, "Title listener finished");
        })
    }

    /// Projects and installs the menu. The registry lock stays held until
    /// the window has the menu, so installs land in mutation order.
    fn install_menu_locked(&self, registry: &TabRegistry) {
        let snapshot = registry.snapshot();
        let menu = MenuProjector::build(&snapshot);
        self.inner.view_host.window().set_menu(&menu);
        trace!(tabs = snapshot.tabs.len(), "Menu rebuilt");
    }

    fn tabs_changed(&self) {
        self.refresh_menu();
        let _ = self.inner.events.send(ShellEvent::TabsChanged);
    }
}

// ============================================================================
// Tests
// ============================================================================
