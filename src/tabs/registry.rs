//! Authoritative keyed store of tabs plus the active pointer.

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::error::{Error, Result};
use crate::identifiers::TabId;

use super::tab::{Tab, TabMode, TabPhase};

// ============================================================================
// Snapshot Types
// ============================================================================

/// Immutable copy of one registry entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabSummary {
    /// Tab ID.
    pub id: TabId,
    /// Display name.
    pub name: String,
    /// Mode.
    pub mode: TabMode,
    /// Lifecycle phase.
    pub phase: TabPhase,
}

/// Immutable copy of the registry, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrySnapshot {
    /// Entries in insertion order.
    pub tabs: Vec<TabSummary>,
    /// Active tab, if any.
    pub active: Option<TabId>,
}

// ============================================================================
// TabRegistry
// ============================================================================

/// Insertion-ordered map of tabs with a single active pointer.
///
/// Pure bookkeeping: never touches rendering surfaces.
#[derive(Debug, Default)]
pub struct TabRegistry {
    tabs: FxHashMap<TabId, Tab>,
    order: Vec<TabId>,
    active: Option<TabId>,
}

impl TabRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a tab at the end of the order.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateTab`] if the id is already present.
    pub fn insert(&mut self, tab: Tab) -> Result<()> {
        let id = tab.id();
        if self.tabs.contains_key(&id) {
            return Err(Error::duplicate_tab(id));
        }
        self.tabs.insert(id, tab);
        self.order.push(id);
        trace!(tab_id = %id, len = self.order.len(), "Tab inserted");
        Ok(())
    }

    /// Removes a tab. No-op if absent.
    ///
    /// Clears the active pointer when it named the removed tab.
    pub fn remove(&mut self, id: TabId) -> Option<Tab> {
        let tab = self.tabs.remove(&id)?;
        self.order.retain(|existing| *existing != id);
        if self.active == Some(id) {
            self.active = None;
        }
        trace!(tab_id = %id, len = self.order.len(), "Tab removed");
        Some(tab)
    }

    /// Returns a tab.
    #[inline]
    #[must_use]
    pub fn get(&self, id: TabId) -> Option<&Tab> {
        self.tabs.get(&id)
    }

    /// Returns a tab mutably.
    #[inline]
    pub fn get_mut(&mut self, id: TabId) -> Option<&mut Tab> {
        self.tabs.get_mut(&id)
    }

    /// Points the active pointer at `id`.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownTab`] if the id is not present.
    pub fn set_active(&mut self, id: TabId) -> Result<()> {
        if !self.tabs.contains_key(&id) {
            return Err(Error::unknown_tab(id));
        }
        self.active = Some(id);
        Ok(())
    }

    /// Returns the active tab ID.
    #[inline]
    #[must_use]
    pub fn active_id(&self) -> Option<TabId> {
        self.active
    }

    /// Returns ids in insertion order.
    #[inline]
    #[must_use]
    pub fn ids_in_order(&self) -> &[TabId] {
        &self.order
    }

    /// Returns the first id in insertion order.
    #[inline]
    #[must_use]
    pub fn first_id(&self) -> Option<TabId> {
        self.order.first().copied()
    }

    /// Returns `true` if `id` is registered.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: TabId) -> bool {
        self.tabs.contains_key(&id)
    }

    /// Number of tabs.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if no tab is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Copies the current state for projection.
    #[must_use]
    pub fn snapshot(&self) -> RegistrySnapshot {
        let tabs = self
            .order
            .iter()
            .filter_map(|id| self.tabs.get(id))
            .map(|tab| TabSummary {
                id: tab.id(),
                name: tab.name().to_string(),
                mode: tab.mode(),
                phase: tab.phase(),
            })
            .collect();

        RegistrySnapshot {
            tabs,
            active: self.active,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
