//! Menu projection from a registry snapshot.
//!
//! The projector holds no state. Every rebuild starts from a fresh
//! [`RegistrySnapshot`], so the menu can never lag behind the tab set.
//!
//! # Layout
//!
//! | Menu | Items |
//! |------|-------|
//! | Tab | New Tab, Full Clone Active Tab, Clone and Refetch Active Tab, Close Active Tab, Select Tab ▸ |
//! | Navigation | Back, Forward |

use serde::{Deserialize, Serialize};

use crate::identifiers::TabId;

use super::registry::RegistrySnapshot;

// ============================================================================
// Constants
// ============================================================================

/// Marker appended to the active tab's label.
pub const ACTIVE_MARKER: &str = " (Active)";

/// Label of the placeholder shown when no tab is open.
pub const EMPTY_PLACEHOLDER: &str = "Not any Tab Opened";

// ============================================================================
// MenuAction
// ============================================================================

/// Commands a menu item can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "action", content = "tabId", rename_all = "camelCase")]
pub enum MenuAction {
    /// Open a new tab on the home address.
    NewTab,
    /// Duplicate the active tab from a DOM snapshot.
    FullClone,
    /// Duplicate the active tab by loading its address again.
    CloneAndRefetch,
    /// Close the active tab.
    CloseTab,
    /// Activate a tab.
    SelectTab(TabId),
    /// History back on the active tab.
    Back,
    /// History forward on the active tab.
    Forward,
}

// ============================================================================
// Menu Model
// ============================================================================

/// One entry of the "Select Tab" radio group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabMenuEntry {
    /// Display label.
    pub label: String,
    /// Radio state.
    pub is_active: bool,
    /// Whether the entry is selectable.
    pub enabled: bool,
    /// Action fired on selection. `None` for the placeholder.
    pub on_select: Option<MenuAction>,
}

/// A menu item as handed to the host window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MenuItem {
    /// Plain command.
    #[serde(rename_all = "camelCase")]
    Command {
        /// Display label.
        label: String,
        /// Keyboard shortcut, e.g. `CmdOrCtrl+T`.
        accelerator: Option<String>,
        /// Action fired on click.
        action: MenuAction,
    },
    /// Single-choice entry.
    Radio(TabMenuEntry),
    /// Nested menu.
    Submenu {
        /// Display label.
        label: String,
        /// Children.
        items: Vec<MenuItem>,
    },
    /// Separator line.
    Separator,
}

/// Top-level menu bar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuModel {
    /// Top-level submenus, left to right.
    pub menus: Vec<MenuItem>,
}

impl MenuModel {
    /// Returns the "Select Tab" entries, if present.
    #[must_use]
    pub fn tab_entries(&self) -> Vec<&TabMenuEntry> {
        fn walk<'a>(items: &'a [MenuItem], out: &mut Vec<&'a TabMenuEntry>) {
            for item in items {
                match item {
                    MenuItem::Radio(entry) => out.push(entry),
                    MenuItem::Submenu { items, .. } => walk(items, out),
                    MenuItem::Command { .. } | MenuItem::Separator => {}
                }
            }
        }

        let mut out = Vec::new();
        walk(&self.menus, &mut out);
        out
    }
}

// ============================================================================
// MenuProjector
// ============================================================================

/// Stateless projection from registry state to menus.
#[derive(Debug, Clone, Copy, Default)]
pub struct MenuProjector;

impl MenuProjector {
    /// Projects the tab list into a radio group.
    ///
    /// An empty registry yields one disabled placeholder.
    #[must_use]
    pub fn project(snapshot: &RegistrySnapshot) -> Vec<TabMenuEntry> {
        if snapshot.tabs.is_empty() {
            return vec![TabMenuEntry {
                label: EMPTY_PLACEHOLDER.to_string(),
                is_active: false,
                enabled: false,
                on_select: None,
            }];
        }

        snapshot
            .tabs
            .iter()
            .map(|tab| {
                let is_active = snapshot.active == Some(tab.id);
                let label = if is_active {
                    format!("{}{}", tab.name, ACTIVE_MARKER)
                } else {
                    tab.name.clone()
                };
                TabMenuEntry {
                    label,
                    is_active,
                    enabled: true,
                    on_select: Some(MenuAction::SelectTab(tab.id)),
                }
            })
            .collect()
    }

    /// Builds the full menu bar.
    #[must_use]
    pub fn build(snapshot: &RegistrySnapshot) -> MenuModel {
        let tab_list = Self::project(snapshot)
            .into_iter()
            .map(MenuItem::Radio)
            .collect();

        let tab_menu = MenuItem::Submenu {
            label: "Tab".to_string(),
            items: vec![
                command("New Tab", Some("CmdOrCtrl+T"), MenuAction::NewTab),
                command("Full Clone Active Tab", None, MenuAction::FullClone),
                command("Clone and Refetch Active Tab", None, MenuAction::CloneAndRefetch),
                command("Close Active Tab", Some("CmdOrCtrl+W"), MenuAction::CloseTab),
                MenuItem::Separator,
                MenuItem::Submenu {
                    label: "Select Tab".to_string(),
                    items: tab_list,
                },
            ],
        };

        let navigation_menu = MenuItem::Submenu {
            label: "Navigation".to_string(),
            items: vec![
                command("Back", Some("CmdOrCtrl+Z"), MenuAction::Back),
                command("Forward", Some("CmdOrCtrl+Y"), MenuAction::Forward),
            ],
        };

        MenuModel {
            menus: vec![tab_menu, navigation_menu],
        }
    }
}

fn command(label: &str, accelerator: Option<&str>, action: MenuAction) -> MenuItem {
    MenuItem::Command {
        label: label.to_string(),
        accelerator: accelerator.map(str::to_string),
        action,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    use crate::tabs::registry::TabSummary;
    use crate::tabs::{TabMode, TabPhase};

    fn summary(raw: u64, name: &str) -> TabSummary {
        TabSummary {
            id: TabId::new(raw).expect("non-zero"),
            name: name.to_string(),
            mode: TabMode::Headful,
            phase: TabPhase::Attached,
        }
    }

    #[test]
    fn test_empty_registry_placeholder() {
        let entries = MenuProjector::project(&RegistrySnapshot::default());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].label, EMPTY_PLACEHOLDER);
        assert!(!entries[0].enabled);
        assert!(!entries[0].is_active);
        assert!(entries[0].on_select.is_none());
    }

    #[test]
    fn test_active_marker() {
        let snapshot = RegistrySnapshot {
            tabs: vec![summary(1, "Docs"), summary(2, "Mail")],
            active: TabId::new(2),
        };
        let entries = MenuProjector::project(&snapshot);
        assert_eq!(entries[0].label, "Docs");
        assert!(!entries[0].is_active);
        assert_eq!(entries[1].label, "Mail (Active)");
        assert!(entries[1].is_active);
        assert_eq!(
            entries[1].on_select,
            Some(MenuAction::SelectTab(TabId::new(2).expect("non-zero")))
        );
    }

    #[test]
    fn test_build_contains_commands_and_tabs() {
        let snapshot = RegistrySnapshot {
            tabs: vec![summary(5, "Start")],
            active: TabId::new(5),
        };
        let menu = MenuProjector::build(&snapshot);
        assert_eq!(menu.menus.len(), 2);
        assert_eq!(menu.tab_entries().len(), 1);
        assert_eq!(menu.tab_entries()[0].label, "Start (Active)");
    }

    #[test]
    fn test_menu_action_wire_format() {
        let json = serde_json::to_value(MenuAction::SelectTab(TabId::new(9).expect("non-zero")))
            .expect("serialize");
        assert_eq!(json, serde_json::json!({ "action": "selectTab", "tabId": 9 }));

        let parsed: MenuAction =
            serde_json::from_value(serde_json::json!({ "action": "cloneAndRefetch" }))
                .expect("parse");
        assert_eq!(parsed, MenuAction::CloneAndRefetch);
    }

    proptest! {
        #[test]
        fn prop_single_active_entry_matches_pointer(
            count in 0usize..12,
            active_index in proptest::option::of(0usize..12),
        ) {
            let tabs: Vec<_> = (1..=count as u64).map(|i| summary(i, "t")).collect();
            let active = active_index
                .filter(|i| *i < count)
                .map(|i| tabs[i].id);
            let snapshot = RegistrySnapshot { tabs, active };

            let entries = MenuProjector::project(&snapshot);
            let active_entries: Vec<_> = entries.iter().filter(|e| e.is_active).collect();

            match active {
                Some(id) => {
                    prop_assert_eq!(active_entries.len(), 1);
                    prop_assert_eq!(active_entries[0].on_select, Some(MenuAction::SelectTab(id)));
                }
                None => prop_assert!(active_entries.is_empty()),
            }
            prop_assert_eq!(entries.len(), count.max(1));
        }
    }
}
