//! Event message types.
//!
//! Events are notifications sent from the renderer host to the shell when
//! something happens outside of a request: a page changed its title, the
//! user picked a menu entry, the window was resized or closed.
//!
//! # Event Types
//!
//! | Module | Events |
//! |--------|--------|
//! | `view` | `titleUpdated` |
//! | `window` | `resized`, `closed` |
//! | `menu` | `select`, `refresh` |

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::Value;

use crate::identifiers::{RequestId, TabId};
use crate::tabs::MenuAction;

// ============================================================================
// Event
// ============================================================================

/// An event notification from the renderer host.
///
/// # Format
///
/// ```json
/// {
///   "type": "event",
///   "method": "module.eventName",
///   "params": { ... }
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    /// Optional identifier, only used for logging.
    #[serde(default)]
    pub id: Option<RequestId>,

    /// Event type marker (always "event").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Event name in `module.eventName` format.
    pub method: String,

    /// Event-specific data.
    #[serde(default)]
    pub params: Value,
}

impl Event {
    /// Returns the module name from the method.
    #[inline]
    #[must_use]
    pub fn module(&self) -> &str {
        self.method.split('.').next().unwrap_or_default()
    }

    /// Returns the event name from the method.
    #[inline]
    #[must_use]
    pub fn event_name(&self) -> &str {
        self.method.split('.').nth(1).unwrap_or_default()
    }

    /// Parses the event into a typed variant.
    #[must_use]
    pub fn parse(&self) -> ParsedEvent {
        match self.method.as_str() {
            "view.titleUpdated" => match self.get_tab_id("tabId") {
                Some(tab_id) => ParsedEvent::ViewTitleUpdated {
                    tab_id,
                    title: self.get_string("title"),
                },
                None => self.unknown(),
            },

            "window.resized" => ParsedEvent::WindowResized {
                width: self.get_u32("width"),
                height: self.get_u32("height"),
            },

            "window.closed" => ParsedEvent::WindowClosed,

            "menu.select" => match serde_json::from_value(self.params.clone()) {
                Ok(action) => ParsedEvent::MenuSelect { action },
                Err(_) => self.unknown(),
            },

            "menu.refresh" => ParsedEvent::MenuRefresh,

            _ => self.unknown(),
        }
    }

    fn unknown(&self) -> ParsedEvent {
        ParsedEvent::Unknown {
            method: self.method.clone(),
            params: self.params.clone(),
        }
    }

    #[inline]
    fn get_string(&self, key: &str) -> String {
        self.params
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    #[inline]
    fn get_u32(&self, key: &str) -> u32 {
        self.params
            .get(key)
            .and_then(Value::as_u64)
            .unwrap_or_default() as u32
    }

    #[inline]
    fn get_tab_id(&self, key: &str) -> Option<TabId> {
        self.params
            .get(key)
            .and_then(Value::as_u64)
            .and_then(TabId::new)
    }
}

// ============================================================================
// ParsedEvent
// ============================================================================

/// Parsed event types for type-safe handling.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedEvent {
    /// A page changed its document title.
    ViewTitleUpdated {
        /// View that changed.
        tab_id: TabId,
        /// New title.
        title: String,
    },

    /// The window content area changed size.
    WindowResized {
        /// New width.
        width: u32,
        /// New height.
        height: u32,
    },

    /// The user closed the window.
    WindowClosed,

    /// The user picked a menu entry.
    MenuSelect {
        /// Command attached to the entry.
        action: MenuAction,
    },

    /// The host asks for the menu to be rebuilt.
    MenuRefresh,

    /// Unknown event type.
    Unknown {
        /// Event method.
        method: String,
        /// Event params.
        params: Value,
    },
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn event(json: &str) -> Event {
        serde_json::from_str(json).expect("parse event")
    }

    #[test]
    fn test_title_updated() {
        let event = event(
            r#"{"type":"event","method":"view.titleUpdated","params":{"tabId":17,"title":"Inbox"}}"#,
        );
        assert_eq!(event.module(), "view");
        assert_eq!(event.event_name(), "titleUpdated");
        assert_eq!(
            event.parse(),
            ParsedEvent::ViewTitleUpdated {
                tab_id: TabId::new(17).expect("non-zero"),
                title: "Inbox".to_string(),
            }
        );
    }

    #[test]
    fn test_title_updated_without_tab_is_unknown() {
        let untargeted = event(r#"{"type":"event","method":"view.titleUpdated","params":{"title":"x"}}"#);
        assert!(matches!(untargeted.parse(), ParsedEvent::Unknown { .. }));
    }

    #[test]
    fn test_menu_select() {
        let select = event(
            r#"{"type":"event","method":"menu.select","params":{"action":"selectTab","tabId":5}}"#,
        );
        assert_eq!(
            select.parse(),
            ParsedEvent::MenuSelect {
                action: MenuAction::SelectTab(TabId::new(5).expect("non-zero")),
            }
        );

        let new_tab = event(r#"{"type":"event","method":"menu.select","params":{"action":"newTab"}}"#);
        assert_eq!(new_tab.parse(), ParsedEvent::MenuSelect { action: MenuAction::NewTab });
    }

    #[test]
    fn test_window_events() {
        let resized = event(
            r#"{"type":"event","method":"window.resized","params":{"width":1024,"height":700}}"#,
        );
        assert_eq!(resized.parse(), ParsedEvent::WindowResized { width: 1024, height: 700 });

        let closed = event(r#"{"type":"event","method":"window.closed"}"#);
        assert_eq!(closed.parse(), ParsedEvent::WindowClosed);
    }

    #[test]
    fn test_unknown_event() {
        let event = event(r#"{"type":"event","method":"custom.thing","params":{"foo":"bar"}}"#);
        match event.parse() {
            ParsedEvent::Unknown { method, .. } => assert_eq!(method, "custom.thing"),
            other => panic!("expected Unknown, got {other:?}"),
        }
    }
}
