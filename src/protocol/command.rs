//! Command definitions organized by module.
//!
//! Commands follow `module.methodName` format.
//!
//! # Command Modules
//!
//! | Module | Commands |
//! |--------|----------|
//! | `window` | View binding, title, menu |
//! | `view` | Lifecycle, geometry, navigation, scripts |
//! | `session` | Renderer session setup |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::identifiers::TabId;
use crate::tabs::{MenuModel, TabMode};
use crate::view::{AutoResize, Bounds};

// ============================================================================
// Command Wrapper
// ============================================================================

/// All protocol commands organized by module.
///
/// This enum wraps module-specific command enums for unified serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Command {
    /// Window module commands.
    Window(WindowCommand),
    /// View module commands.
    View(ViewCommand),
    /// Session module commands.
    Session(SessionCommand),
}

impl From<WindowCommand> for Command {
    fn from(command: WindowCommand) -> Self {
        Self::Window(command)
    }
}

impl From<ViewCommand> for Command {
    fn from(command: ViewCommand) -> Self {
        Self::View(command)
    }
}

impl From<SessionCommand> for Command {
    fn from(command: SessionCommand) -> Self {
        Self::Session(command)
    }
}

// ============================================================================
// Window Commands
// ============================================================================

/// Window module commands for the single host window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum WindowCommand {
    /// Bind a view to the content area.
    #[serde(rename = "window.addView")]
    AddView {
        /// View to bind.
        #[serde(rename = "tabId")]
        tab_id: TabId,
    },

    /// Unbind a view without destroying it.
    #[serde(rename = "window.removeView")]
    RemoveView {
        /// View to unbind.
        #[serde(rename = "tabId")]
        tab_id: TabId,
    },

    /// Set the window title.
    #[serde(rename = "window.setTitle")]
    SetTitle {
        /// New title.
        title: String,
    },

    /// Install the application menu.
    #[serde(rename = "window.setMenu")]
    SetMenu {
        /// Full menu bar.
        menu: MenuModel,
    },
}

// ============================================================================
// View Commands
// ============================================================================

/// View module commands. Every command addresses one view by tab id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum ViewCommand {
    /// Create a view owned by a tab.
    #[serde(rename = "view.create")]
    Create {
        /// Owning tab.
        #[serde(rename = "tabId")]
        tab_id: TabId,
        /// Render mode.
        mode: TabMode,
    },

    /// Destroy a view and its renderer.
    #[serde(rename = "view.destroy")]
    Destroy {
        /// Target view.
        #[serde(rename = "tabId")]
        tab_id: TabId,
    },

    /// Position a view.
    #[serde(rename = "view.setBounds")]
    SetBounds {
        /// Target view.
        #[serde(rename = "tabId")]
        tab_id: TabId,
        /// New bounds.
        bounds: Bounds,
    },

    /// Track window resizes.
    #[serde(rename = "view.setAutoResize")]
    SetAutoResize {
        /// Target view.
        #[serde(rename = "tabId")]
        tab_id: TabId,
        /// Dimensions to track.
        #[serde(rename = "autoResize")]
        auto_resize: AutoResize,
    },

    /// Navigate; responds once the load settles.
    #[serde(rename = "view.loadUrl")]
    LoadUrl {
        /// Target view.
        #[serde(rename = "tabId")]
        tab_id: TabId,
        /// Address.
        url: String,
    },

    /// Current address.
    #[serde(rename = "view.getUrl")]
    GetUrl {
        /// Target view.
        #[serde(rename = "tabId")]
        tab_id: TabId,
    },

    /// Current document title.
    #[serde(rename = "view.getTitle")]
    GetTitle {
        /// Target view.
        #[serde(rename = "tabId")]
        tab_id: TabId,
    },

    /// Whether history back is possible.
    #[serde(rename = "view.canGoBack")]
    CanGoBack {
        /// Target view.
        #[serde(rename = "tabId")]
        tab_id: TabId,
    },

    /// History back.
    #[serde(rename = "view.goBack")]
    GoBack {
        /// Target view.
        #[serde(rename = "tabId")]
        tab_id: TabId,
    },

    /// Whether history forward is possible.
    #[serde(rename = "view.canGoForward")]
    CanGoForward {
        /// Target view.
        #[serde(rename = "tabId")]
        tab_id: TabId,
    },

    /// History forward.
    #[serde(rename = "view.goForward")]
    GoForward {
        /// Target view.
        #[serde(rename = "tabId")]
        tab_id: TabId,
    },

    /// Run a script in the page.
    #[serde(rename = "view.executeScript")]
    ExecuteScript {
        /// Target view.
        #[serde(rename = "tabId")]
        tab_id: TabId,
        /// Script body.
        script: String,
    },

    /// Rewrite the current history entry without reloading.
    #[serde(rename = "view.replaceHistoryEntry")]
    ReplaceHistoryEntry {
        /// Target view.
        #[serde(rename = "tabId")]
        tab_id: TabId,
        /// Address to record.
        url: String,
    },
}

// ============================================================================
// Session Commands
// ============================================================================

/// Session module commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum SessionCommand {
    /// Configure the renderer session before any view exists.
    #[serde(rename = "session.configure")]
    Configure {
        /// Storage root for renderer data. `None` keeps the host default.
        #[serde(rename = "userDataPath")]
        user_data_path: Option<String>,
    },
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u64) -> TabId {
        TabId::new(raw).expect("non-zero")
    }

    #[test]
    fn test_view_command_wire_format() {
        let command = Command::from(ViewCommand::SetBounds {
            tab_id: id(3),
            bounds: Bounds { x: 0, y: 30, width: 800, height: 570 },
        });
        let json = serde_json::to_value(&command).expect("serialize");

        assert_eq!(json["method"], "view.setBounds");
        assert_eq!(json["params"]["tabId"], 3);
        assert_eq!(json["params"]["bounds"]["height"], 570);
    }

    #[test]
    fn test_create_carries_mode() {
        let json = serde_json::to_value(Command::from(ViewCommand::Create {
            tab_id: id(4),
            mode: TabMode::Headless,
        }))
        .expect("serialize");

        assert_eq!(json["method"], "view.create");
        assert_eq!(json["params"]["mode"], "headless");
    }

    #[test]
    fn test_window_set_menu() {
        let json = serde_json::to_value(Command::from(WindowCommand::SetMenu {
            menu: MenuModel::default(),
        }))
        .expect("serialize");

        assert_eq!(json["method"], "window.setMenu");
        assert_eq!(json["params"]["menu"]["menus"], serde_json::json!([]));
    }

    #[test]
    fn test_session_configure() {
        let json = serde_json::to_value(Command::from(SessionCommand::Configure {
            user_data_path: Some("/data/profile".into()),
        }))
        .expect("serialize");

        assert_eq!(json["method"], "session.configure");
        assert_eq!(json["params"]["userDataPath"], "/data/profile");
    }
}
