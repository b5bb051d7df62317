//! Error types for the tab shell.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use tab_shell::{Result, TabMode};
//!
//! async fn example(manager: &tab_shell::TabManager) -> Result<()> {
//!     let id = manager.create_tab("https://example.com", TabMode::Headful).await?;
//!     manager.switch_to_tab(id);
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Registry | [`Error::UnknownTab`], [`Error::DuplicateTab`] |
//! | Content | [`Error::Load`], [`Error::LoadTimeout`], [`Error::Script`], [`Error::ViewDestroyed`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`] |
//! | Protocol | [`Error::Protocol`], [`Error::RequestTimeout`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::{RequestId, TabId};

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when shell configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Registry Errors
    // ========================================================================
    /// Operation referenced a tab that is not registered.
    ///
    /// Lifecycle operations guard against this and no-op instead.
    #[error("Unknown tab: {tab_id}")]
    UnknownTab {
        /// The missing tab ID.
        tab_id: TabId,
    },

    /// A tab with the same id is already registered.
    ///
    /// Unreachable with monotonic id allocation; treated as an invariant
    /// violation.
    #[error("Duplicate tab id: {tab_id}")]
    DuplicateTab {
        /// The conflicting tab ID.
        tab_id: TabId,
    },

    // ========================================================================
    // Content Errors
    // ========================================================================
    /// Initial or cloned navigation failed.
    #[error("Failed to load {url}: {message}")]
    Load {
        /// Address that failed to load.
        url: String,
        /// Failure reported by the content control.
        message: String,
    },

    /// Initial load did not settle in time.
    #[error("Load of {url} did not settle after {timeout_ms}ms")]
    LoadTimeout {
        /// Address that was loading.
        url: String,
        /// Milliseconds waited.
        timeout_ms: u64,
    },

    /// Script execution failed in the view.
    #[error("Script error: {message}")]
    Script {
        /// Error message from script execution.
        message: String,
    },

    /// The view was destroyed while still in use.
    #[error("View for tab {tab_id} has been destroyed")]
    ViewDestroyed {
        /// Tab owning the destroyed view.
        tab_id: TabId,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Connection timeout waiting for the renderer host.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// WebSocket connection closed unexpectedly.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Protocol violation or error response from the renderer host.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// Command request timeout.
    #[error("Request {request_id} timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// The request ID that timed out.
        request_id: RequestId,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// Channel receive error.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an unknown tab error.
    #[inline]
    pub fn unknown_tab(tab_id: TabId) -> Self {
        Self::UnknownTab { tab_id }
    }

    /// Creates a duplicate tab error.
    #[inline]
    pub fn duplicate_tab(tab_id: TabId) -> Self {
        Self::DuplicateTab { tab_id }
    }

    /// Creates a load error.
    #[inline]
    pub fn load(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Load {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates a load timeout error.
    #[inline]
    pub fn load_timeout(url: impl Into<String>, timeout_ms: u64) -> Self {
        Self::LoadTimeout {
            url: url.into(),
            timeout_ms,
        }
    }

    /// Creates a script error.
    #[inline]
    pub fn script(message: impl Into<String>) -> Self {
        Self::Script {
            message: message.into(),
        }
    }

    /// Creates a destroyed view error.
    #[inline]
    pub fn view_destroyed(tab_id: TabId) -> Self {
        Self::ViewDestroyed { tab_id }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(request_id: RequestId, timeout_ms: u64) -> Self {
        Self::RequestTimeout {
            request_id,
            timeout_ms,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::LoadTimeout { .. } | Self::ConnectionTimeout { .. } | Self::RequestTimeout { .. }
        )
    }

    /// Returns `true` if a tab failed to reach the `Ready` state.
    #[inline]
    #[must_use]
    pub fn is_load_error(&self) -> bool {
        matches!(self, Self::Load { .. } | Self::LoadTimeout { .. })
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error means registry state would have been
    /// corrupted had the operation continued.
    #[inline]
    #[must_use]
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::DuplicateTab { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================
