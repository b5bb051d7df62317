//! WebSocket protocol message types.
//!
//! This module defines the messages exchanged between the shell (local end)
//! and the renderer host (remote end) that owns the native window and views.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `Request` | Shell → Host | Command request |
//! | `Response` | Host → Shell | Command response |
//! | `Event` | Host → Shell | Window, view and menu notification |
//!
//! The host opens the exchange with a READY message: a success response
//! with the nil id whose result carries the initial content size.
//!
//! # Command Naming
//!
//! Commands follow `module.methodName` format:
//!
//! - `window.setMenu`
//! - `view.loadUrl`
//! - `session.configure`

// ============================================================================
// Submodules
// ============================================================================

/// Command definitions organized by module.
pub mod command;

/// Event message types.
pub mod event;

/// Request and Response message types.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{Command, SessionCommand, ViewCommand, WindowCommand};
pub use event::{Event, ParsedEvent};
pub use request::{Request, Response, ResponseType};
