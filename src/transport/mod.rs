//! WebSocket transport layer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Shell (Rust)   │                              │  Renderer host  │
//! │                 │         WebSocket            │                 │
//! │  PendingServer  │◄────────────────────────────►│  native window  │
//! │  → Connection   │      localhost:PORT          │  + web views    │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `PendingServer::bind` - Bind the listener
//! 2. Start the renderer host with the WebSocket URL
//! 3. `PendingServer::accept` - Wait for the host and its READY message
//! 4. `Connection` - Send commands, receive responses and events
//! 5. `Connection::shutdown` - Close the socket

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket connection and event loop.
pub mod connection;

/// WebSocket server binding and acceptance.
pub mod server;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{Connection, DEFAULT_REQUEST_TIMEOUT, EventHandler, ReadyData};
pub use server::{DEFAULT_ACCEPT_TIMEOUT, PendingServer};
