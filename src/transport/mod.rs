//! WebSocket transport layer.
//!
//! [`Server`] accepts connections and hands each one to a [`Session`],
//! which owns that connection's message loop and state. The transport
//! suspends only at message-receive and message-send boundaries; pixel
//! work runs on the blocking pool.

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket server and accept loop.
pub mod server;

/// Per-connection session loop.
pub mod session;

// ============================================================================
// Re-exports
// ============================================================================

pub use server::Server;
pub use session::Session;
