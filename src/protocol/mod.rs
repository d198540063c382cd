//! WebSocket wire protocol message types.
//!
//! One JSON object per message, bidirectional over a persistent
//! connection.
//!
//! # Protocol Overview
//!
//! | Message | Direction | Purpose |
//! |---------|-----------|---------|
//! | `frame` | Client → Server | Live frame to process |
//! | `reset_background` | Client → Server | Clear captured background |
//! | `set_color` | Client → Server | Retarget the cloak color |
//! | `set_params` | Client → Server | Tune pipeline parameters |
//! | `frame` | Server → Client | Processed output frame |
//! | `ok` | Server → Client | Command acknowledgment |
//! | `toast` | Server → Client | User-facing notice |
//! | `error` | Server → Client | Rejection with a machine code |

// ============================================================================
// Submodules
// ============================================================================

/// Inbound and outbound message types.
pub mod message;

// ============================================================================
// Re-exports
// ============================================================================

pub use message::{ClientMessage, ParamsUpdate, ServerMessage};
