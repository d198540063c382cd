//! Per-connection session machinery.
//!
//! Everything in this module is partitioned per connection: the captured
//! background and pipeline parameters live in [`SessionState`], the frame
//! payload limits in [`codec`], and the request budget in the keyed
//! [`RateLimiter`]. Sharing any of it across connections would leak one
//! client's background or parameters into another's stream.

// ============================================================================
// Submodules
// ============================================================================

/// Frame payload decode/encode with size limits.
pub mod codec;

/// Fixed-window request limiting keyed by connection.
pub mod rate_limit;

/// Per-connection state machine.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use rate_limit::RateLimiter;
pub use state::{FrameOutcome, SessionState};
