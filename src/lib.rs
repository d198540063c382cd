//! Cloakstream - real-time invisibility-cloak video effect over WebSocket.
//!
//! A captured background frame is composited over live frames wherever a
//! live frame matches a configurable color signature, producing the
//! illusion that the matching region is replaced by what is "behind" it.
//!
//! # Architecture
//!
//! Each client drives one persistent WebSocket connection:
//!
//! - **Data flow**: frame bytes → decode → mask build → mask filters →
//!   composite → encode → frame bytes
//! - **Control flow**: command → rate-limit gate → dispatch → state
//!   mutation → acknowledgment
//!
//! Key design principles:
//!
//! - Each connection owns a [`SessionState`]: captured background, color
//!   ranges and parameters never leak across connections
//! - The protocol is a closed tagged-variant enum; dispatch is an
//!   exhaustive match, not a string-comparison chain
//! - Every failure is scoped to one message; only a transport failure ends
//!   a session, and no error is fatal to the process
//!
//! # Quick Start
//!
//! ```no_run
//! use std::net::{IpAddr, Ipv4Addr};
//! use cloakstream::{Result, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let server = Server::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 8765).await?;
//!     println!("listening on {}", server.ws_url());
//!     server.run().await
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`error`] | Error types and [`Result`] alias |
//! | [`protocol`] | Wire message types |
//! | [`session`] | Per-connection state, codec, rate limiting |
//! | [`transport`] | WebSocket server and session loop |
//! | [`vision`] | Segmentation and compositing pipeline |

// ============================================================================
// Modules
// ============================================================================

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Wire protocol message types.
///
/// Tagged-variant inbound commands and outbound replies.
pub mod protocol;

/// Per-connection session machinery.
///
/// State, frame codec and the fixed-window rate limiter.
pub mod session;

/// WebSocket transport layer.
///
/// [`Server`] accepts connections; [`transport::Session`] runs each one.
pub mod transport;

/// Image segmentation and compositing pipeline.
///
/// Color targeting, mask construction, refinement and compositing.
pub mod vision;

// ============================================================================
// Re-exports
// ============================================================================

// Error types
pub use error::{Error, Result};

// Protocol types
pub use protocol::{ClientMessage, ParamsUpdate, ServerMessage};

// Session types
pub use session::{FrameOutcome, RateLimiter, SessionState};

// Transport types
pub use transport::Server;

// Vision types
pub use vision::{ColorRange, ColorSpec, Compositor, MaskBuilder, MaskFilterChain, PipelineParams};
