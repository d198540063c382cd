//! Error types for the cloak pipeline.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use cloakstream::{Result, Error};
//!
//! fn example(data: &str) -> Result<()> {
//!     let frame = codec::decode_frame(data)?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Input validation | [`Error::BadFrame`], [`Error::InvalidFrameData`], [`Error::FrameTooLarge`], [`Error::InvalidHexColor`] |
//! | Throttling | [`Error::RateLimitExceeded`] |
//! | Protocol | [`Error::UnknownMessageType`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`], [`Error::Image`] |
//!
//! Every variant maps to a short machine code via [`Error::code`], which is
//! what clients see in `{type: "error", message: <code>}` replies. Internal
//! detail never leaks onto the wire.

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging. The wire
/// representation is always the short code from [`Error::code`].
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Input Validation Errors
    // ========================================================================
    /// Frame payload decoded but is not a usable image.
    ///
    /// Returned for undecodable image containers and for decoded images
    /// outside the [10, 4000] px per-dimension window.
    #[error("Bad frame: {message}")]
    BadFrame {
        /// Description of why the frame was rejected.
        message: String,
    },

    /// Frame payload is not valid data-URI/base64 content.
    ///
    /// Returned before any image decoding is attempted.
    #[error("Invalid frame data: {message}")]
    InvalidFrameData {
        /// Description of the malformed payload.
        message: String,
    },

    /// Frame payload exceeds the encoded-text size cap.
    #[error("Frame too large: {len} chars (max {max})")]
    FrameTooLarge {
        /// Length of the rejected payload in characters.
        len: usize,
        /// Maximum accepted length.
        max: usize,
    },

    /// Target color is not a `#rrggbb` hex string.
    #[error("Invalid hex color: {hex}")]
    InvalidHexColor {
        /// The rejected input.
        hex: String,
    },

    // ========================================================================
    // Throttling Errors
    // ========================================================================
    /// Connection exceeded its fixed-window request budget.
    ///
    /// No state mutation occurs for the rejected message.
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Inbound message carried an unrecognized `type` tag.
    #[error("Unknown message type: {kind}")]
    UnknownMessageType {
        /// The unrecognized type tag ("?" when absent or not a string).
        kind: String,
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

    /// Image encode/decode error from the `image` crate.
    ///
    /// Decode failures are remapped to [`Error::BadFrame`] at the codec
    /// boundary; this variant surfaces only for unexpected encode failures.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a bad frame error.
    #[inline]
    pub fn bad_frame(message: impl Into<String>) -> Self {
        Self::BadFrame {
            message: message.into(),
        }
    }

    /// Creates an invalid frame data error.
    #[inline]
    pub fn invalid_frame_data(message: impl Into<String>) -> Self {
        Self::InvalidFrameData {
            message: message.into(),
        }
    }

    /// Creates a frame too large error.
    #[inline]
    pub fn frame_too_large(len: usize, max: usize) -> Self {
        Self::FrameTooLarge { len, max }
    }

    /// Creates an invalid hex color error.
    #[inline]
    pub fn invalid_hex_color(hex: impl Into<String>) -> Self {
        Self::InvalidHexColor { hex: hex.into() }
    }

    /// Creates an unknown message type error.
    #[inline]
    pub fn unknown_message_type(kind: impl Into<String>) -> Self {
        Self::UnknownMessageType { kind: kind.into() }
    }
}

// ============================================================================
// Wire Codes & Predicates
// ============================================================================

impl Error {
    /// Returns the short machine code reported to clients.
    ///
    /// External failures (IO, JSON, WebSocket, image encode) collapse to
    /// `internal_error` so internals never leak onto the wire.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadFrame { .. } => "bad_frame",
            Self::InvalidFrameData { .. } => "invalid_frame_data",
            Self::FrameTooLarge { .. } => "frame_too_large",
            Self::InvalidHexColor { .. } => "invalid_hex_color",
            Self::RateLimitExceeded => "rate_limit_exceeded",
            Self::UnknownMessageType { .. } => "unknown_message_type",
            Self::Io(_) | Self::Json(_) | Self::WebSocket(_) | Self::Image(_) => "internal_error",
        }
    }

    /// Returns `true` if this is a client input validation error.
    #[inline]
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Self::BadFrame { .. }
                | Self::InvalidFrameData { .. }
                | Self::FrameTooLarge { .. }
                | Self::InvalidHexColor { .. }
        )
    }

    /// Returns `true` if the error is recoverable within the session.
    ///
    /// Every error except a transport failure is scoped to one message:
    /// the client gets a typed error reply and the connection stays open.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::WebSocket(_) | Self::Io(_))
    }
}

// ============================================================================
// Tests
// ============================================================================
