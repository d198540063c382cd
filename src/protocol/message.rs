//! Inbound and outbound message types.
//!
//! One JSON object per WebSocket text message, discriminated by a `type`
//! tag. The inbound side is a closed tagged-variant enum, so adding a
//! message kind is an exhaustive-match change, not a string comparison
//! chain.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

// ============================================================================
// ClientMessage
// ============================================================================

/// A command from the client.
///
/// # Format
///
/// ```json
/// {"type": "frame", "data": "data:image/jpeg;base64,..."}
/// {"type": "reset_background"}
/// {"type": "set_color", "hex": "#00ff00", "tolerance": 12}
/// {"type": "set_params", "blur_ksize": 7, "keep_largest": true}
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// A live frame to run through the pipeline.
    Frame {
        /// Data-URI or raw base64 image payload.
        data: String,
    },

    /// Clear the captured background; the next frame re-captures.
    ResetBackground,

    /// Retarget the cloak color.
    SetColor {
        /// Target color as `#rrggbb`. Defaults to saturated red.
        #[serde(default = "default_hex")]
        hex: String,
        /// Hue tolerance, clamped to [1, 90].
        #[serde(default)]
        tolerance: Option<i64>,
        /// Saturation floor, clamped to [0, 255].
        #[serde(default)]
        s_min: Option<i64>,
        /// Value floor, clamped to [0, 255].
        #[serde(default)]
        v_min: Option<i64>,
    },

    /// Partial pipeline parameter update.
    SetParams(ParamsUpdate),
}

fn default_hex() -> String {
    "#ff0000".to_string()
}

impl ClientMessage {
    /// Parses one inbound text message.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownMessageType`] when the text is not a JSON object
    ///   carrying a recognized `type` tag
    /// - [`Error::InvalidFrameData`] when a `frame` payload is malformed
    /// - [`Error::Json`] when another known type's payload is malformed
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|_| Error::unknown_message_type("?"))?;

        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::unknown_message_type("?"))?;

        match kind {
            "frame" | "reset_background" | "set_color" | "set_params" => {
                let kind = kind.to_string();
                serde_json::from_value(value).map_err(|e| {
                    if kind == "frame" {
                        Error::invalid_frame_data(e.to_string())
                    } else {
                        Error::Json(e)
                    }
                })
            }
            other => Err(Error::unknown_message_type(other)),
        }
    }
}

// ============================================================================
// ParamsUpdate
// ============================================================================

/// Payload of a `set_params` message.
///
/// Every field is optional; absent fields leave the session's current
/// parameters untouched. Values are clamped at the session layer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParamsUpdate {
    /// Blur kernel size.
    #[serde(default)]
    pub blur_ksize: Option<i64>,
    /// Morphological opening repetitions.
    #[serde(default)]
    pub morph_iterations: Option<i64>,
    /// Structuring element side.
    #[serde(default)]
    pub morph_kernel_size: Option<i64>,
    /// Minimum region area as a fraction of frame area.
    #[serde(default)]
    pub min_area_ratio: Option<f64>,
    /// Render the mask overlay instead of compositing.
    #[serde(default)]
    pub preview_mask: Option<bool>,
    /// Keep only the largest connected mask region.
    #[serde(default)]
    pub keep_largest: Option<bool>,
    /// Subtract the skin-tone window from the mask.
    #[serde(default)]
    pub skin_protect: Option<bool>,
}

// ============================================================================
// ServerMessage
// ============================================================================

/// A reply to the client.
///
/// # Format
///
/// ```json
/// {"type": "frame", "data": "data:image/jpeg;base64,..."}
/// {"type": "ok"}
/// {"type": "toast", "message": "Background captured"}
/// {"type": "error", "message": "invalid_hex_color"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A processed output frame.
    Frame {
        /// JPEG data URI.
        data: String,
    },

    /// Acknowledgment of a state-changing command.
    Ok,

    /// User-facing notice.
    Toast {
        /// Human-readable notice text.
        message: String,
    },

    /// A rejected input, as a short machine code.
    Error {
        /// Machine code from [`Error::code`].
        message: String,
    },
}

impl ServerMessage {
    /// Creates a toast notice.
    #[inline]
    #[must_use]
    pub fn toast(message: impl Into<String>) -> Self {
        Self::Toast {
            message: message.into(),
        }
    }

    /// Creates an error reply carrying the error's wire code.
    #[inline]
    #[must_use]
    pub fn error(err: &Error) -> Self {
        Self::Error {
            message: err.code().to_string(),
        }
    }

    /// Serializes the message to its wire form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ============================================================================
// Tests
// ============================================================================
