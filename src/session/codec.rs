//! Frame payload decode/encode.
//!
//! Inbound frames arrive as data-URI or raw base64 text inside a JSON
//! message; outbound frames leave as JPEG at fixed quality wrapped in a
//! `data:image/jpeg;base64,` prefix. All size limits are enforced here,
//! before any expensive decoding runs.

// ============================================================================
// Imports
// ============================================================================

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD as Base64Standard;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use tracing::trace;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Maximum accepted encoded payload length in characters.
pub const MAX_ENCODED_LEN: usize = 14_000_000;

/// Maximum accepted decoded payload size in bytes (50 MiB).
pub const MAX_DECODED_BYTES: usize = 50 * 1024 * 1024;

/// Accepted decoded image dimensions, inclusive, per axis.
pub const DIMENSION_BOUNDS: (u32, u32) = (10, 4000);

/// JPEG quality for outbound frames.
const JPEG_QUALITY: u8 = 80;

/// Data-URI prefix for outbound frames.
const JPEG_PREFIX: &str = "data:image/jpeg;base64,";

// ============================================================================
// Decoding
// ============================================================================

/// Decodes a data-URI or raw base64 image payload into a frame.
///
/// # Errors
///
/// - [`Error::FrameTooLarge`] when the encoded text exceeds the cap
/// - [`Error::InvalidFrameData`] for a malformed data-URI header, invalid
///   base64, an empty payload, or an oversized decoded payload
/// - [`Error::BadFrame`] when the bytes are not a decodable image or the
///   decoded dimensions fall outside [10, 4000] px per axis
pub fn decode_frame(data: &str) -> Result<RgbImage> {
    if data.is_empty() {
        return Err(Error::invalid_frame_data("empty payload"));
    }
    if data.len() > MAX_ENCODED_LEN {
        return Err(Error::frame_too_large(data.len(), MAX_ENCODED_LEN));
    }

    // A data URI carries "data:image/<fmt>;base64," before the payload.
    let encoded = match data.split_once(',') {
        Some((header, payload)) => {
            if !header.starts_with("data:image/") {
                return Err(Error::invalid_frame_data("not an image data URI"));
            }
            payload
        }
        None => data,
    };

    let bytes = Base64Standard
        .decode(encoded)
        .map_err(|e| Error::invalid_frame_data(format!("base64: {e}")))?;

    if bytes.len() > MAX_DECODED_BYTES {
        return Err(Error::invalid_frame_data(format!(
            "decoded payload too large: {} bytes",
            bytes.len()
        )));
    }

    let frame = image::load_from_memory(&bytes)
        .map_err(|e| Error::bad_frame(format!("decode: {e}")))?
        .to_rgb8();

    let (width, height) = frame.dimensions();
    let (min, max) = DIMENSION_BOUNDS;
    if width < min || height < min || width > max || height > max {
        return Err(Error::bad_frame(format!(
            "dimensions {width}x{height} outside [{min}, {max}]"
        )));
    }

    trace!(width, height, "frame decoded");
    Ok(frame)
}

// ============================================================================
// Encoding
// ============================================================================

/// Encodes a frame as a JPEG data URI at fixed quality.
///
/// # Errors
///
/// Returns [`Error::Image`] if JPEG encoding fails.
pub fn encode_frame(frame: &RgbImage) -> Result<String> {
    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut buffer), JPEG_QUALITY);
    frame.write_with_encoder(encoder)?;

    let mut out = String::with_capacity(JPEG_PREFIX.len() + buffer.len() * 4 / 3 + 4);
    out.push_str(JPEG_PREFIX);
    Base64Standard.encode_string(&buffer, &mut out);
    Ok(out)
}

// ============================================================================
// Tests
// ============================================================================
