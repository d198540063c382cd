//! Per-connection session state.
//!
//! One [`SessionState`] exists per connection, created on accept and
//! dropped on close. It owns the captured background, the active color
//! ranges and the pipeline parameters; nothing here is shared between
//! connections, so no locking is needed. Mutation happens only through
//! explicit session commands.

// ============================================================================
// Imports
// ============================================================================

use std::sync::OnceLock;

use image::RgbImage;
use regex::Regex;
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::ParamsUpdate;
use crate::vision::{ColorRange, ColorSpec, Compositor, MaskBuilder, MaskFilterChain, PipelineParams};

// ============================================================================
// Constants
// ============================================================================

/// Default hue tolerance for `set_color`.
pub const DEFAULT_TOLERANCE: i64 = 10;

/// Default saturation floor for `set_color`.
pub const DEFAULT_S_MIN: i64 = 120;

/// Default value floor for `set_color`.
pub const DEFAULT_V_MIN: i64 = 70;

/// Hue tolerance bounds (inclusive).
const TOLERANCE_BOUNDS: (i64, i64) = (1, 90);

/// Exact pattern a target color must match.
const HEX_PATTERN: &str = "^#[0-9A-Fa-f]{6}$";

// ============================================================================
// FrameOutcome
// ============================================================================

/// Result of processing one live frame.
#[derive(Debug)]
pub struct FrameOutcome {
    /// The composited (or preview) output frame.
    pub frame: RgbImage,
    /// `true` exactly once: when this frame was captured as background.
    ///
    /// The protocol layer turns this into a single toast at the point of
    /// capture; there is no flag to poll later.
    pub background_captured: bool,
}

// ============================================================================
// SessionState
// ============================================================================

/// State machine for one connection.
pub struct SessionState {
    /// Captured background, absent until the first frame or after a reset.
    background: Option<RgbImage>,
    /// Active target-color ranges.
    ranges: Vec<ColorRange>,
    /// Tunable pipeline parameters.
    params: PipelineParams,
    /// Mask refinement stages.
    filters: MaskFilterChain,
}

impl SessionState {
    /// Creates a session targeting the default color (saturated red).
    #[must_use]
    pub fn new() -> Self {
        Self {
            background: None,
            ranges: vec![ColorRange::new([0, 120, 70], [10, 255, 255])],
            params: PipelineParams::default(),
            filters: MaskFilterChain::standard(),
        }
    }

    /// Returns `true` if a background has been captured.
    #[inline]
    #[must_use]
    pub fn has_background(&self) -> bool {
        self.background.is_some()
    }

    /// Current pipeline parameters.
    #[inline]
    #[must_use]
    pub fn params(&self) -> &PipelineParams {
        &self.params
    }

    /// Current target-color ranges.
    #[inline]
    #[must_use]
    pub fn ranges(&self) -> &[ColorRange] {
        &self.ranges
    }

    /// Clears the captured background.
    ///
    /// The next processed frame re-captures.
    pub fn reset_background(&mut self) {
        self.background = None;
        debug!("background cleared");
    }

    /// Retargets the cloak color from a hex string.
    ///
    /// The hex must match `^#[0-9A-Fa-f]{6}$` exactly and is rejected
    /// outright otherwise, with no state mutation. Tolerance clamps to
    /// [1, 90]; saturation/value floors clamp to [0, 255].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHexColor`] for a malformed hex string.
    pub fn set_color(&mut self, hex: &str, tolerance: i64, s_min: i64, v_min: i64) -> Result<()> {
        static HEX_RE: OnceLock<Regex> = OnceLock::new();
        let re = HEX_RE.get_or_init(|| Regex::new(HEX_PATTERN).expect("valid pattern"));

        if !re.is_match(hex) {
            return Err(Error::invalid_hex_color(hex));
        }

        let tolerance = tolerance.clamp(TOLERANCE_BOUNDS.0, TOLERANCE_BOUNDS.1) as u8;
        let s_min = s_min.clamp(0, 255) as u8;
        let v_min = v_min.clamp(0, 255) as u8;

        self.ranges = ColorSpec::from_hex(hex, tolerance, s_min, v_min)?;
        debug!(hex, tolerance, s_min, v_min, ranges = self.ranges.len(), "color updated");
        Ok(())
    }

    /// Applies a partial parameter update.
    ///
    /// Absent fields leave current values untouched; present fields clamp
    /// to their bounds rather than erroring.
    pub fn update_params(&mut self, update: &ParamsUpdate) {
        if let Some(value) = update.blur_ksize {
            self.params.set_blur_ksize(value.max(0) as u32);
        }
        if let Some(value) = update.morph_iterations {
            self.params.set_morph_iterations(value.max(0) as u32);
        }
        if let Some(value) = update.morph_kernel_size {
            self.params.set_morph_kernel_size(value.max(0) as u32);
        }
        if let Some(value) = update.min_area_ratio {
            self.params.set_min_area_ratio(value);
        }
        if let Some(value) = update.preview_mask {
            self.params.preview_mask = value;
        }
        if let Some(value) = update.keep_largest {
            self.params.keep_largest = value;
        }
        if let Some(value) = update.skin_protect {
            self.params.skin_protect = value;
        }
        debug!(params = ?self.params, "params updated");
    }

    /// Runs the full pipeline over one live frame.
    ///
    /// With no background captured yet, the frame is first captured as the
    /// background (also in preview mode) and the outcome reports it. The
    /// frame then passes through mask building, filtering and compositing
    /// as usual; against a just-captured identical background the cutover
    /// is invisible by construction.
    #[must_use]
    pub fn process_frame(&mut self, live: RgbImage) -> FrameOutcome {
        let background_captured = if self.background.is_none() {
            self.background = Some(live.clone());
            debug!(
                width = live.width(),
                height = live.height(),
                "background captured"
            );
            true
        } else {
            false
        };

        let mask = MaskBuilder::build(&live, &self.ranges, &self.params);
        let mask = self.filters.filter(mask, &live, &self.params);

        let frame = if self.params.preview_mask {
            Compositor::preview(&mask, &live)
        } else if let Some(background) = &self.background {
            Compositor::compose(&mask, background, &live)
        } else {
            // Unreachable after auto-capture; pass the frame through.
            live
        };

        FrameOutcome {
            frame,
            background_captured,
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
