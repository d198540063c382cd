//! Tunable pipeline parameters.
//!
//! One instance lives inside each session's state and is mutated only by
//! validated `set_params` commands. Setters clamp to fixed bounds instead of
//! rejecting, so a client sliding a UI control never gets an error for an
//! out-of-range value; kernel sizes are forced odd by incrementing even
//! values.

// ============================================================================
// Constants
// ============================================================================

/// Kernel size bounds for blur and morphology (inclusive, odd).
pub const KERNEL_BOUNDS: (u32, u32) = (3, 15);

/// Morphological iteration bounds (inclusive).
pub const ITERATION_BOUNDS: (u32, u32) = (1, 10);

// ============================================================================
// PipelineParams
// ============================================================================

/// Tuning knobs for mask construction, filtering and output mode.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineParams {
    /// Gaussian blur kernel size (odd, in [3, 15]).
    pub blur_ksize: u32,
    /// Morphological opening repetitions (in [1, 10]).
    pub morph_iterations: u32,
    /// Square structuring element side (odd, in [3, 15]).
    pub morph_kernel_size: u32,
    /// Minimum region area as a fraction of frame area (in [0, 1]).
    pub min_area_ratio: f64,
    /// Keep only the largest connected mask region.
    pub keep_largest: bool,
    /// Subtract a fixed skin-tone window from the mask.
    pub skin_protect: bool,
    /// Render the mask overlay instead of compositing the background.
    pub preview_mask: bool,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            blur_ksize: 5,
            morph_iterations: 2,
            morph_kernel_size: 3,
            min_area_ratio: 0.0,
            keep_largest: false,
            skin_protect: false,
            preview_mask: false,
        }
    }
}

impl PipelineParams {
    /// Sets the blur kernel size, clamped to [3, 15] and forced odd.
    pub fn set_blur_ksize(&mut self, value: u32) {
        self.blur_ksize = clamp_odd_kernel(value);
    }

    /// Sets the morphological iteration count, clamped to [1, 10].
    pub fn set_morph_iterations(&mut self, value: u32) {
        self.morph_iterations = value.clamp(ITERATION_BOUNDS.0, ITERATION_BOUNDS.1);
    }

    /// Sets the structuring element side, clamped to [3, 15] and forced odd.
    pub fn set_morph_kernel_size(&mut self, value: u32) {
        self.morph_kernel_size = clamp_odd_kernel(value);
    }

    /// Sets the minimum-area ratio, clamped to [0, 1].
    pub fn set_min_area_ratio(&mut self, value: f64) {
        self.min_area_ratio = value.clamp(0.0, 1.0);
    }
}

/// Clamps a kernel size to [3, 15], incrementing even values to odd.
fn clamp_odd_kernel(value: u32) -> u32 {
    let v = if value % 2 == 0 { value + 1 } else { value };
    v.clamp(KERNEL_BOUNDS.0, KERNEL_BOUNDS.1)
}

// ============================================================================
// Tests
// ============================================================================
