//! Image segmentation and compositing pipeline.
//!
//! Per-frame data flow:
//!
//! 1. [`color`]: target hex color to HSV ranges (hue wraparound aware)
//! 2. [`mask`]: blur, threshold, morphology into a raw binary mask
//! 3. [`filters`]: area pruning, largest-component retention, skin exclusion
//! 4. [`compose`]: background/live cutover or preview overlay
//!
//! Frames are [`image::RgbImage`]s, masks are [`image::GrayImage`]s. Every
//! stage preserves dimensions; the compositor's background resize is the
//! only implicit geometry change in the pipeline.

// ============================================================================
// Submodules
// ============================================================================

/// Color models and target-color specification.
pub mod color;

/// Frame compositing and preview overlay.
pub mod compose;

/// Mask refinement filter chain.
pub mod filters;

/// Raw mask construction (blur, threshold, morphology).
pub mod mask;

/// Tunable pipeline parameters.
pub mod params;

// ============================================================================
// Re-exports
// ============================================================================

pub use color::{ColorRange, ColorSpec};
pub use compose::Compositor;
pub use filters::{MaskFilter, MaskFilterChain};
pub use mask::MaskBuilder;
pub use params::PipelineParams;
