//! Frame compositing.
//!
//! The final stage: blends the captured background and the live frame
//! through the refined mask, or renders a debug overlay of the mask when
//! preview mode is on.
//!
//! Compositing is a hard per-pixel cutover. Mask and inverse mask are
//! complementary, so every output pixel comes from exactly one source;
//! there is no blending at region boundaries.

// ============================================================================
// Imports
// ============================================================================

use image::{imageops, GrayImage, Rgb, RgbImage};

// ============================================================================
// Constants
// ============================================================================

/// Highlight color for the preview overlay.
const PREVIEW_COLOR: [u8; 3] = [0, 255, 0];

/// Preview overlay opacity (highlight weight in the blend).
const PREVIEW_OPACITY: f32 = 0.4;

// ============================================================================
// Compositor
// ============================================================================

/// Produces output frames from mask, background and live frame.
pub struct Compositor;

impl Compositor {
    /// Composites the background over the live frame wherever the mask is
    /// selected.
    ///
    /// The background is resized with linear interpolation when its
    /// dimensions differ from the live frame. This is the only implicit
    /// resize in the pipeline; mask and live frame must already agree.
    #[must_use]
    pub fn compose(mask: &GrayImage, background: &RgbImage, live: &RgbImage) -> RgbImage {
        let (width, height) = live.dimensions();

        let resized;
        let background = if background.dimensions() == (width, height) {
            background
        } else {
            resized = imageops::resize(background, width, height, imageops::FilterType::Triangle);
            &resized
        };

        let mut out = RgbImage::new(width, height);
        for (x, y, pixel) in out.enumerate_pixels_mut() {
            *pixel = if mask.get_pixel(x, y)[0] != 0 {
                *background.get_pixel(x, y)
            } else {
                *live.get_pixel(x, y)
            };
        }

        out
    }

    /// Renders the mask as a green overlay on the live frame.
    ///
    /// Selected pixels blend 40% toward the highlight color; everything
    /// else passes through untouched. No background frame is consumed.
    #[must_use]
    pub fn preview(mask: &GrayImage, live: &RgbImage) -> RgbImage {
        let (width, height) = live.dimensions();

        let mut out = RgbImage::new(width, height);
        for (x, y, pixel) in out.enumerate_pixels_mut() {
            let source = *live.get_pixel(x, y);
            *pixel = if mask.get_pixel(x, y)[0] != 0 {
                blend(source, PREVIEW_COLOR, PREVIEW_OPACITY)
            } else {
                source
            };
        }

        out
    }
}

/// Blends `overlay` over `base` at the given opacity.
fn blend(base: Rgb<u8>, overlay: [u8; 3], opacity: f32) -> Rgb<u8> {
    let mut out = [0u8; 3];
    for i in 0..3 {
        let value =
            f32::from(base[i]) * (1.0 - opacity) + f32::from(overlay[i]) * opacity;
        out[i] = value.round().clamp(0.0, 255.0) as u8;
    }
    Rgb(out)
}

// ============================================================================
// Tests
// ============================================================================
