//! Region-of-interest mask construction.
//!
//! Turns a live frame plus a set of HSV ranges into a binary mask marking
//! the cloak region. Stages run in a fixed order: blur, HSV conversion,
//! per-range thresholding, union, morphological opening, and one closing
//! dilation to restore boundary pixels the opening ate.
//!
//! Masks are single-channel [`GrayImage`]s where 255 means selected. Every
//! stage preserves the input frame's dimensions.

// ============================================================================
// Imports
// ============================================================================

use image::{imageops, GrayImage, RgbImage};

use super::color::{rgb_to_hsv, ColorRange};
use super::params::PipelineParams;

// ============================================================================
// MaskBuilder
// ============================================================================

/// Builds the raw cloak mask for one frame.
pub struct MaskBuilder;

impl MaskBuilder {
    /// Produces a binary mask of pixels matching any of `ranges`.
    ///
    /// An empty range list yields an all-zero mask. The result still needs
    /// the filter chain before compositing.
    #[must_use]
    pub fn build(frame: &RgbImage, ranges: &[ColorRange], params: &PipelineParams) -> GrayImage {
        let blurred = imageops::blur(frame, sigma_for_kernel(params.blur_ksize));

        let mut mask = threshold_ranges(&blurred, ranges);

        // Opening with N iterations: N erosions then N dilations.
        let radius = params.morph_kernel_size / 2;
        for _ in 0..params.morph_iterations {
            mask = erode(&mask, radius);
        }
        for _ in 0..params.morph_iterations {
            mask = dilate(&mask, radius);
        }

        // One extra dilation closes small gaps left by the opening.
        dilate(&mask, radius)
    }
}

/// Derives a Gaussian sigma from an odd kernel size.
///
/// Same relation OpenCV applies when only a kernel size is given.
fn sigma_for_kernel(ksize: u32) -> f32 {
    0.3 * ((ksize as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Unions the in-range sub-masks of all color ranges into one binary mask.
fn threshold_ranges(frame: &RgbImage, ranges: &[ColorRange]) -> GrayImage {
    let (width, height) = frame.dimensions();
    let mut mask = GrayImage::new(width, height);

    if ranges.is_empty() {
        return mask;
    }

    for (x, y, pixel) in frame.enumerate_pixels() {
        let hsv = rgb_to_hsv(pixel[0], pixel[1], pixel[2]);
        if ranges.iter().any(|range| range.contains(hsv)) {
            mask.put_pixel(x, y, image::Luma([255]));
        }
    }

    mask
}

// ============================================================================
// Morphology
// ============================================================================

/// Erodes a binary mask with a square element of the given radius.
///
/// Separable min filter: a square structuring element decomposes into a
/// horizontal pass followed by a vertical pass. Windows are clipped at the
/// image border.
#[must_use]
pub fn erode(mask: &GrayImage, radius: u32) -> GrayImage {
    if radius == 0 {
        return mask.clone();
    }
    let horizontal = directional_extreme(mask, radius, true, u8::min);
    directional_extreme(&horizontal, radius, false, u8::min)
}

/// Dilates a binary mask with a square element of the given radius.
#[must_use]
pub fn dilate(mask: &GrayImage, radius: u32) -> GrayImage {
    if radius == 0 {
        return mask.clone();
    }
    let horizontal = directional_extreme(mask, radius, true, u8::max);
    directional_extreme(&horizontal, radius, false, u8::max)
}

/// Runs a 1-D min/max filter along one axis.
fn directional_extreme(
    mask: &GrayImage,
    radius: u32,
    horizontal: bool,
    pick: fn(u8, u8) -> u8,
) -> GrayImage {
    let (width, height) = mask.dimensions();
    let mut out = GrayImage::new(width, height);
    let r = radius as i64;

    for y in 0..height {
        for x in 0..width {
            let (center, limit) = if horizontal { (x, width) } else { (y, height) };
            let lo = (center as i64 - r).max(0) as u32;
            let hi = ((center as i64 + r) as u32).min(limit - 1);

            let mut value = mask.get_pixel(x, y)[0];
            for i in lo..=hi {
                let sample = if horizontal {
                    mask.get_pixel(i, y)[0]
                } else {
                    mask.get_pixel(x, i)[0]
                };
                value = pick(value, sample);
            }
            out.put_pixel(x, y, image::Luma([value]));
        }
    }

    out
}

// ============================================================================
// Tests
// ============================================================================
