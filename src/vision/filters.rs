//! Mask refinement filter chain.
//!
//! A raw mask from [`MaskBuilder`](super::mask::MaskBuilder) still carries
//! noise the morphology could not remove: tiny blobs, rival regions, and
//! skin pixels whose color brushes the target range. The chain runs a fixed
//! ordered list of stages, each an independent predicate + transform, so
//! stages stay individually testable and composable.
//!
//! Stage order (each reads the previous stage's output):
//!
//! | Stage | Gate | Effect |
//! |-------|------|--------|
//! | [`MinAreaFilter`] | `min_area_ratio > 0` | drop regions below the area floor, fill kept interiors |
//! | [`KeepLargestFilter`] | `keep_largest` | zero everything but the largest region |
//! | [`SkinProtectFilter`] | `skin_protect` | subtract a fixed YCrCb skin window |
//!
//! Every stage preserves mask dimensions and is idempotent on a mask that
//! already satisfies its condition.

// ============================================================================
// Imports
// ============================================================================

use image::{GrayImage, RgbImage};

use super::color::rgb_to_ycrcb;
use super::params::PipelineParams;

// ============================================================================
// Constants
// ============================================================================

/// Skin-tone chroma window in YCrCb, independent of the target color.
///
/// Bounds as (Y, Cr, Cb) inclusive pairs; luma is unconstrained.
const SKIN_LOWER: [u8; 3] = [0, 135, 80];
const SKIN_UPPER: [u8; 3] = [255, 180, 135];

// ============================================================================
// MaskFilter Trait
// ============================================================================

/// One conditionally-applied mask refinement stage.
pub trait MaskFilter: Send + Sync {
    /// Stage name for logging.
    fn name(&self) -> &'static str;

    /// Returns `true` if the stage should run under these parameters.
    fn applies(&self, params: &PipelineParams) -> bool;

    /// Transforms the mask. `frame` is the original live frame, available
    /// to stages that look past the mask itself.
    fn apply(&self, mask: GrayImage, frame: &RgbImage, params: &PipelineParams) -> GrayImage;
}

// ============================================================================
// MaskFilterChain
// ============================================================================

/// Ordered chain of [`MaskFilter`] stages.
pub struct MaskFilterChain {
    stages: Vec<Box<dyn MaskFilter>>,
}

impl MaskFilterChain {
    /// Creates the standard three-stage chain.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            stages: vec![
                Box::new(MinAreaFilter),
                Box::new(KeepLargestFilter),
                Box::new(SkinProtectFilter),
            ],
        }
    }

    /// Runs every applicable stage over the mask, in order.
    #[must_use]
    pub fn filter(&self, mask: GrayImage, frame: &RgbImage, params: &PipelineParams) -> GrayImage {
        self.stages
            .iter()
            .filter(|stage| stage.applies(params))
            .fold(mask, |current, stage| {
                tracing::trace!(stage = stage.name(), "applying mask filter");
                stage.apply(current, frame, params)
            })
    }
}

impl Default for MaskFilterChain {
    fn default() -> Self {
        Self::standard()
    }
}

// ============================================================================
// MinAreaFilter
// ============================================================================

/// Drops mask regions smaller than `min_area_ratio × frame area`.
///
/// Kept regions are rebuilt as filled interiors, so holes inside a
/// surviving region are selected too. Regions below the floor vanish
/// entirely rather than shrinking.
pub struct MinAreaFilter;

impl MaskFilter for MinAreaFilter {
    fn name(&self) -> &'static str {
        "min_area"
    }

    fn applies(&self, params: &PipelineParams) -> bool {
        params.min_area_ratio > 0.0
    }

    fn apply(&self, mask: GrayImage, _frame: &RgbImage, params: &PipelineParams) -> GrayImage {
        let (width, height) = mask.dimensions();
        let min_area = (params.min_area_ratio * f64::from(width) * f64::from(height)) as usize;

        let components = label_components(&mask);

        let mut kept = GrayImage::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let label = components.labels[(y * width + x) as usize];
                if label > 0 && components.areas[label as usize] >= min_area {
                    kept.put_pixel(x, y, image::Luma([255]));
                }
            }
        }

        fill_holes(&mut kept);
        kept
    }
}

// ============================================================================
// KeepLargestFilter
// ============================================================================

/// Retains only the single largest connected region.
///
/// A mask with zero or one foreground region passes through unchanged.
pub struct KeepLargestFilter;

impl MaskFilter for KeepLargestFilter {
    fn name(&self) -> &'static str {
        "keep_largest"
    }

    fn applies(&self, params: &PipelineParams) -> bool {
        params.keep_largest
    }

    fn apply(&self, mask: GrayImage, _frame: &RgbImage, _params: &PipelineParams) -> GrayImage {
        let components = label_components(&mask);
        if components.count() <= 1 {
            return mask;
        }

        // Labels start at 1; find the one with the greatest pixel area.
        let largest = components
            .areas
            .iter()
            .enumerate()
            .skip(1)
            .max_by_key(|(_, area)| **area)
            .map(|(label, _)| label as u32)
            .unwrap_or(0);

        let (width, height) = mask.dimensions();
        let mut out = GrayImage::new(width, height);
        for y in 0..height {
            for x in 0..width {
                if components.labels[(y * width + x) as usize] == largest {
                    out.put_pixel(x, y, image::Luma([255]));
                }
            }
        }

        out
    }
}

// ============================================================================
// SkinProtectFilter
// ============================================================================

/// Subtracts a fixed skin-tone chroma window from the mask.
///
/// Protects exposed skin from being treated as cloak even when its color
/// partially overlaps the target range. The window is defined over the
/// original frame, not the blurred one.
pub struct SkinProtectFilter;

impl MaskFilter for SkinProtectFilter {
    fn name(&self) -> &'static str {
        "skin_protect"
    }

    fn applies(&self, params: &PipelineParams) -> bool {
        params.skin_protect
    }

    fn apply(&self, mut mask: GrayImage, frame: &RgbImage, _params: &PipelineParams) -> GrayImage {
        for (x, y, pixel) in frame.enumerate_pixels() {
            if mask.get_pixel(x, y)[0] == 0 {
                continue;
            }
            let ycrcb = rgb_to_ycrcb(pixel[0], pixel[1], pixel[2]);
            let is_skin =
                (0..3).all(|i| SKIN_LOWER[i] <= ycrcb[i] && ycrcb[i] <= SKIN_UPPER[i]);
            if is_skin {
                mask.put_pixel(x, y, image::Luma([0]));
            }
        }

        mask
    }
}

// ============================================================================
// Connected Components
// ============================================================================

/// Result of labeling: per-pixel labels plus per-label pixel areas.
///
/// Label 0 is background; foreground labels start at 1. `areas[0]` is the
/// background pixel count.
pub(crate) struct Components {
    pub labels: Vec<u32>,
    pub areas: Vec<usize>,
}

impl Components {
    /// Number of foreground regions.
    pub fn count(&self) -> usize {
        self.areas.len().saturating_sub(1)
    }
}

/// Labels 8-connected foreground regions with a flood fill.
pub(crate) fn label_components(mask: &GrayImage) -> Components {
    let (width, height) = mask.dimensions();
    let (w, h) = (width as usize, height as usize);

    let mut labels = vec![0u32; w * h];
    let mut areas = vec![0usize; 1];
    let mut stack = Vec::new();
    let mut next_label = 1u32;

    for start in 0..w * h {
        if labels[start] != 0 || mask.as_raw()[start] == 0 {
            continue;
        }

        labels[start] = next_label;
        stack.push(start);
        let mut area = 0usize;

        while let Some(index) = stack.pop() {
            area += 1;
            let (x, y) = (index % w, index / w);

            for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let (nx, ny) = (x as i64 + dx, y as i64 + dy);
                    if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 {
                        continue;
                    }
                    let neighbor = ny as usize * w + nx as usize;
                    if labels[neighbor] == 0 && mask.as_raw()[neighbor] != 0 {
                        labels[neighbor] = next_label;
                        stack.push(neighbor);
                    }
                }
            }
        }

        areas.push(area);
        next_label += 1;
    }

    areas[0] = w * h - labels.iter().filter(|l| **l != 0).count();
    Components { labels, areas }
}

/// Fills enclosed zero regions: any background pixel unreachable from the
/// image border (4-connected walk over zeros) becomes foreground.
fn fill_holes(mask: &mut GrayImage) {
    let (width, height) = mask.dimensions();
    let (w, h) = (width as usize, height as usize);

    let mut outside = vec![false; w * h];
    let mut stack = Vec::new();

    let seed = |index: usize, mask: &GrayImage, outside: &mut Vec<bool>, stack: &mut Vec<usize>| {
        if !outside[index] && mask.as_raw()[index] == 0 {
            outside[index] = true;
            stack.push(index);
        }
    };

    for x in 0..w {
        seed(x, mask, &mut outside, &mut stack);
        seed((h - 1) * w + x, mask, &mut outside, &mut stack);
    }
    for y in 0..h {
        seed(y * w, mask, &mut outside, &mut stack);
        seed(y * w + (w - 1), mask, &mut outside, &mut stack);
    }

    while let Some(index) = stack.pop() {
        let (x, y) = (index % w, index / w);
        let neighbors = [
            (x > 0).then(|| index - 1),
            (x + 1 < w).then(|| index + 1),
            (y > 0).then(|| index - w),
            (y + 1 < h).then(|| index + w),
        ];
        for neighbor in neighbors.into_iter().flatten() {
            if !outside[neighbor] && mask.as_raw()[neighbor] == 0 {
                outside[neighbor] = true;
                stack.push(neighbor);
            }
        }
    }

    for y in 0..height {
        for x in 0..width {
            let index = y as usize * w + x as usize;
            if mask.get_pixel(x, y)[0] == 0 && !outside[index] {
                mask.put_pixel(x, y, image::Luma([255]));
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use image::Rgb;

    fn blank_frame(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([0, 0, 0]))
    }

    fn fill_rect(mask: &mut GrayImage, x0: u32, y0: u32, x1: u32, y1: u32) {
        for y in y0..y1 {
            for x in x0..x1 {
                mask.put_pixel(x, y, image::Luma([255]));
            }
        }
    }

    fn count_selected(mask: &GrayImage) -> usize {
        mask.pixels().filter(|p| p[0] > 0).count()
    }

    #[test]
    fn test_label_components_disjoint_regions() {
        let mut mask = GrayImage::new(20, 20);
        fill_rect(&mut mask, 0, 0, 3, 3);
        fill_rect(&mut mask, 10, 10, 15, 15);

        let components = label_components(&mask);
        assert_eq!(components.count(), 2);

        let mut areas: Vec<usize> = components.areas[1..].to_vec();
        areas.sort_unstable();
        assert_eq!(areas, vec![9, 25]);
    }

    #[test]
    fn test_label_components_diagonal_touch_is_connected() {
        // 8-connectivity joins diagonal neighbors into one region.
        let mut mask = GrayImage::new(4, 4);
        mask.put_pixel(0, 0, image::Luma([255]));
        mask.put_pixel(1, 1, image::Luma([255]));

        let components = label_components(&mask);
        assert_eq!(components.count(), 1);
    }

    #[test]
    fn test_min_area_drops_all_small_regions() {
        let mut params = PipelineParams::default();
        params.min_area_ratio = 0.05; // 20 px floor on a 20x20 frame

        let mut mask = GrayImage::new(20, 20);
        fill_rect(&mut mask, 0, 0, 3, 3); // 9 px
        fill_rect(&mut mask, 10, 0, 13, 4); // 12 px

        let out = MinAreaFilter.apply(mask, &blank_frame(20, 20), &params);
        assert_eq!(count_selected(&out), 0);
    }

    #[test]
    fn test_min_area_keeps_and_fills_large_region() {
        let mut params = PipelineParams::default();
        params.min_area_ratio = 0.05;

        // A 10x10 ring with a hollow center: 100 - 36 = 64 px of outline.
        let mut mask = GrayImage::new(20, 20);
        fill_rect(&mut mask, 5, 5, 15, 15);
        for y in 7..13 {
            for x in 7..13 {
                mask.put_pixel(x, y, image::Luma([0]));
            }
        }

        let out = MinAreaFilter.apply(mask, &blank_frame(20, 20), &params);
        // Interior holes are filled on the way through.
        assert_eq!(count_selected(&out), 100);
    }

    #[test]
    fn test_keep_largest_retains_single_biggest() {
        let mut mask = GrayImage::new(30, 30);
        fill_rect(&mut mask, 0, 0, 4, 4); // 16 px
        fill_rect(&mut mask, 10, 10, 18, 18); // 64 px
        fill_rect(&mut mask, 24, 24, 29, 29); // 25 px

        let params = PipelineParams::default();
        let out = KeepLargestFilter.apply(mask, &blank_frame(30, 30), &params);

        assert_eq!(count_selected(&out), 64);
        assert_eq!(out.get_pixel(14, 14)[0], 255);
        assert_eq!(out.get_pixel(1, 1)[0], 0);
        assert_eq!(out.get_pixel(26, 26)[0], 0);
    }

    #[test]
    fn test_keep_largest_single_region_unchanged() {
        let mut mask = GrayImage::new(10, 10);
        fill_rect(&mut mask, 2, 2, 6, 6);
        let before = mask.clone();

        let params = PipelineParams::default();
        let out = KeepLargestFilter.apply(mask, &blank_frame(10, 10), &params);
        assert_eq!(out, before);
    }

    #[test]
    fn test_skin_protect_subtracts_skin_pixels() {
        // Left half skin-toned, right half saturated red.
        let mut frame = blank_frame(10, 10);
        for y in 0..10 {
            for x in 0..10 {
                let color = if x < 5 {
                    Rgb([205, 140, 110]) // lands inside the chroma window
                } else {
                    Rgb([255, 0, 0])
                };
                frame.put_pixel(x, y, color);
            }
        }

        let mut mask = GrayImage::new(10, 10);
        fill_rect(&mut mask, 0, 0, 10, 10);

        let params = PipelineParams::default();
        let out = SkinProtectFilter.apply(mask, &frame, &params);

        assert_eq!(out.get_pixel(2, 5)[0], 0);
        assert_eq!(out.get_pixel(7, 5)[0], 255);
    }

    #[test]
    fn test_chain_respects_gates() {
        // All gates off: the chain is the identity.
        let mut mask = GrayImage::new(8, 8);
        mask.put_pixel(3, 3, image::Luma([255]));
        let before = mask.clone();

        let chain = MaskFilterChain::standard();
        let params = PipelineParams::default();
        let out = chain.filter(mask, &blank_frame(8, 8), &params);
        assert_eq!(out, before);
    }

    #[test]
    fn test_chain_preserves_dimensions() {
        let mut params = PipelineParams::default();
        params.min_area_ratio = 0.1;
        params.keep_largest = true;
        params.skin_protect = true;

        let mask = GrayImage::new(17, 23);
        let chain = MaskFilterChain::standard();
        let out = chain.filter(mask, &blank_frame(17, 23), &params);
        assert_eq!(out.dimensions(), (17, 23));
    }
}
