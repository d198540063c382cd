//! Color models and target-color specification.
//!
//! Converts a user-supplied hex color into one or two HSV ranges used by the
//! mask builder. The hue axis is circular (0 and 179 are adjacent in the
//! 8-bit convention), so a tolerance window near either end is split into
//! two linear ranges covering the wrapped interval.
//!
//! Conversions follow the 8-bit OpenCV conventions so tuning values carry
//! over from common chroma-key references: hue in [0, 179], saturation and
//! value in [0, 255]; YCrCb with the chroma offset at 128.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Maximum hue in the 8-bit convention (degrees halved to fit a byte).
pub const HUE_MAX: u8 = 179;

/// Modulus of the circular hue axis.
const HUE_MOD: i32 = 180;

// ============================================================================
// ColorRange
// ============================================================================

/// Closed lower/upper bounds over an HSV triple.
///
/// A pixel matches when every component falls within the bounds, hue
/// included. Wrapped hue windows are represented as two ranges rather than
/// one range with `lower.h > upper.h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorRange {
    /// Inclusive lower bound `[h, s, v]`.
    pub lower: [u8; 3],
    /// Inclusive upper bound `[h, s, v]`.
    pub upper: [u8; 3],
}

impl ColorRange {
    /// Creates a range from inclusive bounds.
    #[inline]
    #[must_use]
    pub const fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    /// Returns `true` if the HSV triple falls within the closed bounds.
    #[inline]
    #[must_use]
    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|i| self.lower[i] <= hsv[i] && hsv[i] <= self.upper[i])
    }
}

// ============================================================================
// ColorSpec
// ============================================================================

/// Target-color specification derived from a hex color.
///
/// Only the hue of the target acts as the similarity anchor; saturation and
/// value floors reject washed-out and dark pixels.
pub struct ColorSpec;

impl ColorSpec {
    /// Converts a `#rrggbb` hex color into one or two HSV ranges.
    ///
    /// Computes `low = (hue - tolerance) mod 180` and
    /// `high = (hue + tolerance) mod 180`. When the window stays on one side
    /// of the hue origin a single range is emitted; otherwise the window
    /// wraps and two ranges together cover it. Wraparound handling is what
    /// makes red targets (hue near 0) work.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHexColor`] if `hex` does not parse as a
    /// 24-bit RGB triple. Format validation proper happens at the protocol
    /// layer; this parse is the last line of defense.
    pub fn from_hex(hex: &str, tolerance: u8, s_min: u8, v_min: u8) -> Result<Vec<ColorRange>> {
        let (r, g, b) = parse_hex_rgb(hex)?;
        let hue = i32::from(rgb_to_hsv(r, g, b)[0]);
        let tol = i32::from(tolerance);

        let low = (hue - tol).rem_euclid(HUE_MOD) as u8;
        let high = (hue + tol).rem_euclid(HUE_MOD) as u8;

        let ranges = if low <= high {
            vec![ColorRange::new([low, s_min, v_min], [high, 255, 255])]
        } else {
            vec![
                ColorRange::new([0, s_min, v_min], [high, 255, 255]),
                ColorRange::new([low, s_min, v_min], [HUE_MAX, 255, 255]),
            ]
        };

        Ok(ranges)
    }
}

/// Parses `#rrggbb` into an RGB triple.
fn parse_hex_rgb(hex: &str) -> Result<(u8, u8, u8)> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::invalid_hex_color(hex));
    }

    let parse = |s: &str| u8::from_str_radix(s, 16).map_err(|_| Error::invalid_hex_color(hex));
    Ok((
        parse(&digits[0..2])?,
        parse(&digits[2..4])?,
        parse(&digits[4..6])?,
    ))
}

// ============================================================================
// Color Model Conversions
// ============================================================================

/// Converts an RGB pixel to 8-bit HSV (hue in [0, 179]).
#[must_use]
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> [u8; 3] {
    let (rf, gf, bf) = (f32::from(r), f32::from(g), f32::from(b));
    let v = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let diff = v - min;

    let s = if v > 0.0 { 255.0 * diff / v } else { 0.0 };

    let h = if diff == 0.0 {
        0.0
    } else if v == rf {
        60.0 * (gf - bf) / diff
    } else if v == gf {
        120.0 + 60.0 * (bf - rf) / diff
    } else {
        240.0 + 60.0 * (rf - gf) / diff
    };
    let h = if h < 0.0 { h + 360.0 } else { h };

    [
        (h / 2.0).round().min(179.0) as u8,
        s.round() as u8,
        v as u8,
    ]
}

/// Converts an RGB pixel to 8-bit YCrCb (chroma centered at 128).
#[must_use]
pub fn rgb_to_ycrcb(r: u8, g: u8, b: u8) -> [u8; 3] {
    let (rf, gf, bf) = (f32::from(r), f32::from(g), f32::from(b));
    let y = 0.299 * rf + 0.587 * gf + 0.114 * bf;
    let cr = (rf - y) * 0.713 + 128.0;
    let cb = (bf - y) * 0.564 + 128.0;

    [
        y.round().clamp(0.0, 255.0) as u8,
        cr.round().clamp(0.0, 255.0) as u8,
        cb.round().clamp(0.0, 255.0) as u8,
    ]
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    #[test]
    fn test_pure_red_wraps_into_two_ranges() {
        let ranges = ColorSpec::from_hex("#ff0000", 10, 120, 70).expect("valid hex");

        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[0], ColorRange::new([0, 120, 70], [10, 255, 255]));
        assert_eq!(ranges[1], ColorRange::new([170, 120, 70], [179, 255, 255]));
    }

    #[test]
    fn test_pure_green_single_range() {
        // Hue 60 with tolerance 10 stays well inside the axis.
        let ranges = ColorSpec::from_hex("#00ff00", 10, 120, 70).expect("valid hex");

        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0], ColorRange::new([50, 120, 70], [70, 255, 255]));
    }

    #[test]
    fn test_invalid_hex_rejected() {
        assert!(ColorSpec::from_hex("notacolor", 10, 120, 70).is_err());
        assert!(ColorSpec::from_hex("#12345", 10, 120, 70).is_err());
        assert!(ColorSpec::from_hex("#12345g", 10, 120, 70).is_err());
    }

    #[test]
    fn test_hsv_known_values() {
        assert_eq!(rgb_to_hsv(255, 0, 0), [0, 255, 255]);
        assert_eq!(rgb_to_hsv(0, 255, 0), [60, 255, 255]);
        assert_eq!(rgb_to_hsv(0, 0, 255), [120, 255, 255]);
        assert_eq!(rgb_to_hsv(0, 0, 0), [0, 0, 0]);
        assert_eq!(rgb_to_hsv(255, 255, 255), [0, 0, 255]);
    }

    #[test]
    fn test_ycrcb_known_values() {
        // Neutral gray carries no chroma.
        assert_eq!(rgb_to_ycrcb(128, 128, 128), [128, 128, 128]);
        // Pure red pushes Cr far above center.
        let [_, cr, cb] = rgb_to_ycrcb(255, 0, 0);
        assert!(cr > 200);
        assert!(cb < 128);
    }

    #[test]
    fn test_range_contains_is_closed() {
        let range = ColorRange::new([10, 120, 70], [20, 255, 255]);
        assert!(range.contains([10, 120, 70]));
        assert!(range.contains([20, 255, 255]));
        assert!(!range.contains([9, 255, 255]));
        assert!(!range.contains([21, 255, 255]));
        assert!(!range.contains([15, 119, 255]));
    }

    proptest! {
        /// A window that crosses the hue origin splits in two; every other
        /// window stays a single range. Coverage of the wrapped interval is
        /// exact in both cases.
        #[test]
        fn prop_wraparound_range_count(r: u8, g: u8, b: u8, tol in 1u8..=89) {
            let hex = format!("#{r:02x}{g:02x}{b:02x}");
            let hue = i32::from(rgb_to_hsv(r, g, b)[0]);
            let ranges = ColorSpec::from_hex(&hex, tol, 120, 70).expect("valid hex");

            let wraps = hue - i32::from(tol) < 0 || hue + i32::from(tol) > 179;
            prop_assert_eq!(ranges.len(), if wraps { 2 } else { 1 });

            // Hue coverage: each hue inside the window matches exactly one range.
            for h in 0..=179u8 {
                let dist = (i32::from(h) - hue).rem_euclid(180).min(
                    (hue - i32::from(h)).rem_euclid(180),
                );
                let inside = dist <= i32::from(tol);
                let hit = ranges
                    .iter()
                    .filter(|rg| rg.contains([h, 255, 255]))
                    .count();
                prop_assert_eq!(hit > 0, inside);
            }
        }
    }
}
