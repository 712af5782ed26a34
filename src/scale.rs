// Copyright 2026 the Skylight Authors
// SPDX-License-Identifier: Apache-2.0

//! Resolution scale related helpers.

use kurbo::{Insets, Point, Rect, Size, Vec2};

/// Coordinate scaling between pixels and display points.
///
/// A pixel (**px**) is the smallest controllable area of color on the
/// platform. A display point (**dp**) is a resolution independent logical
/// unit; one pixel equals one display point at a scale factor of `1.0`.
/// The public API speaks display points, the X protocol speaks pixels.
///
/// A copy of `Scale` is stale as soon as the platform scale changes.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Scale {
    /// The scale factor on the x axis.
    x: f64,
    /// The scale factor on the y axis.
    y: f64,
}

/// The `Scalable` trait describes how coordinates should be translated
/// from display points into pixels and vice versa using a [`Scale`].
pub trait Scalable {
    /// Converts the scalable item from display points into pixels,
    /// using the x axis scale factor for coordinates on the x axis
    /// and the y axis scale factor for coordinates on the y axis.
    fn to_px(&self, scale: Scale) -> Self;

    /// Converts the scalable item from pixels into display points,
    /// using the x axis scale factor for coordinates on the x axis
    /// and the y axis scale factor for coordinates on the y axis.
    fn to_dp(&self, scale: Scale) -> Self;
}

impl Default for Scale {
    fn default() -> Scale {
        Scale { x: 1.0, y: 1.0 }
    }
}

impl Scale {
    /// Create a new `Scale` based on the specified axis factors.
    pub fn new(x: f64, y: f64) -> Scale {
        Scale { x, y }
    }

    /// Returns the x axis scale factor.
    #[inline]
    pub fn x(self) -> f64 {
        self.x
    }

    /// Returns the y axis scale factor.
    #[inline]
    pub fn y(self) -> f64 {
        self.y
    }
}

impl Scalable for Point {
    #[inline]
    fn to_px(&self, scale: Scale) -> Point {
        Point::new(self.x * scale.x, self.y * scale.y)
    }

    #[inline]
    fn to_dp(&self, scale: Scale) -> Point {
        Point::new(self.x / scale.x, self.y / scale.y)
    }
}

impl Scalable for Vec2 {
    #[inline]
    fn to_px(&self, scale: Scale) -> Vec2 {
        Vec2::new(self.x * scale.x, self.y * scale.y)
    }

    #[inline]
    fn to_dp(&self, scale: Scale) -> Vec2 {
        Vec2::new(self.x / scale.x, self.y / scale.y)
    }
}

impl Scalable for Size {
    #[inline]
    fn to_px(&self, scale: Scale) -> Size {
        Size::new(self.width * scale.x, self.height * scale.y)
    }

    #[inline]
    fn to_dp(&self, scale: Scale) -> Size {
        Size::new(self.width / scale.x, self.height / scale.y)
    }
}

impl Scalable for Rect {
    #[inline]
    fn to_px(&self, scale: Scale) -> Rect {
        Rect::new(
            self.x0 * scale.x,
            self.y0 * scale.y,
            self.x1 * scale.x,
            self.y1 * scale.y,
        )
    }

    #[inline]
    fn to_dp(&self, scale: Scale) -> Rect {
        Rect::new(
            self.x0 / scale.x,
            self.y0 / scale.y,
            self.x1 / scale.x,
            self.y1 / scale.y,
        )
    }
}

impl Scalable for Insets {
    #[inline]
    fn to_px(&self, scale: Scale) -> Insets {
        Insets::new(
            self.x0 * scale.x,
            self.y0 * scale.y,
            self.x1 * scale.x,
            self.y1 * scale.y,
        )
    }

    #[inline]
    fn to_dp(&self, scale: Scale) -> Insets {
        Insets::new(
            self.x0 / scale.x,
            self.y0 / scale.y,
            self.x1 / scale.x,
            self.y1 / scale.y,
        )
    }
}

/// Derives the screen's pixel density from its advertised physical size.
///
/// Falls back to 96 ppi when the server reports an implausibly small
/// physical width, which is common for virtual displays.
pub(crate) fn ppi_from_screen(width_px: u16, width_mm: u16) -> f64 {
    if width_mm < 24 {
        96.0
    } else {
        25.4 * f64::from(width_px) / f64::from(width_mm)
    }
}

/// Picks a pixel ratio for a screen density.
///
/// Densities at or below 96 ppi get a 1:1 ratio. Densities at or above
/// 192 ppi get an integer ratio so that no sub-pixel positioning is
/// needed. Everything in between is quantized to sixth steps.
pub(crate) fn pixel_ratio_from_ppi(ppi: f64) -> f64 {
    let s = (ppi / 16.0).round() as i64;
    if s <= 6 {
        1.0
    } else if s >= 12 {
        (s / 6) as f64
    } else {
        s as f64 / 6.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn px_dp_round_trip() {
        let scale = Scale::new(2.0, 2.0);
        let p = Point::new(10.0, 20.0);
        assert_eq!(p.to_px(scale), Point::new(20.0, 40.0));
        assert_eq!(p.to_px(scale).to_dp(scale), p);

        let s = Size::new(800.0, 600.0);
        assert_eq!(s.to_px(scale), Size::new(1600.0, 1200.0));
    }

    #[test]
    fn ppi_fallback_for_tiny_screens() {
        assert_eq!(ppi_from_screen(1920, 0), 96.0);
        assert_eq!(ppi_from_screen(1920, 23), 96.0);
        let ppi = ppi_from_screen(1920, 508);
        assert!((ppi - 96.0).abs() < 0.01);
    }

    #[test]
    fn pixel_ratio_thresholds() {
        // Low densities always map 1:1.
        assert_eq!(pixel_ratio_from_ppi(72.0), 1.0);
        assert_eq!(pixel_ratio_from_ppi(96.0), 1.0);
        // High densities snap to whole ratios.
        assert_eq!(pixel_ratio_from_ppi(192.0), 2.0);
        assert_eq!(pixel_ratio_from_ppi(300.0), 3.0);
        // The middle band moves in sixth steps.
        assert_eq!(pixel_ratio_from_ppi(144.0), 1.5);
        assert_eq!(pixel_ratio_from_ppi(128.0), 8.0 / 6.0);
    }
}
