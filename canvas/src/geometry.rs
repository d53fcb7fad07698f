//! Coordinate mapping between the overlay surface and normalized page space.
//!
//! Annotation geometry is stored in page space: `x` and `y` in `[0, 1]`
//! relative to the displayed page, so a re-render at any size or pixel
//! density reproduces the same placement. Pointer events arrive in surface
//! space (CSS pixels relative to the overlay's top-left corner).

#[cfg(test)]
#[path = "geometry_test.rs"]
mod geometry_test;

use serde::{Deserialize, Serialize};

/// A point in either surface space (CSS pixels) or normalized page space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Intrinsic size of a document page, in PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

/// The overlay drawing surface.
///
/// `width` / `height` are in CSS pixels. `dpr` is the device pixel ratio;
/// the backing store is `width * dpr` by `height * dpr` device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    pub width: f64,
    pub height: f64,
    pub dpr: f64,
}

impl Default for Surface {
    fn default() -> Self {
        Self { width: 0.0, height: 0.0, dpr: 1.0 }
    }
}

impl Surface {
    #[must_use]
    pub fn new(width: f64, height: f64, dpr: f64) -> Self {
        Self { width, height, dpr: if dpr > 0.0 { dpr } else { 1.0 } }
    }

    /// Size the surface so `page` fits inside the container, preserving the
    /// page aspect ratio and leaving a margin of `1 - margin_factor`.
    #[must_use]
    pub fn fit_page(page: PageSize, container_w: f64, container_h: f64, dpr: f64, margin_factor: f64) -> Self {
        if page.width <= 0.0 || page.height <= 0.0 || container_w <= 0.0 || container_h <= 0.0 {
            return Self::new(0.0, 0.0, dpr);
        }
        let scale = (container_w / page.width).min(container_h / page.height) * margin_factor;
        Self::new(page.width * scale, page.height * scale, dpr)
    }

    /// Whether the surface has no drawable area.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Convert a surface point (CSS pixels) to normalized page coordinates.
    ///
    /// Returns `None` when the surface has no area yet.
    #[must_use]
    pub fn to_page(&self, surface_pt: Point) -> Option<Point> {
        if self.is_empty() {
            return None;
        }
        Some(Point { x: surface_pt.x / self.width, y: surface_pt.y / self.height })
    }

    /// Convert a normalized page point to surface coordinates (CSS pixels).
    #[must_use]
    pub fn to_surface(&self, page_pt: Point) -> Point {
        Point { x: page_pt.x * self.width, y: page_pt.y * self.height }
    }

    /// Backing-store width in device pixels.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn backing_width(&self) -> u32 {
        (self.width * self.dpr).round().max(0.0) as u32
    }

    /// Backing-store height in device pixels.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn backing_height(&self) -> u32 {
        (self.height * self.dpr).round().max(0.0) as u32
    }
}
