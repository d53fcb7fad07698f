//! Shared numeric constants for the canvas crate.

use std::f64::consts::PI;

// ── Erase ───────────────────────────────────────────────────────

/// Maximum normalized distance from an erase click to the nearest path point
/// for that path to be removed (about 5% of the page span).
pub const ERASE_THRESHOLD: f64 = 0.05;

// ── Tools ───────────────────────────────────────────────────────

/// Default pen color (red).
pub const DEFAULT_PEN_COLOR: &str = "#EF4444";

/// Default pen stroke width in CSS pixels.
pub const DEFAULT_PEN_WIDTH: f64 = 3.0;

/// Fixed highlighter stroke width in CSS pixels.
pub const HIGHLIGHTER_WIDTH: f64 = 15.0;

/// Fixed translucent highlighter color.
pub const HIGHLIGHTER_COLOR: &str = "rgba(250, 204, 21, 0.5)";

/// Default text annotation font size as a fraction of surface height.
pub const DEFAULT_TEXT_SIZE: f64 = 0.04;

/// Pointer travel (CSS pixels) under which a down/up pair counts as a click.
pub const CLICK_SLOP_PX: f64 = 4.0;

// ── Layout ──────────────────────────────────────────────────────

/// Fraction of the container the fitted page occupies.
pub const PAGE_MARGIN_FACTOR: f64 = 0.95;

/// US Letter page size in PDF points, used when a page has no `MediaBox`.
pub const DEFAULT_PAGE_WIDTH_PT: f64 = 612.0;
/// See [`DEFAULT_PAGE_WIDTH_PT`].
pub const DEFAULT_PAGE_HEIGHT_PT: f64 = 792.0;

// ── Rendering ───────────────────────────────────────────────────

/// Arrowhead length per unit of stroke width.
pub const ARROW_HEAD_PER_WIDTH: f64 = 4.0;

/// Lower bound on arrowhead length in CSS pixels.
pub const ARROW_HEAD_MIN_PX: f64 = 8.0;

/// Arrowhead half-angle in radians (30°).
pub const ARROW_HEAD_ANGLE: f64 = PI / 6.0;

/// Laser indicator radius in CSS pixels.
pub const LASER_RADIUS_PX: f64 = 8.0;

/// Laser indicator fill color.
pub const LASER_COLOR: &str = "#EF4444";
