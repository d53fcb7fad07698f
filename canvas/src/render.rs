//! Rendering: replays a page's annotations onto the overlay surface.
//!
//! Drawing goes through the [`Painter`] trait, a narrow slice of the
//! `Canvas2D` API. The browser implementation for
//! [`web_sys::CanvasRenderingContext2d`] lives here and is the only place
//! that touches the context. This module reads annotation state and produces
//! pixels; it never mutates application state.
//!
//! Every frame is a full clear and redraw in sequence order, so the overlay
//! always matches the store exactly.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use crate::consts::{ARROW_HEAD_ANGLE, ARROW_HEAD_MIN_PX, ARROW_HEAD_PER_WIDTH, LASER_COLOR, LASER_RADIUS_PX};
use crate::doc::{Annotation, Mark, ShapeKind};
use crate::geometry::{Point, Surface};

/// Compositing used for highlighter strokes.
pub const MULTIPLY: &str = "multiply";
/// Default compositing.
pub const SOURCE_OVER: &str = "source-over";

/// The drawing operations the overlay needs.
///
/// Infallible setters mirror the `Canvas2D` calls that cannot throw.
pub trait Painter {
    type Error;

    fn set_transform(&self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Result<(), Self::Error>;
    fn clear_rect(&self, x: f64, y: f64, w: f64, h: f64);
    fn save(&self);
    fn restore(&self);

    fn set_stroke_style(&self, style: &str);
    fn set_fill_style(&self, style: &str);
    fn set_line_width(&self, width: f64);
    fn set_line_cap(&self, cap: &str);
    fn set_line_join(&self, join: &str);
    fn set_composite(&self, op: &str) -> Result<(), Self::Error>;
    fn set_font(&self, font: &str);
    fn set_text_baseline(&self, baseline: &str);

    fn begin_path(&self);
    fn move_to(&self, x: f64, y: f64);
    fn line_to(&self, x: f64, y: f64);
    fn close_path(&self);
    fn ellipse(&self, x: f64, y: f64, rx: f64, ry: f64) -> Result<(), Self::Error>;
    fn stroke(&self);
    fn fill(&self);
    fn stroke_rect(&self, x: f64, y: f64, w: f64, h: f64);
    fn fill_text(&self, text: &str, x: f64, y: f64) -> Result<(), Self::Error>;
}

impl Painter for CanvasRenderingContext2d {
    type Error = JsValue;

    fn set_transform(&self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Result<(), JsValue> {
        CanvasRenderingContext2d::set_transform(self, a, b, c, d, e, f)
    }

    fn clear_rect(&self, x: f64, y: f64, w: f64, h: f64) {
        CanvasRenderingContext2d::clear_rect(self, x, y, w, h);
    }

    fn save(&self) {
        CanvasRenderingContext2d::save(self);
    }

    fn restore(&self) {
        CanvasRenderingContext2d::restore(self);
    }

    fn set_stroke_style(&self, style: &str) {
        self.set_stroke_style_str(style);
    }

    fn set_fill_style(&self, style: &str) {
        self.set_fill_style_str(style);
    }

    fn set_line_width(&self, width: f64) {
        CanvasRenderingContext2d::set_line_width(self, width);
    }

    fn set_line_cap(&self, cap: &str) {
        CanvasRenderingContext2d::set_line_cap(self, cap);
    }

    fn set_line_join(&self, join: &str) {
        CanvasRenderingContext2d::set_line_join(self, join);
    }

    fn set_composite(&self, op: &str) -> Result<(), JsValue> {
        self.set_global_composite_operation(op)
    }

    fn set_font(&self, font: &str) {
        CanvasRenderingContext2d::set_font(self, font);
    }

    fn set_text_baseline(&self, baseline: &str) {
        CanvasRenderingContext2d::set_text_baseline(self, baseline);
    }

    fn begin_path(&self) {
        CanvasRenderingContext2d::begin_path(self);
    }

    fn move_to(&self, x: f64, y: f64) {
        CanvasRenderingContext2d::move_to(self, x, y);
    }

    fn line_to(&self, x: f64, y: f64) {
        CanvasRenderingContext2d::line_to(self, x, y);
    }

    fn close_path(&self) {
        CanvasRenderingContext2d::close_path(self);
    }

    fn ellipse(&self, x: f64, y: f64, rx: f64, ry: f64) -> Result<(), JsValue> {
        CanvasRenderingContext2d::ellipse(self, x, y, rx, ry, 0.0, 0.0, 2.0 * PI)
    }

    fn stroke(&self) {
        CanvasRenderingContext2d::stroke(self);
    }

    fn fill(&self) {
        CanvasRenderingContext2d::fill(self);
    }

    fn stroke_rect(&self, x: f64, y: f64, w: f64, h: f64) {
        CanvasRenderingContext2d::stroke_rect(self, x, y, w, h);
    }

    fn fill_text(&self, text: &str, x: f64, y: f64) -> Result<(), JsValue> {
        CanvasRenderingContext2d::fill_text(self, text, x, y)
    }
}

/// Draw one frame: clear the surface, replay `annotations` in order, then the
/// laser indicator if one is showing.
///
/// Assumes the backing store is already sized to the surface; the transform
/// is reset to scale by the device pixel ratio so all drawing is in CSS pixels.
///
/// # Errors
///
/// Returns `Err` if any fallible painter call fails.
pub fn draw<P: Painter>(
    painter: &P,
    annotations: &[Annotation],
    surface: &Surface,
    laser: Option<Point>,
) -> Result<(), P::Error> {
    painter.set_transform(surface.dpr, 0.0, 0.0, surface.dpr, 0.0, 0.0)?;
    painter.clear_rect(0.0, 0.0, surface.width, surface.height);
    if surface.is_empty() {
        return Ok(());
    }

    for annotation in annotations {
        draw_annotation(painter, annotation, surface)?;
    }

    if let Some(at) = laser {
        draw_laser(painter, surface.to_surface(at))?;
    }
    Ok(())
}

// =============================================================
// Annotation dispatch
// =============================================================

fn draw_annotation<P: Painter>(painter: &P, annotation: &Annotation, surface: &Surface) -> Result<(), P::Error> {
    match &annotation.mark {
        Mark::Path { points, highlighter } => draw_path(painter, annotation, points, *highlighter, surface),
        Mark::Text { anchor, text, size } => draw_text(painter, annotation, *anchor, text, *size, surface),
        Mark::Shape { shape, start, end } => {
            let a = surface.to_surface(*start);
            let b = surface.to_surface(*end);
            painter.save();
            painter.set_stroke_style(&annotation.color);
            painter.set_fill_style(&annotation.color);
            painter.set_line_width(annotation.width);
            painter.set_line_cap("round");
            painter.set_line_join("round");
            let drawn = match shape {
                ShapeKind::Rectangle => {
                    painter.stroke_rect(a.x.min(b.x), a.y.min(b.y), (b.x - a.x).abs(), (b.y - a.y).abs());
                    Ok(())
                }
                ShapeKind::Circle => draw_ellipse(painter, a, b),
                ShapeKind::Arrow => {
                    draw_arrow(painter, a, b, annotation.width);
                    Ok(())
                }
            };
            painter.restore();
            drawn
        }
    }
}

// =============================================================
// Renderers
// =============================================================

fn draw_path<P: Painter>(
    painter: &P,
    annotation: &Annotation,
    points: &[Point],
    highlighter: bool,
    surface: &Surface,
) -> Result<(), P::Error> {
    let Some((first, rest)) = points.split_first() else {
        return Ok(());
    };

    painter.begin_path();
    painter.set_stroke_style(&annotation.color);
    painter.set_line_width(annotation.width);
    painter.set_line_cap("round");
    painter.set_line_join("round");
    painter.set_composite(if highlighter { MULTIPLY } else { SOURCE_OVER })?;

    let start = surface.to_surface(*first);
    painter.move_to(start.x, start.y);
    if rest.is_empty() {
        // A single point still shows as a round dot.
        painter.line_to(start.x, start.y);
    }
    for p in rest {
        let p = surface.to_surface(*p);
        painter.line_to(p.x, p.y);
    }
    painter.stroke();

    painter.set_composite(SOURCE_OVER)
}

fn draw_text<P: Painter>(
    painter: &P,
    annotation: &Annotation,
    anchor: Point,
    text: &str,
    size: f64,
    surface: &Surface,
) -> Result<(), P::Error> {
    let at = surface.to_surface(anchor);
    painter.save();
    painter.set_fill_style(&annotation.color);
    painter.set_font(&format!("{}px sans-serif", font_px(size, surface)));
    painter.set_text_baseline("top");
    let drawn = painter.fill_text(text, at.x, at.y);
    painter.restore();
    drawn
}

/// Font size in CSS pixels for a text annotation of relative `size`.
#[must_use]
pub fn font_px(size: f64, surface: &Surface) -> f64 {
    (size * surface.height).round().max(1.0)
}

fn draw_ellipse<P: Painter>(painter: &P, a: Point, b: Point) -> Result<(), P::Error> {
    let cx = (a.x + b.x) / 2.0;
    let cy = (a.y + b.y) / 2.0;
    painter.begin_path();
    painter.ellipse(cx, cy, (b.x - a.x).abs() / 2.0, (b.y - a.y).abs() / 2.0)?;
    painter.stroke();
    Ok(())
}

fn draw_arrow<P: Painter>(painter: &P, a: Point, b: Point, width: f64) {
    painter.begin_path();
    painter.move_to(a.x, a.y);
    painter.line_to(b.x, b.y);
    painter.stroke();

    let angle = (b.y - a.y).atan2(b.x - a.x);
    let [left, right] = arrowhead(b, angle, width);
    painter.begin_path();
    painter.move_to(b.x, b.y);
    painter.line_to(left.x, left.y);
    painter.line_to(right.x, right.y);
    painter.close_path();
    painter.fill();
}

/// The two base corners of an arrowhead whose tip is at `tip`.
#[must_use]
pub fn arrowhead(tip: Point, angle: f64, width: f64) -> [Point; 2] {
    let len = (width * ARROW_HEAD_PER_WIDTH).max(ARROW_HEAD_MIN_PX);
    [
        Point::new(tip.x - len * (angle - ARROW_HEAD_ANGLE).cos(), tip.y - len * (angle - ARROW_HEAD_ANGLE).sin()),
        Point::new(tip.x - len * (angle + ARROW_HEAD_ANGLE).cos(), tip.y - len * (angle + ARROW_HEAD_ANGLE).sin()),
    ]
}

fn draw_laser<P: Painter>(painter: &P, at: Point) -> Result<(), P::Error> {
    painter.save();
    painter.begin_path();
    painter.ellipse(at.x, at.y, LASER_RADIUS_PX, LASER_RADIUS_PX)?;
    painter.set_fill_style(LASER_COLOR);
    painter.fill();
    painter.set_stroke_style("#fff");
    painter.set_line_width(2.0);
    painter.stroke();
    painter.restore();
    Ok(())
}
