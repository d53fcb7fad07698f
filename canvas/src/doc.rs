//! Document model: annotation types and the per-page annotation store.
//!
//! This module defines what a presenter has drawn on each slide
//! (`Annotation`, `Mark`, `ShapeKind`) and the runtime store that owns all of
//! it (`AnnotationStore`). Geometry is kept in normalized page space so it
//! survives resizes and pixel-density changes untouched.
//!
//! Data flows into this layer from the input engine (pointer gestures and text
//! commits). The renderer reads a page's sequence through
//! [`AnnotationStore::page`]; sequence order is both draw order and undo order.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::Point;

/// Unique identifier for an annotation.
pub type AnnotationId = Uuid;

/// 1-based page number.
pub type PageNumber = u32;

/// The outline drawn by a shape annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    /// Axis-aligned box between the two corner points.
    Rectangle,
    /// Ellipse inscribed in the box between the two corner points.
    Circle,
    /// Line from start to end with an arrowhead at the end.
    Arrow,
}

/// Variant-specific payload of an annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Mark {
    /// Freehand stroke. Points are in drawing order.
    Path {
        points: Vec<Point>,
        /// Drawn with multiply blending so overlapping strokes darken.
        #[serde(default)]
        highlighter: bool,
    },
    /// Text placed at an anchor point.
    Text {
        anchor: Point,
        text: String,
        /// Font size as a fraction of the surface height.
        size: f64,
    },
    /// Rectangle, circle, or arrow spanning two points.
    Shape { shape: ShapeKind, start: Point, end: Point },
}

/// One mark on a page, as stored and as handed to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Unique identifier for this annotation.
    pub id: AnnotationId,
    /// Stroke (or text fill) color as a CSS color string.
    pub color: String,
    /// Stroke width in CSS pixels.
    pub width: f64,
    /// Variant payload.
    #[serde(flatten)]
    pub mark: Mark,
}

impl Annotation {
    /// A new freehand stroke seeded with its first point.
    #[must_use]
    pub fn path(color: impl Into<String>, width: f64, first: Point, highlighter: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            color: color.into(),
            width,
            mark: Mark::Path { points: vec![first], highlighter },
        }
    }

    /// A new text annotation.
    #[must_use]
    pub fn text(color: impl Into<String>, width: f64, anchor: Point, text: impl Into<String>, size: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            color: color.into(),
            width,
            mark: Mark::Text { anchor, text: text.into(), size },
        }
    }

    /// A new shape whose start and end both sit at `at`.
    #[must_use]
    pub fn shape(shape: ShapeKind, color: impl Into<String>, width: f64, at: Point) -> Self {
        Self {
            id: Uuid::new_v4(),
            color: color.into(),
            width,
            mark: Mark::Shape { shape, start: at, end: at },
        }
    }
}

/// In-memory store of annotations, keyed by page.
///
/// Pages never written to and pages that were cleared both read as an empty
/// sequence. `revision` increases on every mutation that changes something and
/// never on a no-op, so observers can detect change by comparing revisions.
#[derive(Debug, Default)]
pub struct AnnotationStore {
    pages: HashMap<PageNumber, Vec<Annotation>>,
    revision: u64,
}

impl AnnotationStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The ordered annotations for `page` (empty if none).
    #[must_use]
    pub fn page(&self, page: PageNumber) -> &[Annotation] {
        self.pages.get(&page).map(Vec::as_slice).unwrap_or_default()
    }

    /// Current mutation counter.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Append an annotation at the end (top) of the page's sequence.
    pub fn append(&mut self, page: PageNumber, annotation: Annotation) {
        self.pages.entry(page).or_default().push(annotation);
        self.bump();
    }

    /// Extend the most recent annotation on `page` with `point`.
    ///
    /// Paths gain a point; shapes move their end point; text is left alone.
    /// Returns false if nothing changed.
    pub fn update_last(&mut self, page: PageNumber, point: Point) -> bool {
        let Some(last) = self.pages.get_mut(&page).and_then(|seq| seq.last_mut()) else {
            return false;
        };
        match &mut last.mark {
            Mark::Path { points, .. } => points.push(point),
            Mark::Shape { end, .. } => *end = point,
            Mark::Text { .. } => return false,
        }
        self.bump();
        true
    }

    /// Remove and return the most recent annotation on `page`.
    pub fn undo(&mut self, page: PageNumber) -> Option<Annotation> {
        let removed = self.pages.get_mut(&page).and_then(Vec::pop)?;
        self.bump();
        Some(removed)
    }

    /// Remove every annotation on `page`. Other pages are untouched.
    ///
    /// Returns false if the page was already empty.
    pub fn clear(&mut self, page: PageNumber) -> bool {
        let Some(seq) = self.pages.get_mut(&page) else {
            return false;
        };
        if seq.is_empty() {
            return false;
        }
        seq.clear();
        self.bump();
        true
    }

    /// Delete the path on `page` with the point nearest to `point`, if that
    /// distance is under `threshold`.
    ///
    /// Every point of every path is considered; the path holding the global
    /// minimum wins, with ties going to the path scanned first. Text and shape
    /// annotations are never removed. Returns the deleted annotation.
    pub fn erase_near(&mut self, page: PageNumber, point: Point, threshold: f64) -> Option<Annotation> {
        let seq = self.pages.get_mut(&page)?;

        let mut nearest: Option<(usize, f64)> = None;
        for (idx, annotation) in seq.iter().enumerate() {
            let Mark::Path { points, .. } = &annotation.mark else {
                continue;
            };
            for p in points {
                let dist = p.distance(point);
                if nearest.map_or(true, |(_, min)| dist < min) {
                    nearest = Some((idx, dist));
                }
            }
        }

        let (idx, min) = nearest?;
        if min >= threshold {
            return None;
        }
        let removed = seq.remove(idx);
        self.bump();
        Some(removed)
    }

    /// Drop every page. Used when a new document is loaded.
    pub fn reset(&mut self) {
        if !self.is_empty() {
            self.bump();
        }
        self.pages.clear();
    }

    /// Total number of annotations across all pages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.values().map(Vec::len).sum()
    }

    /// Returns `true` if no page holds an annotation.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn bump(&mut self) {
        self.revision += 1;
    }
}
