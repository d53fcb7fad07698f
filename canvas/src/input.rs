//! Input model: tools, tool parameters, and the gesture state machine.
//!
//! `Tool` and `ToolParams` capture the presenter's intent at the time of a
//! pointer event. `InputState` is the gesture being tracked between
//! pointer-down and pointer-up, carrying what the engine needs to tell a
//! drag from a click and to finish a pending text entry.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_PEN_COLOR, DEFAULT_PEN_WIDTH};
use crate::doc::ShapeKind;
use crate::geometry::Point;

/// Which tool is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    /// No drawing; pointer events are ignored.
    #[default]
    Cursor,
    /// Freehand stroke in the current color and width.
    Pen,
    /// Wide translucent freehand stroke.
    Highlighter,
    /// Click to delete the nearest stroke.
    Eraser,
    /// Transient pointer indicator; never stored.
    Laser,
    /// Click to place a text annotation.
    Text,
    /// Drag to draw a rectangle.
    Rectangle,
    /// Drag to draw an ellipse.
    Circle,
    /// Drag to draw an arrow.
    Arrow,
}

impl Tool {
    /// Every tool, in toolbar order.
    pub const ALL: [Tool; 9] = [
        Tool::Cursor,
        Tool::Pen,
        Tool::Highlighter,
        Tool::Eraser,
        Tool::Laser,
        Tool::Text,
        Tool::Rectangle,
        Tool::Circle,
        Tool::Arrow,
    ];

    /// The shape this tool draws, if it is a shape tool.
    #[must_use]
    pub fn shape_kind(self) -> Option<ShapeKind> {
        match self {
            Self::Rectangle => Some(ShapeKind::Rectangle),
            Self::Circle => Some(ShapeKind::Circle),
            Self::Arrow => Some(ShapeKind::Arrow),
            _ => None,
        }
    }

    /// Whether this tool creates an annotation on pointer-down and grows it
    /// while dragging (pen, highlighter, shapes).
    #[must_use]
    pub fn is_drag_tool(self) -> bool {
        matches!(self, Self::Pen | Self::Highlighter) || self.shape_kind().is_some()
    }

    /// Whether this tool acts on a click rather than a drag.
    #[must_use]
    pub fn is_click_tool(self) -> bool {
        matches!(self, Self::Eraser | Self::Text)
    }

    /// CSS cursor to show over the overlay while this tool is active.
    #[must_use]
    pub fn css_cursor(self) -> &'static str {
        match self {
            Self::Cursor => "default",
            Self::Pen | Self::Highlighter | Self::Rectangle | Self::Circle | Self::Arrow => "crosshair",
            Self::Eraser => "cell",
            Self::Text => "text",
            Self::Laser => "none",
        }
    }

    /// Lowercase tool name, as used on the JS boundary.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cursor => "cursor",
            Self::Pen => "pen",
            Self::Highlighter => "highlighter",
            Self::Eraser => "eraser",
            Self::Laser => "laser",
            Self::Text => "text",
            Self::Rectangle => "rectangle",
            Self::Circle => "circle",
            Self::Arrow => "arrow",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a tool name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tool: {0}")]
pub struct UnknownTool(pub String);

impl FromStr for Tool {
    type Err = UnknownTool;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tool| tool.as_str() == s)
            .ok_or_else(|| UnknownTool(s.to_owned()))
    }
}

/// Drawing parameters shared by the pen, shape tools, and text color.
///
/// Changes apply only to annotations created afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParams {
    /// CSS color string.
    pub color: String,
    /// Stroke width in CSS pixels.
    pub width: f64,
}

impl Default for ToolParams {
    fn default() -> Self {
        Self { color: DEFAULT_PEN_COLOR.to_owned(), width: DEFAULT_PEN_WIDTH }
    }
}

/// Internal state for the gesture state machine.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InputState {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// A drag tool has appended an annotation and is growing it.
    Drawing {
        /// Page the annotation was appended to.
        page: u32,
    },
    /// A click tool saw pointer-down; pointer-up decides whether it was a click.
    Pressing {
        /// Surface-space position of the pointer-down.
        start: Point,
        /// Set once the pointer travels beyond the click slop.
        moved: bool,
    },
    /// The host is showing an inline text editor anchored here.
    TextEntry {
        /// Page the text will be committed to.
        page: u32,
        /// Normalized anchor of the pending text.
        anchor: Point,
    },
}

impl InputState {
    /// Whether a pointer gesture is currently in progress.
    #[must_use]
    pub fn is_gesture(&self) -> bool {
        matches!(self, Self::Drawing { .. } | Self::Pressing { .. })
    }
}
