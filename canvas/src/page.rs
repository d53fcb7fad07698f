//! Document pages: decoding the loaded document and scheduling page renders.
//!
//! `PageDocument` is the engine's view of the loaded file: how many pages it
//! has and each page's intrinsic size. Rasterizing a page is slow and
//! asynchronous, so every render is tagged with a `RenderTicket` from the
//! `RenderScheduler`. Starting a new render cancels the one in flight, and a
//! completion whose ticket is no longer current is discarded.

#[cfg(test)]
#[path = "page_test.rs"]
mod page_test;

use lopdf::{Dictionary, Document, Object};

use crate::consts::{DEFAULT_PAGE_HEIGHT_PT, DEFAULT_PAGE_WIDTH_PT};
use crate::doc::PageNumber;
use crate::geometry::{PageSize, Surface};

/// How far into the file the `%PDF-` marker may appear.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// Why a document blob could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("document is empty")]
    Empty,
    #[error("document is not a PDF")]
    NotPdf,
    #[error("failed to parse document: {0}")]
    Parse(String),
    #[error("document has no pages")]
    NoPages,
    #[error("viewer rejected the document: {0}")]
    Viewer(String),
}

/// A decoded document: page count and per-page display size.
#[derive(Debug, Clone, PartialEq)]
pub struct PageDocument {
    sizes: Vec<PageSize>,
}

impl PageDocument {
    /// Decode a PDF blob.
    ///
    /// # Errors
    ///
    /// Returns a [`LoadError`] if the blob is empty, lacks a PDF header, does
    /// not parse, or has no pages.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LoadError> {
        if bytes.is_empty() {
            return Err(LoadError::Empty);
        }
        let window = &bytes[..bytes.len().min(HEADER_SEARCH_WINDOW)];
        if !window.windows(5).any(|w| w == b"%PDF-") {
            return Err(LoadError::NotPdf);
        }

        let doc = Document::load_mem(bytes).map_err(|e| LoadError::Parse(e.to_string()))?;
        let sizes: Vec<PageSize> = doc.get_pages().values().map(|&id| page_size(&doc, id)).collect();
        if sizes.is_empty() {
            return Err(LoadError::NoPages);
        }
        log::info!("loaded document: {} pages", sizes.len());
        Ok(Self { sizes })
    }

    /// Build a document from known page sizes, without decoding anything.
    ///
    /// Returns `None` for an empty list.
    #[cfg(test)]
    #[must_use]
    pub(crate) fn from_sizes(sizes: Vec<PageSize>) -> Option<Self> {
        if sizes.is_empty() { None } else { Some(Self { sizes }) }
    }

    /// Number of pages, at least 1.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn page_count(&self) -> PageNumber {
        self.sizes.len().min(PageNumber::MAX as usize) as PageNumber
    }

    /// Display size of a 1-based page.
    #[must_use]
    pub fn page_size(&self, page: PageNumber) -> Option<PageSize> {
        let idx = usize::try_from(page.checked_sub(1)?).unwrap_or(usize::MAX);
        self.sizes.get(idx).copied()
    }
}

/// Resolve a page's display size: `MediaBox` from the page or its nearest
/// ancestor, swapped for quarter-turn `Rotate` values.
fn page_size(doc: &Document, page_id: lopdf::ObjectId) -> PageSize {
    let (width, height) = inherited(doc, page_id, |dict| media_box(doc, dict))
        .unwrap_or((DEFAULT_PAGE_WIDTH_PT, DEFAULT_PAGE_HEIGHT_PT));
    let rotate = inherited(doc, page_id, |dict| entry(doc, dict, b"Rotate").and_then(number)).unwrap_or(0.0);
    if quarter_turns(rotate).rem_euclid(2) == 1 {
        PageSize { width: height, height: width }
    } else {
        PageSize { width, height }
    }
}

/// Walk the page tree upward from `id` until `read` finds a value.
fn inherited<T>(doc: &Document, id: lopdf::ObjectId, read: impl Fn(&Dictionary) -> Option<T>) -> Option<T> {
    let mut current = Some(id);
    let mut depth = 0;
    while let Some(id) = current {
        // Guards against cycles in a malformed page tree.
        depth += 1;
        if depth > 64 {
            return None;
        }
        let Ok(dict) = doc.get_object(id).and_then(Object::as_dict) else {
            return None;
        };
        if let Some(value) = read(dict) {
            return Some(value);
        }
        current = match dict.get(b"Parent") {
            Ok(Object::Reference(parent)) => Some(*parent),
            _ => None,
        };
    }
    None
}

fn media_box(doc: &Document, dict: &Dictionary) -> Option<(f64, f64)> {
    let Object::Array(arr) = entry(doc, dict, b"MediaBox")? else {
        return None;
    };
    let [llx, lly, urx, ury] = arr.as_slice() else {
        return None;
    };
    let width = (number(urx)? - number(llx)?).abs();
    let height = (number(ury)? - number(lly)?).abs();
    if width > 0.0 && height > 0.0 { Some((width, height)) } else { None }
}

/// Look up `key`, following one level of indirection.
fn entry<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    match dict.get(key) {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(obj) => Some(obj),
            Err(_) => None,
        },
        Ok(obj) => Some(obj),
        Err(_) => None,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn quarter_turns(degrees: f64) -> i64 {
    (degrees / 90.0).round() as i64
}

#[allow(clippy::cast_precision_loss)]
fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some(f64::from(*f)),
        _ => None,
    }
}

// ── Render scheduling ───────────────────────────────────────────

/// Handle to an in-flight page rasterization that can be told to stop.
pub trait RenderTask {
    fn cancel(&mut self);
}

/// Identifies one page render request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderTicket {
    generation: u64,
    /// Page to rasterize.
    pub page: PageNumber,
    /// Surface the page is rasterized for.
    pub surface: Surface,
}

impl RenderTicket {
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// What the rasterizer reports when a task ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    Rendered,
    Cancelled,
    Failed(String),
}

/// How the engine treats a finished render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderCompletion {
    /// The ticket was current and the page is now on screen.
    Applied,
    /// A newer render superseded this one; its result is dropped.
    Stale,
    /// The current render was cancelled before finishing.
    Cancelled,
    /// The current render failed.
    Failed(String),
}

/// Issues render tickets and tracks the one in flight.
#[derive(Default)]
pub struct RenderScheduler {
    generation: u64,
    in_flight: Option<Box<dyn RenderTask>>,
}

impl RenderScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new render, cancelling whatever is in flight.
    pub fn begin(&mut self, page: PageNumber, surface: Surface) -> RenderTicket {
        self.cancel_in_flight();
        self.generation += 1;
        RenderTicket { generation: self.generation, page, surface }
    }

    /// Register the task carrying out `ticket` so a later `begin` can cancel it.
    ///
    /// A task for a ticket that is already stale is cancelled immediately.
    pub fn attach(&mut self, ticket: &RenderTicket, mut task: Box<dyn RenderTask>) -> bool {
        if !self.is_current(ticket) {
            task.cancel();
            return false;
        }
        self.cancel_in_flight();
        self.in_flight = Some(task);
        true
    }

    /// Whether `ticket` is the most recently issued one.
    #[must_use]
    pub fn is_current(&self, ticket: &RenderTicket) -> bool {
        ticket.generation == self.generation
    }

    /// Settle a finished render.
    pub fn finish(&mut self, ticket: &RenderTicket, outcome: RenderOutcome) -> RenderCompletion {
        if !self.is_current(ticket) {
            log::debug!("discarding stale render of page {} (gen {})", ticket.page, ticket.generation);
            return RenderCompletion::Stale;
        }
        self.in_flight = None;
        match outcome {
            RenderOutcome::Rendered => RenderCompletion::Applied,
            RenderOutcome::Cancelled => {
                log::debug!("render of page {} cancelled", ticket.page);
                RenderCompletion::Cancelled
            }
            RenderOutcome::Failed(message) => {
                log::warn!("render of page {} failed: {message}", ticket.page);
                RenderCompletion::Failed(message)
            }
        }
    }

    /// Cancel the in-flight task and invalidate every outstanding ticket.
    pub fn reset(&mut self) {
        self.cancel_in_flight();
        self.generation += 1;
    }

    fn cancel_in_flight(&mut self) {
        if let Some(mut task) = self.in_flight.take() {
            task.cancel();
        }
    }
}
