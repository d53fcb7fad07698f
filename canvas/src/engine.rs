//! Engine: the single owner of presenter state.
//!
//! `EngineCore` holds the annotation store, page cursor, tool state, overlay
//! surface, and render scheduler, and turns host events into store mutations.
//! Every handler returns a list of [`Action`]s telling the host what to do
//! next (redraw, rasterize a page, show the text editor). `Engine` wraps the
//! core and owns the browser overlay canvas.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use serde::{Deserialize, Serialize};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::consts::{
    CLICK_SLOP_PX, DEFAULT_PEN_COLOR, DEFAULT_PEN_WIDTH, DEFAULT_TEXT_SIZE, ERASE_THRESHOLD, HIGHLIGHTER_COLOR,
    HIGHLIGHTER_WIDTH, PAGE_MARGIN_FACTOR,
};
use crate::convert::{DocumentOpener, OpenTicket};
use crate::doc::{Annotation, AnnotationStore, PageNumber};
use crate::geometry::{Point, Surface};
use crate::input::{InputState, Tool, ToolParams};
use crate::nav::{NavKey, Navigator, PageInput};
use crate::page::{LoadError, PageDocument, RenderCompletion, RenderOutcome, RenderScheduler, RenderTask, RenderTicket};
use crate::render;

/// Tunables for the engine. Every field falls back to its default when
/// missing from a deserialized config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Normalized distance under which an erase click removes a stroke.
    pub erase_threshold: f64,
    pub highlighter_width: f64,
    pub highlighter_color: String,
    /// Initial pen color.
    pub default_color: String,
    /// Initial pen width in CSS pixels.
    pub default_width: f64,
    /// Text font size as a fraction of the surface height.
    pub text_size: f64,
    /// Fraction of the container the fitted page occupies.
    pub margin_factor: f64,
    /// Pointer travel in CSS pixels that still counts as a click.
    pub click_slop_px: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            erase_threshold: ERASE_THRESHOLD,
            highlighter_width: HIGHLIGHTER_WIDTH,
            highlighter_color: HIGHLIGHTER_COLOR.to_owned(),
            default_color: DEFAULT_PEN_COLOR.to_owned(),
            default_width: DEFAULT_PEN_WIDTH,
            text_size: DEFAULT_TEXT_SIZE,
            margin_factor: PAGE_MARGIN_FACTOR,
            click_slop_px: CLICK_SLOP_PX,
        }
    }
}

/// Actions returned from handlers for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// The overlay must be redrawn.
    RenderNeeded,
    /// Rasterize a document page for this ticket and report back through
    /// [`EngineCore::finish_page_render`].
    RenderPage(RenderTicket),
    /// The page cursor now points here.
    PageChanged(PageNumber),
    /// Show an inline text editor at `at` (surface CSS pixels).
    TextEntryRequested { at: Point, font_px: f64, color: String },
    /// Hide the inline text editor.
    TextEntryClosed,
    ToolChanged(Tool),
    SetCursor(String),
}

/// Container the page is fitted into, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Viewport {
    width: f64,
    height: f64,
    dpr: f64,
}

/// Core engine state: all logic that doesn't depend on the canvas element.
///
/// Separated from `Engine` so it can be tested without WASM/browser dependencies.
pub struct EngineCore {
    config: EngineConfig,
    store: AnnotationStore,
    nav: Navigator,
    document: Option<PageDocument>,
    tool: Tool,
    params: ToolParams,
    input: InputState,
    laser: Option<Point>,
    viewport: Viewport,
    surface: Surface,
    renders: RenderScheduler,
}

impl Default for EngineCore {
    fn default() -> Self {
        Self::with_config(EngineConfig::default())
    }
}

impl EngineCore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        let params = ToolParams { color: config.default_color.clone(), width: config.default_width };
        Self {
            config,
            store: AnnotationStore::new(),
            nav: Navigator::default(),
            document: None,
            tool: Tool::default(),
            params,
            input: InputState::default(),
            laser: None,
            viewport: Viewport { width: 0.0, height: 0.0, dpr: 1.0 },
            surface: Surface::default(),
            renders: RenderScheduler::new(),
        }
    }

    // --- Document ---

    /// Decode and load a document, replacing the current one.
    ///
    /// # Errors
    ///
    /// Returns the [`LoadError`] if the blob cannot be decoded. The engine is
    /// left exactly as it was.
    pub fn load(&mut self, bytes: &[u8]) -> Result<Vec<Action>, LoadError> {
        let document = PageDocument::from_bytes(bytes)?;
        Ok(self.load_document(document))
    }

    /// Replace the current document with an already decoded one.
    ///
    /// Annotations from the previous document are dropped and the cursor
    /// returns to page 1.
    pub fn load_document(&mut self, document: PageDocument) -> Vec<Action> {
        let mut actions = self.end_interaction();
        self.nav = Navigator::new(document.page_count());
        self.document = Some(document);
        self.store.reset();
        self.laser = None;
        self.renders.reset();
        self.relayout();
        actions.push(Action::PageChanged(self.nav.current()));
        actions.extend(self.page_shown());
        actions
    }

    // --- Navigation ---

    /// Show page `page`. Out-of-range pages are ignored.
    pub fn go_to_page(&mut self, page: PageNumber) -> Vec<Action> {
        let previous = self.nav;
        if !self.nav.go_to(page) {
            return Vec::new();
        }
        self.after_page_change(previous)
    }

    pub fn next_page(&mut self) -> Vec<Action> {
        self.go_to_page(self.nav.current().saturating_add(1))
    }

    pub fn prev_page(&mut self) -> Vec<Action> {
        self.go_to_page(self.nav.current().saturating_sub(1))
    }

    /// Handle a key press. Only navigation keys are acted on.
    pub fn on_key(&mut self, key: &str) -> Vec<Action> {
        if matches!(self.input, InputState::TextEntry { .. }) {
            return Vec::new();
        }
        let Some(key) = NavKey::from_key(key) else {
            return Vec::new();
        };
        let previous = self.nav;
        if !self.nav.apply_key(key) {
            return Vec::new();
        }
        self.after_page_change(previous)
    }

    /// Commit the page-number input field.
    pub fn commit_page_input(&mut self, raw: &str) -> (PageInput, Vec<Action>) {
        let previous = self.nav;
        let result = self.nav.commit_input(raw);
        let actions = if self.nav == previous { Vec::new() } else { self.after_page_change(previous) };
        (result, actions)
    }

    fn after_page_change(&mut self, previous: Navigator) -> Vec<Action> {
        log::debug!("page {} -> {}", previous.current(), self.nav.current());
        let mut actions = self.end_interaction();
        self.laser = None;
        self.relayout();
        actions.push(Action::PageChanged(self.nav.current()));
        actions.extend(self.page_shown());
        actions
    }

    // --- Tools ---

    /// Activate `tool`.
    ///
    /// Any gesture in progress ends with its annotation kept as drawn, and a
    /// pending text entry is discarded.
    pub fn set_tool(&mut self, tool: Tool) -> Vec<Action> {
        if tool == self.tool {
            return Vec::new();
        }
        let mut actions = self.end_interaction();
        if self.laser.take().is_some() {
            actions.push(Action::RenderNeeded);
        }
        self.tool = tool;
        actions.push(Action::ToolChanged(tool));
        actions.push(Action::SetCursor(tool.css_cursor().to_owned()));
        actions
    }

    /// Replace the drawing parameters used by annotations created from now on.
    pub fn set_params(&mut self, params: ToolParams) {
        self.params = params;
    }

    // --- Pointer input ---

    /// Pointer pressed at `at` (surface CSS pixels).
    pub fn on_pointer_down(&mut self, at: Point) -> Vec<Action> {
        if !matches!(self.input, InputState::Idle) {
            return Vec::new();
        }
        let Some(p) = self.surface.to_page(at) else {
            return Vec::new();
        };
        let tool = self.tool;
        if tool.is_click_tool() {
            self.input = InputState::Pressing { start: at, moved: false };
            return Vec::new();
        }
        if tool == Tool::Laser {
            return self.move_laser(p);
        }
        if !tool.is_drag_tool() {
            return Vec::new();
        }

        let page = self.nav.current();
        let annotation = match (tool, tool.shape_kind()) {
            (_, Some(kind)) => Annotation::shape(kind, self.params.color.clone(), self.params.width, p),
            (Tool::Highlighter, None) => {
                Annotation::path(self.config.highlighter_color.clone(), self.config.highlighter_width, p, true)
            }
            _ => Annotation::path(self.params.color.clone(), self.params.width, p, false),
        };

        self.store.append(page, annotation);
        self.input = InputState::Drawing { page };
        vec![Action::RenderNeeded]
    }

    /// Pointer moved to `at` (surface CSS pixels).
    pub fn on_pointer_move(&mut self, at: Point) -> Vec<Action> {
        let Some(p) = self.surface.to_page(at) else {
            return Vec::new();
        };
        if self.tool == Tool::Laser && self.input == InputState::Idle {
            return self.move_laser(p);
        }
        match &mut self.input {
            InputState::Drawing { page } => {
                if self.store.update_last(*page, p) {
                    vec![Action::RenderNeeded]
                } else {
                    Vec::new()
                }
            }
            InputState::Pressing { start, moved } => {
                if start.distance(at) > self.config.click_slop_px {
                    *moved = true;
                }
                Vec::new()
            }
            InputState::Idle | InputState::TextEntry { .. } => Vec::new(),
        }
    }

    /// Pointer released at `at` (surface CSS pixels).
    pub fn on_pointer_up(&mut self, at: Point) -> Vec<Action> {
        match std::mem::take(&mut self.input) {
            InputState::Pressing { start, moved } => {
                if moved || start.distance(at) > self.config.click_slop_px {
                    return Vec::new();
                }
                self.click(start)
            }
            InputState::TextEntry { page, anchor } => {
                self.input = InputState::TextEntry { page, anchor };
                Vec::new()
            }
            InputState::Drawing { .. } | InputState::Idle => Vec::new(),
        }
    }

    /// Pointer left the overlay: end any drag and hide the laser.
    pub fn on_pointer_leave(&mut self) -> Vec<Action> {
        if self.input.is_gesture() {
            self.input = InputState::Idle;
        }
        if self.laser.take().is_some() { vec![Action::RenderNeeded] } else { Vec::new() }
    }

    fn click(&mut self, at: Point) -> Vec<Action> {
        match self.tool {
            Tool::Eraser => self.erase_at(at),
            Tool::Text => {
                let Some(anchor) = self.surface.to_page(at) else {
                    return Vec::new();
                };
                self.input = InputState::TextEntry { page: self.nav.current(), anchor };
                vec![Action::TextEntryRequested {
                    at,
                    font_px: render::font_px(self.config.text_size, &self.surface),
                    color: self.params.color.clone(),
                }]
            }
            _ => Vec::new(),
        }
    }

    fn move_laser(&mut self, p: Point) -> Vec<Action> {
        self.laser = Some(p);
        vec![Action::RenderNeeded]
    }

    // --- Text entry ---

    /// Commit the inline text editor.
    ///
    /// Non-empty text (after trimming) becomes a text annotation at the click
    /// point and the tool returns to the cursor. Empty text is discarded.
    pub fn commit_text(&mut self, raw: &str) -> Vec<Action> {
        let InputState::TextEntry { page, anchor } = self.input else {
            return Vec::new();
        };
        self.input = InputState::Idle;

        let text = raw.trim();
        if text.is_empty() {
            return vec![Action::TextEntryClosed];
        }
        let annotation =
            Annotation::text(self.params.color.clone(), self.params.width, anchor, text, self.config.text_size);
        self.store.append(page, annotation);

        let mut actions = vec![Action::TextEntryClosed, Action::RenderNeeded];
        actions.extend(self.set_tool(Tool::Cursor));
        actions
    }

    /// Dismiss the inline text editor without creating anything.
    pub fn cancel_text(&mut self) -> Vec<Action> {
        if !matches!(self.input, InputState::TextEntry { .. }) {
            return Vec::new();
        }
        self.input = InputState::Idle;
        vec![Action::TextEntryClosed]
    }

    // --- Store operations on the current page ---

    /// Remove the most recent annotation on the current page.
    pub fn undo(&mut self) -> Vec<Action> {
        self.end_drawing();
        if self.store.undo(self.nav.current()).is_some() { vec![Action::RenderNeeded] } else { Vec::new() }
    }

    /// Remove every annotation on the current page.
    pub fn clear(&mut self) -> Vec<Action> {
        self.end_drawing();
        if self.store.clear(self.nav.current()) { vec![Action::RenderNeeded] } else { Vec::new() }
    }

    /// Delete the stroke nearest to `at` (surface CSS pixels), if close enough.
    pub fn erase_at(&mut self, at: Point) -> Vec<Action> {
        let Some(p) = self.surface.to_page(at) else {
            return Vec::new();
        };
        self.end_drawing();
        match self.store.erase_near(self.nav.current(), p, self.config.erase_threshold) {
            Some(removed) => {
                log::debug!("erased {}", removed.id);
                vec![Action::RenderNeeded]
            }
            None => Vec::new(),
        }
    }

    // --- Viewport ---

    /// Update the container size (CSS pixels) and device pixel ratio.
    pub fn set_viewport(&mut self, width: f64, height: f64, dpr: f64) -> Vec<Action> {
        let dpr = if dpr > 0.0 { dpr } else { 1.0 };
        let viewport = Viewport { width, height, dpr };
        if viewport == self.viewport {
            return Vec::new();
        }
        self.viewport = viewport;
        let before = self.surface;
        self.relayout();
        if self.surface == before || self.document.is_none() {
            return Vec::new();
        }
        self.page_shown()
    }

    fn relayout(&mut self) {
        let Some(size) = self.document.as_ref().and_then(|doc| doc.page_size(self.nav.current())) else {
            self.surface = Surface::default();
            return;
        };
        let Viewport { width, height, dpr } = self.viewport;
        self.surface = Surface::fit_page(size, width, height, dpr, self.config.margin_factor);
    }

    // --- Page rendering ---

    /// Start rasterizing the current page, superseding any render in flight.
    pub fn begin_page_render(&mut self) -> Option<RenderTicket> {
        self.document.as_ref()?;
        Some(self.renders.begin(self.nav.current(), self.surface))
    }

    /// Register the running task for `ticket` so it can be cancelled.
    pub fn attach_render_task(&mut self, ticket: &RenderTicket, task: Box<dyn RenderTask>) -> bool {
        self.renders.attach(ticket, task)
    }

    /// Settle a page render reported by the host.
    pub fn finish_page_render(&mut self, ticket: &RenderTicket, outcome: RenderOutcome) -> RenderCompletion {
        self.renders.finish(ticket, outcome)
    }

    fn page_shown(&mut self) -> Vec<Action> {
        let mut actions = vec![Action::RenderNeeded];
        if let Some(ticket) = self.begin_page_render() {
            actions.push(Action::RenderPage(ticket));
        }
        actions
    }

    // --- Interaction bookkeeping ---

    /// End any gesture and discard a pending text entry.
    fn end_interaction(&mut self) -> Vec<Action> {
        match std::mem::take(&mut self.input) {
            InputState::TextEntry { .. } => vec![Action::TextEntryClosed],
            _ => Vec::new(),
        }
    }

    /// Stop growing the current annotation so the store can change underneath.
    fn end_drawing(&mut self) {
        if matches!(self.input, InputState::Drawing { .. }) {
            self.input = InputState::Idle;
        }
    }

    // --- Queries ---

    /// The current page's annotations in draw order.
    #[must_use]
    pub fn annotations(&self) -> &[Annotation] {
        self.store.page(self.nav.current())
    }

    #[must_use]
    pub fn current_page(&self) -> PageNumber {
        self.nav.current()
    }

    /// Total pages in the loaded document (0 before a load).
    #[must_use]
    pub fn page_count(&self) -> PageNumber {
        self.nav.count()
    }

    #[must_use]
    pub fn tool(&self) -> Tool {
        self.tool
    }

    #[must_use]
    pub fn params(&self) -> &ToolParams {
        &self.params
    }

    /// Store revision; changes whenever any page's annotations change.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.store.revision()
    }

    /// Laser indicator position in page space, if showing.
    #[must_use]
    pub fn laser(&self) -> Option<Point> {
        self.laser
    }

    #[must_use]
    pub fn surface(&self) -> Surface {
        self.surface
    }
}

/// The full engine. Wraps `EngineCore` and owns the browser overlay canvas.
pub struct Engine {
    canvas: HtmlCanvasElement,
    core: EngineCore,
}

impl Engine {
    /// Create a new engine bound to the given overlay canvas element.
    #[must_use]
    pub fn new(canvas: HtmlCanvasElement, config: EngineConfig) -> Self {
        Self { canvas, core: EngineCore::with_config(config) }
    }

    // --- Delegated inputs ---

    /// # Errors
    ///
    /// See [`EngineCore::load`].
    pub fn load(&mut self, bytes: &[u8]) -> Result<Vec<Action>, LoadError> {
        self.core.load(bytes)
    }

    pub fn go_to_page(&mut self, page: PageNumber) -> Vec<Action> {
        self.core.go_to_page(page)
    }

    pub fn set_tool(&mut self, tool: Tool) -> Vec<Action> {
        self.core.set_tool(tool)
    }

    pub fn set_viewport(&mut self, width: f64, height: f64, dpr: f64) -> Vec<Action> {
        self.core.set_viewport(width, height, dpr)
    }

    pub fn on_pointer_down(&mut self, at: Point) -> Vec<Action> {
        self.core.on_pointer_down(at)
    }

    pub fn on_pointer_move(&mut self, at: Point) -> Vec<Action> {
        self.core.on_pointer_move(at)
    }

    pub fn on_pointer_up(&mut self, at: Point) -> Vec<Action> {
        self.core.on_pointer_up(at)
    }

    pub fn on_pointer_leave(&mut self) -> Vec<Action> {
        self.core.on_pointer_leave()
    }

    pub fn on_key(&mut self, key: &str) -> Vec<Action> {
        self.core.on_key(key)
    }

    /// Load `document` if `ticket` is still the newest open. See
    /// [`DocumentOpener::load_if_current`].
    pub fn load_opened(
        &mut self,
        opener: &DocumentOpener,
        ticket: OpenTicket,
        document: PageDocument,
    ) -> Option<Vec<Action>> {
        opener.load_if_current(ticket, &mut self.core, document)
    }

    pub fn next_page(&mut self) -> Vec<Action> {
        self.core.next_page()
    }

    pub fn prev_page(&mut self) -> Vec<Action> {
        self.core.prev_page()
    }

    pub fn commit_page_input(&mut self, raw: &str) -> (PageInput, Vec<Action>) {
        self.core.commit_page_input(raw)
    }

    pub fn set_params(&mut self, params: ToolParams) {
        self.core.set_params(params);
    }

    pub fn commit_text(&mut self, raw: &str) -> Vec<Action> {
        self.core.commit_text(raw)
    }

    pub fn cancel_text(&mut self) -> Vec<Action> {
        self.core.cancel_text()
    }

    pub fn undo(&mut self) -> Vec<Action> {
        self.core.undo()
    }

    pub fn clear(&mut self) -> Vec<Action> {
        self.core.clear()
    }

    pub fn erase_at(&mut self, at: Point) -> Vec<Action> {
        self.core.erase_at(at)
    }

    pub fn attach_render_task(&mut self, ticket: &RenderTicket, task: Box<dyn RenderTask>) -> bool {
        self.core.attach_render_task(ticket, task)
    }

    pub fn finish_page_render(&mut self, ticket: &RenderTicket, outcome: RenderOutcome) -> RenderCompletion {
        self.core.finish_page_render(ticket, outcome)
    }

    // --- Delegated queries ---

    #[must_use]
    pub fn annotations(&self) -> &[Annotation] {
        self.core.annotations()
    }

    #[must_use]
    pub fn current_page(&self) -> PageNumber {
        self.core.current_page()
    }

    #[must_use]
    pub fn page_count(&self) -> PageNumber {
        self.core.page_count()
    }

    #[must_use]
    pub fn tool(&self) -> Tool {
        self.core.tool()
    }

    #[must_use]
    pub fn params(&self) -> &ToolParams {
        self.core.params()
    }

    #[must_use]
    pub fn revision(&self) -> u64 {
        self.core.revision()
    }

    #[must_use]
    pub fn surface(&self) -> Surface {
        self.core.surface()
    }

    // --- Render ---

    /// Size the overlay to the page surface and redraw the current page's
    /// annotations.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the 2D context is unavailable or a drawing call fails.
    pub fn render(&self) -> Result<(), JsValue> {
        let surface = self.core.surface();
        let (bw, bh) = (surface.backing_width(), surface.backing_height());
        if self.canvas.width() != bw {
            self.canvas.set_width(bw);
        }
        if self.canvas.height() != bh {
            self.canvas.set_height(bh);
        }
        let style = self.canvas.style();
        style.set_property("width", &format!("{}px", surface.width))?;
        style.set_property("height", &format!("{}px", surface.height))?;

        let ctx = self
            .canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("overlay has no 2d context"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        render::draw(&ctx, self.core.annotations(), &surface, self.core.laser())
    }
}
