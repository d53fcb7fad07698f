//! `#[wasm_bindgen]` facade for the host page.
//!
//! The host constructs a [`Presenter`] with the overlay canvas and two
//! callbacks:
//!
//! - `onEvent(json)` receives UI notifications (page changed, show/hide the
//!   text editor, cursor changes, conversion progress) as a JSON string with a
//!   `"type"` tag.
//! - `rasterize(page, width, height)` starts drawing a document page at the
//!   given backing-store size and returns `{ promise, cancel }`, typically a
//!   thin wrapper over a pdf.js render task.
//! - `openDocument(bytes)` hands a decoded PDF to the host viewer and returns
//!   a promise that settles once pages can be rasterized.
//!
//! The engine is shared between DOM callbacks and async completions as
//! `Rc<RefCell<Engine>>`. Borrows are never held across an `await` or a call
//! into JS.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use gloo_net::http::Request;
use js_sys::{Function, Promise, Reflect, Uint8Array};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, future_to_promise, spawn_local};
use web_sys::HtmlCanvasElement;

use crate::convert::{
    CONVERT_PATH, ConvertError, ConvertRequest, ConvertResponse, DataUri, DocumentOpener, OpenTicket, SourceKind,
};
use crate::engine::{Action, Engine, EngineConfig};
use crate::geometry::Point;
use crate::input::Tool;
use crate::nav::PageInput;
use crate::page::{LoadError, PageDocument, RenderCompletion, RenderOutcome, RenderTask, RenderTicket};

/// Name pdf.js gives the error a cancelled render task rejects with.
const RENDER_CANCELLED: &str = "RenderingCancelledException";

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        log::debug!("logger already installed");
    }
}

// =============================================================
// Host callbacks
// =============================================================

/// Notifications for the host page.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum HostEvent<'a> {
    PageChanged {
        page: u32,
    },
    TextEntryRequested {
        x: f64,
        y: f64,
        #[serde(rename = "fontPx")]
        font_px: f64,
        color: &'a str,
    },
    TextEntryClosed,
    ToolChanged {
        tool: Tool,
    },
    SetCursor {
        cursor: &'a str,
    },
    PageRendered {
        page: u32,
    },
    PageRenderFailed {
        page: u32,
        message: &'a str,
    },
    OpenFailed {
        message: &'a str,
    },
    ConversionStarted {
        #[serde(rename = "fileName")]
        file_name: &'a str,
    },
    ConversionReady,
    ConversionFailed {
        message: &'a str,
    },
}

struct Host {
    on_event: Function,
    rasterize: Function,
    open_document: Function,
}

impl Host {
    fn emit(&self, event: &HostEvent<'_>) -> Result<(), JsValue> {
        let json = serde_json::to_string(event).map_err(to_js)?;
        self.on_event.call1(&JsValue::NULL, &JsValue::from_str(&json))?;
        Ok(())
    }

    async fn open_document(&self, bytes: &[u8]) -> Result<(), JsValue> {
        let array = Uint8Array::from(bytes);
        let promise: Promise = self.open_document.call1(&JsValue::NULL, &array)?.dyn_into()?;
        JsFuture::from(promise).await?;
        Ok(())
    }
}

/// A host rasterization in flight, cancelled through its `cancel` callback.
struct JsRenderTask {
    cancel: Function,
}

impl RenderTask for JsRenderTask {
    fn cancel(&mut self) {
        if let Err(err) = self.cancel.call0(&JsValue::NULL) {
            log::warn!("render cancel failed: {}", describe(&err));
        }
    }
}

type Shared = Rc<RefCell<Engine>>;
type SharedOpener = Rc<RefCell<DocumentOpener>>;

/// Carry out the actions returned by an engine handler.
fn dispatch(engine: &Shared, host: &Rc<Host>, actions: Vec<Action>) -> Result<(), JsValue> {
    let mut redraw = false;
    for action in actions {
        match action {
            Action::RenderNeeded => redraw = true,
            Action::RenderPage(ticket) => start_page_render(engine, host, ticket)?,
            Action::PageChanged(page) => host.emit(&HostEvent::PageChanged { page })?,
            Action::TextEntryRequested { at, font_px, color } => {
                host.emit(&HostEvent::TextEntryRequested { x: at.x, y: at.y, font_px, color: &color })?;
            }
            Action::TextEntryClosed => host.emit(&HostEvent::TextEntryClosed)?,
            Action::ToolChanged(tool) => host.emit(&HostEvent::ToolChanged { tool })?,
            Action::SetCursor(cursor) => host.emit(&HostEvent::SetCursor { cursor: &cursor })?,
        }
    }
    if redraw {
        engine.borrow().render()?;
    }
    Ok(())
}

fn start_page_render(engine: &Shared, host: &Rc<Host>, ticket: RenderTicket) -> Result<(), JsValue> {
    let handle = host.rasterize.call3(
        &JsValue::NULL,
        &JsValue::from(ticket.page),
        &JsValue::from(ticket.surface.backing_width()),
        &JsValue::from(ticket.surface.backing_height()),
    )?;
    let promise: Promise = Reflect::get(&handle, &JsValue::from_str("promise"))?.dyn_into()?;
    let cancel: Function = Reflect::get(&handle, &JsValue::from_str("cancel"))?.dyn_into()?;

    if !engine.borrow_mut().attach_render_task(&ticket, Box::new(JsRenderTask { cancel })) {
        return Ok(());
    }

    let engine = Rc::clone(engine);
    let host = Rc::clone(host);
    spawn_local(async move {
        let outcome = match JsFuture::from(promise).await {
            Ok(_) => RenderOutcome::Rendered,
            Err(err) if is_cancellation(&err) => RenderOutcome::Cancelled,
            Err(err) => RenderOutcome::Failed(describe(&err)),
        };
        let completion = engine.borrow_mut().finish_page_render(&ticket, outcome);
        let event = match &completion {
            RenderCompletion::Applied => HostEvent::PageRendered { page: ticket.page },
            RenderCompletion::Failed(message) => HostEvent::PageRenderFailed { page: ticket.page, message },
            RenderCompletion::Stale | RenderCompletion::Cancelled => return,
        };
        if let Err(err) = host.emit(&event) {
            log::warn!("host event failed: {}", describe(&err));
        }
    });
    Ok(())
}

fn is_cancellation(err: &JsValue) -> bool {
    Reflect::get(err, &JsValue::from_str("name"))
        .is_ok_and(|name| name.as_string().as_deref() == Some(RENDER_CANCELLED))
}

fn describe(err: &JsValue) -> String {
    err.as_string().unwrap_or_else(|| format!("{err:?}"))
}

fn to_js(err: impl fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

// =============================================================
// Conversion
// =============================================================

async fn request_conversion(deck: DataUri) -> Result<Vec<u8>, ConvertError> {
    let body = ConvertRequest { ppt_data_uri: deck.to_string() };
    let resp = Request::post(CONVERT_PATH)
        .json(&body)
        .map_err(|e| ConvertError::Request(e.to_string()))?
        .send()
        .await
        .map_err(|e| ConvertError::Request(e.to_string()))?;
    if !(200..300).contains(&resp.status()) {
        return Err(ConvertError::Request(format!("status {}", resp.status())));
    }
    let body: ConvertResponse = resp.json().await.map_err(|e| ConvertError::Request(e.to_string()))?;
    body.into_pdf_bytes()
}

async fn convert_deck(
    engine: &Shared,
    host: &Host,
    opener: &SharedOpener,
    ticket: OpenTicket,
    deck: DataUri,
) -> Result<Option<Vec<Action>>, ConvertError> {
    let pdf = request_conversion(deck).await?;
    if !opener.borrow().is_current(ticket) {
        return Ok(None);
    }
    Ok(open_document(engine, host, opener, ticket, &pdf).await?)
}

/// Decode a PDF, hand it to the host viewer, then show its first page. The
/// engine keeps its current document until both steps succeed. Resolves to
/// `None` when a newer open took over while the host was busy.
async fn open_document(
    engine: &Shared,
    host: &Host,
    opener: &SharedOpener,
    ticket: OpenTicket,
    bytes: &[u8],
) -> Result<Option<Vec<Action>>, LoadError> {
    let document = PageDocument::from_bytes(bytes)?;
    host.open_document(bytes)
        .await
        .map_err(|err| LoadError::Viewer(describe(&err)))?;
    let opener = opener.borrow();
    Ok(engine.borrow_mut().load_opened(&opener, ticket, document))
}

// =============================================================
// Presenter
// =============================================================

/// The engine as seen from JavaScript.
#[wasm_bindgen]
pub struct Presenter {
    engine: Shared,
    host: Rc<Host>,
    opener: SharedOpener,
}

impl Presenter {
    fn dispatch(&self, actions: Vec<Action>) -> Result<(), JsValue> {
        dispatch(&self.engine, &self.host, actions)
    }
}

#[wasm_bindgen]
impl Presenter {
    /// `config` is an optional JSON object overriding [`EngineConfig`] fields.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `config` is not valid JSON for the engine config.
    #[wasm_bindgen(constructor)]
    pub fn new(
        canvas: HtmlCanvasElement,
        on_event: Function,
        rasterize: Function,
        open_document: Function,
        config: Option<String>,
    ) -> Result<Presenter, JsValue> {
        let config = match config {
            Some(raw) => serde_json::from_str::<EngineConfig>(&raw).map_err(to_js)?,
            None => EngineConfig::default(),
        };
        Ok(Self {
            engine: Rc::new(RefCell::new(Engine::new(canvas, config))),
            host: Rc::new(Host { on_event, rasterize, open_document }),
            opener: Rc::new(RefCell::new(DocumentOpener::new())),
        })
    }

    // --- Documents ---

    /// Load a PDF the host viewer already holds and show page 1. Returns the
    /// page count.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the document cannot be decoded; the current document
    /// stays on screen.
    pub fn load(&self, bytes: &[u8]) -> Result<u32, JsValue> {
        self.opener.borrow_mut().open_pdf();
        let actions = self.engine.borrow_mut().load(bytes).map_err(to_js)?;
        self.dispatch(actions)?;
        Ok(self.page_count())
    }

    /// Open a file picked by the presenter. PDFs load directly; slide decks
    /// go through the conversion service. Resolves to `true` once a document
    /// is showing, and to `false` if the open failed or a newer open
    /// superseded it.
    #[wasm_bindgen(js_name = openFile)]
    pub fn open_file(&self, file_name: String, mime: String, bytes: Vec<u8>) -> Promise {
        let engine = Rc::clone(&self.engine);
        let host = Rc::clone(&self.host);
        let opener = Rc::clone(&self.opener);
        future_to_promise(async move {
            let kind = SourceKind::classify(&mime);
            match kind {
                SourceKind::Pdf => {
                    let ticket = opener.borrow_mut().open_pdf();
                    match open_document(&engine, &host, &opener, ticket, &bytes).await {
                        Ok(Some(actions)) => {
                            dispatch(&engine, &host, actions)?;
                            Ok(JsValue::TRUE)
                        }
                        Ok(None) => Ok(JsValue::FALSE),
                        Err(err) => {
                            log::error!("failed to open {file_name}: {err}");
                            if opener.borrow().is_current(ticket) {
                                host.emit(&HostEvent::OpenFailed { message: kind.failure_message() })?;
                            }
                            Ok(JsValue::FALSE)
                        }
                    }
                }
                SourceKind::Unsupported => {
                    host.emit(&HostEvent::OpenFailed { message: kind.failure_message() })?;
                    Ok(JsValue::FALSE)
                }
                SourceKind::LegacySlides => {
                    let Some(ticket) = opener.borrow_mut().start_conversion(&file_name) else {
                        return Ok(JsValue::FALSE);
                    };
                    host.emit(&HostEvent::ConversionStarted { file_name: &file_name })?;
                    let result = convert_deck(&engine, &host, &opener, ticket, DataUri::new(mime, bytes)).await;
                    let settled = opener.borrow_mut().finish_conversion(ticket, result.as_ref().map(|_| ()));
                    if !settled {
                        return Ok(JsValue::FALSE);
                    }
                    match result {
                        Ok(Some(actions)) => {
                            dispatch(&engine, &host, actions)?;
                            host.emit(&HostEvent::ConversionReady)?;
                            Ok(JsValue::TRUE)
                        }
                        Ok(None) => Ok(JsValue::FALSE),
                        Err(err) => {
                            host.emit(&HostEvent::ConversionFailed { message: err.user_message() })?;
                            Ok(JsValue::FALSE)
                        }
                    }
                }
            }
        })
    }

    /// The host could not read a picked slide deck.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the host event callback throws.
    #[wasm_bindgen(js_name = conversionReadFailed)]
    pub fn conversion_read_failed(&self, file_name: &str, reason: &str) -> Result<(), JsValue> {
        let err = ConvertError::Read(reason.to_owned());
        let settled = self.opener.borrow_mut().read_failed(file_name, &err);
        if settled {
            self.host.emit(&HostEvent::ConversionFailed { message: err.user_message() })?;
        }
        Ok(())
    }

    /// Leave the conversion view. A conversion still in flight is abandoned
    /// and its result discarded.
    #[wasm_bindgen(js_name = conversionBack)]
    pub fn conversion_back(&self) {
        self.opener.borrow_mut().back();
    }

    #[wasm_bindgen(js_name = isConverting)]
    pub fn is_converting(&self) -> bool {
        self.opener.borrow().is_converting()
    }

    // --- Pointer and keyboard ---

    /// # Errors
    ///
    /// Returns `Err` if redrawing or a host callback fails.
    #[wasm_bindgen(js_name = pointerDown)]
    pub fn pointer_down(&self, x: f64, y: f64) -> Result<(), JsValue> {
        let actions = self.engine.borrow_mut().on_pointer_down(Point::new(x, y));
        self.dispatch(actions)
    }

    /// # Errors
    ///
    /// Returns `Err` if redrawing or a host callback fails.
    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move(&self, x: f64, y: f64) -> Result<(), JsValue> {
        let actions = self.engine.borrow_mut().on_pointer_move(Point::new(x, y));
        self.dispatch(actions)
    }

    /// # Errors
    ///
    /// Returns `Err` if redrawing or a host callback fails.
    #[wasm_bindgen(js_name = pointerUp)]
    pub fn pointer_up(&self, x: f64, y: f64) -> Result<(), JsValue> {
        let actions = self.engine.borrow_mut().on_pointer_up(Point::new(x, y));
        self.dispatch(actions)
    }

    /// # Errors
    ///
    /// Returns `Err` if redrawing fails.
    #[wasm_bindgen(js_name = pointerLeave)]
    pub fn pointer_leave(&self) -> Result<(), JsValue> {
        let actions = self.engine.borrow_mut().on_pointer_leave();
        self.dispatch(actions)
    }

    /// # Errors
    ///
    /// Returns `Err` if redrawing or a host callback fails.
    #[wasm_bindgen(js_name = keyDown)]
    pub fn key_down(&self, key: &str) -> Result<(), JsValue> {
        let actions = self.engine.borrow_mut().on_key(key);
        self.dispatch(actions)
    }

    // --- Tools ---

    /// # Errors
    ///
    /// Returns `Err` for an unknown tool name.
    #[wasm_bindgen(js_name = setTool)]
    pub fn set_tool(&self, name: &str) -> Result<(), JsValue> {
        let tool: Tool = name.parse().map_err(to_js)?;
        let actions = self.engine.borrow_mut().set_tool(tool);
        self.dispatch(actions)
    }

    #[wasm_bindgen(getter)]
    pub fn tool(&self) -> String {
        self.engine.borrow().tool().to_string()
    }

    #[wasm_bindgen(js_name = setColor)]
    pub fn set_color(&self, color: String) {
        let mut engine = self.engine.borrow_mut();
        let mut params = engine.params().clone();
        params.color = color;
        engine.set_params(params);
    }

    #[wasm_bindgen(js_name = setWidth)]
    pub fn set_width(&self, width: f64) {
        let mut engine = self.engine.borrow_mut();
        let mut params = engine.params().clone();
        params.width = width;
        engine.set_params(params);
    }

    // --- Text entry ---

    /// # Errors
    ///
    /// Returns `Err` if redrawing or a host callback fails.
    #[wasm_bindgen(js_name = commitText)]
    pub fn commit_text(&self, text: &str) -> Result<(), JsValue> {
        let actions = self.engine.borrow_mut().commit_text(text);
        self.dispatch(actions)
    }

    /// # Errors
    ///
    /// Returns `Err` if a host callback fails.
    #[wasm_bindgen(js_name = cancelText)]
    pub fn cancel_text(&self) -> Result<(), JsValue> {
        let actions = self.engine.borrow_mut().cancel_text();
        self.dispatch(actions)
    }

    // --- Edits ---

    /// # Errors
    ///
    /// Returns `Err` if redrawing fails.
    pub fn undo(&self) -> Result<(), JsValue> {
        let actions = self.engine.borrow_mut().undo();
        self.dispatch(actions)
    }

    /// # Errors
    ///
    /// Returns `Err` if redrawing fails.
    pub fn clear(&self) -> Result<(), JsValue> {
        let actions = self.engine.borrow_mut().clear();
        self.dispatch(actions)
    }

    /// Erase the path nearest to `(x, y)` on the overlay, as an eraser click
    /// would.
    ///
    /// # Errors
    ///
    /// Returns `Err` if redrawing fails.
    #[wasm_bindgen(js_name = eraseAt)]
    pub fn erase_at(&self, x: f64, y: f64) -> Result<(), JsValue> {
        let actions = self.engine.borrow_mut().erase_at(Point::new(x, y));
        self.dispatch(actions)
    }

    /// The current page's annotations as a JSON array.
    ///
    /// # Errors
    ///
    /// Returns `Err` if serialization fails.
    #[wasm_bindgen(js_name = annotationsJson)]
    pub fn annotations_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.engine.borrow().annotations()).map_err(to_js)
    }

    #[wasm_bindgen(getter)]
    pub fn revision(&self) -> f64 {
        // JS numbers are exact up to 2^53.
        #[allow(clippy::cast_precision_loss)]
        let revision = self.engine.borrow().revision() as f64;
        revision
    }

    // --- Navigation ---

    /// # Errors
    ///
    /// Returns `Err` if redrawing or a host callback fails.
    #[wasm_bindgen(js_name = goToPage)]
    pub fn go_to_page(&self, page: u32) -> Result<(), JsValue> {
        let actions = self.engine.borrow_mut().go_to_page(page);
        self.dispatch(actions)
    }

    /// # Errors
    ///
    /// Returns `Err` if redrawing or a host callback fails.
    #[wasm_bindgen(js_name = nextPage)]
    pub fn next_page(&self) -> Result<(), JsValue> {
        let actions = self.engine.borrow_mut().next_page();
        self.dispatch(actions)
    }

    /// # Errors
    ///
    /// Returns `Err` if redrawing or a host callback fails.
    #[wasm_bindgen(js_name = prevPage)]
    pub fn prev_page(&self) -> Result<(), JsValue> {
        let actions = self.engine.borrow_mut().prev_page();
        self.dispatch(actions)
    }

    /// Commit the page-number field. Returns the number the field should
    /// now display.
    ///
    /// # Errors
    ///
    /// Returns `Err` if redrawing or a host callback fails.
    #[wasm_bindgen(js_name = commitPageInput)]
    pub fn commit_page_input(&self, raw: &str) -> Result<u32, JsValue> {
        let (result, actions) = self.engine.borrow_mut().commit_page_input(raw);
        self.dispatch(actions)?;
        Ok(match result {
            PageInput::Applied(page) | PageInput::Reverted(page) => page,
        })
    }

    #[wasm_bindgen(getter, js_name = currentPage)]
    pub fn current_page(&self) -> u32 {
        self.engine.borrow().current_page()
    }

    #[wasm_bindgen(getter, js_name = pageCount)]
    pub fn page_count(&self) -> u32 {
        self.engine.borrow().page_count()
    }

    // --- Layout ---

    /// The container was resized or moved to a screen with a different
    /// pixel ratio.
    ///
    /// # Errors
    ///
    /// Returns `Err` if redrawing or a host callback fails.
    pub fn resize(&self, width: f64, height: f64, dpr: f64) -> Result<(), JsValue> {
        let actions = self.engine.borrow_mut().set_viewport(width, height, dpr);
        self.dispatch(actions)
    }

    /// Overlay size in CSS pixels, as `[width, height]`.
    #[wasm_bindgen(js_name = surfaceSize)]
    pub fn surface_size(&self) -> Vec<f64> {
        let surface = self.engine.borrow().surface();
        vec![surface.width, surface.height]
    }
}
