//! Annotation engine for the slide presentation viewer.
//!
//! This crate is compiled to WebAssembly and runs in the browser. It owns the
//! presenter's annotation state: translating raw pointer events on the overlay
//! surface into per-page annotation mutations, tracking which slide is shown,
//! scheduling cancellable page rasterization, and replaying the active page's
//! annotations onto the overlay canvas. The host page is responsible only for
//! wiring DOM events to the engine, rasterizing document pages, and showing
//! the inline text editor when asked to.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Top-level engine and testable [`engine::EngineCore`] |
//! | [`doc`] | Annotation types and the per-page annotation store |
//! | [`geometry`] | Normalized page points, surface sizing, coordinate mapping |
//! | [`input`] | Tools, tool parameters, and the gesture state machine |
//! | [`nav`] | Bounded page cursor and page-number entry |
//! | [`page`] | Document decoding and cancellable page-render scheduling |
//! | [`render`] | Overlay rendering through the [`render::Painter`] seam |
//! | [`convert`] | Legacy-deck conversion wire types and client phase machine |
//! | [`consts`] | Shared numeric constants (erase threshold, highlighter, etc.) |
//! | `web` | `#[wasm_bindgen]` facade for the host page (feature `web`) |

pub mod consts;
pub mod convert;
pub mod doc;
pub mod engine;
pub mod geometry;
pub mod input;
pub mod nav;
pub mod page;
pub mod render;
#[cfg(feature = "web")]
pub mod web;
