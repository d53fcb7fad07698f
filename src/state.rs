//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the deck converter behind a trait object so tests can swap in
//! a fixed result.

use std::sync::Arc;

use crate::services::convert::Converter;

#[derive(Clone)]
pub struct AppState {
    pub converter: Arc<dyn Converter>,
}

impl AppState {
    #[must_use]
    pub fn new(converter: Arc<dyn Converter>) -> Self {
        Self { converter }
    }
}
