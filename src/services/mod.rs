//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own the conversion logic so route handlers can stay
//! focused on protocol translation.

pub mod convert;
