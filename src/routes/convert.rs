//! Deck conversion route.
//!
//! `POST /api/convert` takes `{ "pptDataUri": ... }` and answers with
//! `{ "pdfDataUri": ... }`. Failures carry only a status code; the viewer
//! shows its own message.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use canvas::convert::{ConvertRequest, ConvertResponse};

use crate::services::convert::{self as service, ConvertError};
use crate::state::AppState;

pub(crate) fn convert_error_to_status(err: &ConvertError) -> StatusCode {
    match err {
        ConvertError::InvalidInput(_) | ConvertError::UnsupportedType(_) => StatusCode::BAD_REQUEST,
        ConvertError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        ConvertError::Llm(_) | ConvertError::NoDocument | ConvertError::NotPdf => StatusCode::BAD_GATEWAY,
    }
}

/// `POST /api/convert`
///
/// # Errors
///
/// Returns 400 for a malformed or non-deck payload, 503 when conversion is
/// not configured, and 502 when the converter fails or returns a non-PDF.
pub async fn convert(
    State(state): State<AppState>,
    Json(body): Json<ConvertRequest>,
) -> Result<Json<ConvertResponse>, StatusCode> {
    match service::convert_deck(state.converter.as_ref(), body).await {
        Ok(resp) => Ok(Json(resp)),
        Err(e) => {
            let status = convert_error_to_status(&e);
            if status.is_server_error() {
                tracing::error!(error = %e, "deck conversion failed");
            } else {
                tracing::warn!(error = %e, "deck conversion rejected");
            }
            Err(status)
        }
    }
}

#[cfg(test)]
#[path = "convert_test.rs"]
mod tests;
