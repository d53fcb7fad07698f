//! Deck conversion service: turns a PowerPoint data URI into a PDF data URI.
//!
//! DESIGN
//! ======
//! The route depends on the [`Converter`] trait. [`LlmConverter`] asks the
//! configured model to produce the PDF and pulls the first PDF data URI out
//! of its reply. [`UnavailableConverter`] stands in when no model is
//! configured so the route can answer with a clear status instead of hanging.
//!
//! Whatever the converter returns is decoded and checked for the PDF magic
//! bytes before it reaches the client.

use std::sync::Arc;

use canvas::convert::{ConvertRequest, ConvertResponse, DataUri, DataUriError, PDF_MIME, SourceKind};

use crate::llm::types::{ContentBlock, DocumentSource, LlmChat, LlmError, Message};

const SYSTEM_PROMPT: &str = "You are an expert in converting PPT files to PDF format.";
const USER_PROMPT: &str = "Convert the following PPT file to PDF format. Return the PDF as a data URI.";
const PDF_URI_PREFIX: &str = "data:application/pdf;base64,";

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("invalid deck data URI: {0}")]
    InvalidInput(#[from] DataUriError),
    #[error("unsupported deck type: {0}")]
    UnsupportedType(String),
    #[error("conversion is not configured")]
    NotConfigured,
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("model reply did not contain a PDF data URI")]
    NoDocument,
    #[error("converted payload is not a PDF")]
    NotPdf,
}

// =============================================================================
// CONVERTERS
// =============================================================================

#[async_trait::async_trait]
pub trait Converter: Send + Sync {
    /// Convert a decoded deck into a PDF data URI.
    async fn convert(&self, deck: &DataUri) -> Result<DataUri, ConvertError>;
}

/// Converter backed by an LLM chat endpoint.
pub struct LlmConverter {
    llm: Arc<dyn LlmChat>,
    max_tokens: u32,
}

impl LlmConverter {
    #[must_use]
    pub fn new(llm: Arc<dyn LlmChat>, max_tokens: u32) -> Self {
        Self { llm, max_tokens }
    }
}

#[async_trait::async_trait]
impl Converter for LlmConverter {
    async fn convert(&self, deck: &DataUri) -> Result<DataUri, ConvertError> {
        let messages = vec![Message::user(vec![
            ContentBlock::Text { text: USER_PROMPT.to_owned() },
            ContentBlock::Document { source: DocumentSource::base64(deck.mime.clone(), deck.base64_payload()) },
        ])];

        let response = self
            .llm
            .chat(self.max_tokens, SYSTEM_PROMPT, &messages)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, retryable = e.retryable(), "conversion request failed"))?;
        tracing::info!(
            model = %response.model,
            stop_reason = %response.stop_reason,
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            "conversion reply received"
        );

        extract_pdf_uri(&response.text()).ok_or(ConvertError::NoDocument)
    }
}

/// Converter used when no model is configured.
pub struct UnavailableConverter;

#[async_trait::async_trait]
impl Converter for UnavailableConverter {
    async fn convert(&self, _deck: &DataUri) -> Result<DataUri, ConvertError> {
        Err(ConvertError::NotConfigured)
    }
}

// =============================================================================
// SERVICE
// =============================================================================

/// Validate a conversion request, run it, and check the result.
///
/// # Errors
///
/// Returns [`ConvertError::InvalidInput`] or [`ConvertError::UnsupportedType`]
/// for a bad request, [`ConvertError::NotPdf`] if the converter produced
/// something other than a PDF, and passes converter failures through.
pub async fn convert_deck(converter: &dyn Converter, request: ConvertRequest) -> Result<ConvertResponse, ConvertError> {
    let deck = DataUri::parse(&request.ppt_data_uri)?;
    if SourceKind::classify(&deck.mime) != SourceKind::LegacySlides {
        return Err(ConvertError::UnsupportedType(deck.mime));
    }

    tracing::info!(mime = %deck.mime, bytes = deck.data.len(), "converting deck");
    let pdf = converter.convert(&deck).await?;
    if !pdf.is_pdf() {
        return Err(ConvertError::NotPdf);
    }

    let pdf = DataUri::new(PDF_MIME, pdf.data);
    tracing::info!(bytes = pdf.data.len(), "deck converted");
    Ok(ConvertResponse { pdf_data_uri: pdf.to_string() })
}

/// Find the first PDF data URI in free-form model output.
#[must_use]
pub fn extract_pdf_uri(text: &str) -> Option<DataUri> {
    let start = text.find(PDF_URI_PREFIX)?;
    let tail = &text[start + PDF_URI_PREFIX.len()..];
    let end = tail
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=')))
        .unwrap_or(tail.len());
    if end == 0 {
        return None;
    }
    let candidate = &text[start..start + PDF_URI_PREFIX.len() + end];
    DataUri::parse(candidate).ok()
}

#[cfg(test)]
#[path = "convert_test.rs"]
mod tests;
