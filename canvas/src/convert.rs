//! Legacy slide-deck conversion: wire types, data-URI codec, the client
//! phase machine, and document-open sequencing.
//!
//! PDFs load directly. PowerPoint decks are sent to the conversion service as
//! a base64 data URI and come back as a PDF data URI. The service side lives in
//! the `slideflow` server crate and shares these wire types.

#[cfg(test)]
#[path = "convert_test.rs"]
mod convert_test;

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::engine::{Action, EngineCore};
use crate::page::{LoadError, PageDocument};

pub const PDF_MIME: &str = "application/pdf";
pub const PPT_MIME: &str = "application/vnd.ms-powerpoint";
pub const PPTX_MIME: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation";

/// Route the conversion service is mounted at.
pub const CONVERT_PATH: &str = "/api/convert";

/// Magic bytes every PDF starts with.
pub const PDF_MAGIC: &[u8] = b"%PDF-";

/// How a selected file should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Load directly.
    Pdf,
    /// Convert to PDF first.
    LegacySlides,
    /// Reject with a message.
    Unsupported,
}

impl SourceKind {
    /// Classify a file by its browser-reported MIME type.
    #[must_use]
    pub fn classify(mime: &str) -> Self {
        match mime.trim() {
            PDF_MIME => Self::Pdf,
            PPT_MIME | PPTX_MIME => Self::LegacySlides,
            _ => Self::Unsupported,
        }
    }

    /// Message shown when a file of this kind could not be opened.
    #[must_use]
    pub fn failure_message(self) -> &'static str {
        match self {
            Self::Pdf => "Failed to load PDF file. Please ensure it is not corrupted.",
            Self::LegacySlides => CONVERSION_FAILED_MESSAGE,
            Self::Unsupported => "Unsupported file type. Please upload a PDF or a PPT/PPTX file.",
        }
    }
}

const CONVERSION_FAILED_MESSAGE: &str =
    "An error occurred during conversion. The file might be unsupported or corrupted.";

/// Why a data URI could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataUriError {
    #[error("missing data: scheme")]
    MissingScheme,
    #[error("data URI is not base64-encoded")]
    NotBase64,
    #[error("invalid base64 payload: {0}")]
    Decode(String),
}

/// A decoded `data:<mime>;base64,<payload>` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime: String,
    pub data: Vec<u8>,
}

impl DataUri {
    #[must_use]
    pub fn new(mime: impl Into<String>, data: Vec<u8>) -> Self {
        Self { mime: mime.into(), data }
    }

    /// Parse and decode a base64 data URI.
    ///
    /// # Errors
    ///
    /// Returns a [`DataUriError`] if the scheme or `;base64` marker is missing
    /// or the payload is not valid base64.
    pub fn parse(raw: &str) -> Result<Self, DataUriError> {
        let rest = raw.trim().strip_prefix("data:").ok_or(DataUriError::MissingScheme)?;
        let (header, payload) = rest.split_once(',').ok_or(DataUriError::NotBase64)?;
        let mime = header.strip_suffix(";base64").ok_or(DataUriError::NotBase64)?;
        let data = STANDARD
            .decode(payload.trim())
            .map_err(|e| DataUriError::Decode(e.to_string()))?;
        Ok(Self { mime: mime.to_owned(), data })
    }

    /// The payload re-encoded as standard base64.
    #[must_use]
    pub fn base64_payload(&self) -> String {
        STANDARD.encode(&self.data)
    }

    /// Whether the payload carries the PDF magic bytes.
    #[must_use]
    pub fn is_pdf(&self) -> bool {
        self.data.starts_with(PDF_MAGIC)
    }
}

impl fmt::Display for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data:{};base64,{}", self.mime, self.base64_payload())
    }
}

/// Body of `POST /api/convert`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertRequest {
    pub ppt_data_uri: String,
}

/// Successful response of `POST /api/convert`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResponse {
    pub pdf_data_uri: String,
}

impl ConvertResponse {
    /// Decode the returned document.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::Response`] if the URI does not decode, or
    /// [`ConvertError::NotPdf`] if the payload is not a PDF.
    pub fn into_pdf_bytes(self) -> Result<Vec<u8>, ConvertError> {
        let uri = DataUri::parse(&self.pdf_data_uri)?;
        if !uri.is_pdf() {
            return Err(ConvertError::NotPdf);
        }
        Ok(uri.data)
    }
}

/// Client-side conversion failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConvertError {
    #[error("could not read the file: {0}")]
    Read(String),
    #[error("conversion request failed: {0}")]
    Request(String),
    #[error("malformed conversion result: {0}")]
    Response(#[from] DataUriError),
    #[error("conversion result is not a PDF")]
    NotPdf,
    #[error("converted document failed to load: {0}")]
    Load(#[from] LoadError),
}

impl ConvertError {
    /// Message shown to the presenter.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Read(_) => "Could not read the PPT file.",
            _ => CONVERSION_FAILED_MESSAGE,
        }
    }
}

/// Where the conversion view is.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConversionPhase {
    /// No conversion shown; the file picker is up.
    #[default]
    Idle,
    /// A request is outstanding.
    Converting { file_name: String },
    /// The converted document is loaded.
    Ready,
    /// The conversion failed. Only [`ConversionPhase::back`] leaves this state.
    Failed { message: String },
}

impl ConversionPhase {
    /// Begin converting `file_name`. Ignored while a conversion is outstanding
    /// or a failure is shown.
    pub fn start(&mut self, file_name: impl Into<String>) -> bool {
        if matches!(self, Self::Converting { .. } | Self::Failed { .. }) {
            return false;
        }
        *self = Self::Converting { file_name: file_name.into() };
        true
    }

    /// Settle the outstanding conversion.
    pub fn finish(&mut self, result: Result<(), &ConvertError>) -> bool {
        if !matches!(self, Self::Converting { .. }) {
            return false;
        }
        *self = match result {
            Ok(()) => Self::Ready,
            Err(err) => {
                log::error!("conversion failed: {err}");
                Self::Failed { message: err.user_message().to_owned() }
            }
        };
        true
    }

    /// Leave the conversion view.
    pub fn back(&mut self) {
        *self = Self::Idle;
    }

    #[must_use]
    pub fn is_converting(&self) -> bool {
        matches!(self, Self::Converting { .. })
    }
}

// =============================================================
// Open sequencing
// =============================================================

/// Identifies one document open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenTicket {
    generation: u64,
}

/// Orders document opens and owns the conversion phase.
///
/// Every open takes a ticket. Opening another document, or leaving the view
/// while a conversion is outstanding, invalidates every earlier ticket. A
/// result that arrives for an old ticket is dropped and never reaches the
/// engine.
#[derive(Debug, Default)]
pub struct DocumentOpener {
    generation: u64,
    phase: ConversionPhase,
}

impl DocumentOpener {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin opening a PDF. Abandons a conversion in progress.
    pub fn open_pdf(&mut self) -> OpenTicket {
        if self.phase.is_converting() {
            log::info!("conversion abandoned for a newer document");
            self.phase.back();
        }
        self.next_ticket()
    }

    /// Begin converting `file_name`. Returns `None` while another conversion
    /// is outstanding or a failure is shown.
    pub fn start_conversion(&mut self, file_name: &str) -> Option<OpenTicket> {
        if !self.phase.start(file_name) {
            return None;
        }
        Some(self.next_ticket())
    }

    /// Settle the conversion behind `ticket`. A superseded ticket leaves the
    /// phase untouched and returns `false`.
    pub fn finish_conversion(&mut self, ticket: OpenTicket, result: Result<(), &ConvertError>) -> bool {
        if !self.is_current(ticket) {
            log::debug!("dropping superseded conversion result (gen {})", ticket.generation);
            return false;
        }
        self.phase.finish(result)
    }

    /// The host could not read a picked slide deck.
    pub fn read_failed(&mut self, file_name: &str, err: &ConvertError) -> bool {
        match self.start_conversion(file_name) {
            Some(ticket) => self.finish_conversion(ticket, Err(err)),
            None => false,
        }
    }

    /// Leave the conversion view. An outstanding conversion is abandoned.
    pub fn back(&mut self) {
        if self.phase.is_converting() {
            self.generation += 1;
        }
        self.phase.back();
    }

    /// Whether `ticket` belongs to the newest open.
    #[must_use]
    pub fn is_current(&self, ticket: OpenTicket) -> bool {
        ticket.generation == self.generation
    }

    /// Hand `document` to the engine if `ticket` is still the newest open.
    pub fn load_if_current(
        &self,
        ticket: OpenTicket,
        core: &mut EngineCore,
        document: PageDocument,
    ) -> Option<Vec<Action>> {
        if !self.is_current(ticket) {
            log::debug!("dropping superseded document (gen {})", ticket.generation);
            return None;
        }
        Some(core.load_document(document))
    }

    #[must_use]
    pub fn is_converting(&self) -> bool {
        self.phase.is_converting()
    }

    fn next_ticket(&mut self) -> OpenTicket {
        self.generation += 1;
        OpenTicket { generation: self.generation }
    }
}
