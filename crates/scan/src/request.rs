use chrono::NaiveDateTime;

use pantry_core::RequestId;
use pantry_inventory::ItemDraft;

use crate::error::ScanError;
use crate::provider::{CapturedImage, ScannedCode};

/// Acquisition flow to run.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ScanMode {
    Barcode,
    Photo,
    Receipt,
}

impl core::fmt::Display for ScanMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            ScanMode::Barcode => "barcode",
            ScanMode::Photo => "photo",
            ScanMode::Receipt => "receipt",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanRequest {
    Barcode,
    Photo,
    /// Recognize a receipt. Without an image, one is captured first.
    Receipt { image: Option<CapturedImage> },
}

impl ScanRequest {
    pub fn receipt() -> Self {
        Self::Receipt { image: None }
    }

    pub fn receipt_from(image: CapturedImage) -> Self {
        Self::Receipt { image: Some(image) }
    }

    pub fn mode(&self) -> ScanMode {
        match self {
            ScanRequest::Barcode => ScanMode::Barcode,
            ScanRequest::Photo => ScanMode::Photo,
            ScanRequest::Receipt { .. } => ScanMode::Receipt,
        }
    }
}

/// Step of a scan flow.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ScanState {
    CheckingAvailability,
    RequestingPermission,
    Scanning,
    Capturing,
    Initializing,
    Recognizing,
    Done,
    Failed,
}

impl ScanState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ScanState::Done | ScanState::Failed)
    }
}

/// Text extracted from a receipt photo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptText {
    pub text: String,
    pub image: CapturedImage,
}

impl ReceiptText {
    /// The first `max_chars` characters, with `...` appended if cut short.
    pub fn preview(&self, max_chars: usize) -> String {
        let mut chars = self.text.chars();
        let head: String = chars.by_ref().take(max_chars).collect();
        if chars.next().is_some() {
            format!("{head}...")
        } else {
            head
        }
    }
}

/// Successful result of a flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanPayload {
    Barcode(ScannedCode),
    Photo(CapturedImage),
    Receipt(ReceiptText),
}

impl ScanPayload {
    /// Item name to pre-fill when turning this payload into a draft.
    ///
    /// Receipts hold several items and suggest none.
    pub fn suggested_name(&self) -> Option<String> {
        match self {
            ScanPayload::Barcode(code) => Some(format!("Scanned Item: {}", code.text)),
            ScanPayload::Photo(_) => Some("Photo Captured Item".to_string()),
            ScanPayload::Receipt(_) => None,
        }
    }

    /// A draft the caller can confirm and pass to the repository.
    pub fn to_draft(
        &self,
        category: impl Into<String>,
        expiry_date: NaiveDateTime,
    ) -> Option<ItemDraft> {
        self.suggested_name()
            .map(|name| ItemDraft::new(name, category, expiry_date))
    }
}

/// Everything a single orchestrator run produced.
#[derive(Debug)]
pub struct ScanOutcome {
    pub request_id: RequestId,
    pub mode: ScanMode,
    /// States visited, in order, ending in `Done` or `Failed`.
    pub trail: Vec<ScanState>,
    pub result: Result<ScanPayload, ScanError>,
}

impl ScanOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn into_result(self) -> Result<ScanPayload, ScanError> {
        self.result
    }
}
