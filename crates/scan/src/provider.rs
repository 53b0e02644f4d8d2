//! Capture capability contracts.
//!
//! Implemented outside this crate (platform bindings). Every call may suspend;
//! all faults are reported as `ProviderError`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Barcode symbologies a scanner can be asked to accept.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Symbology {
    QrCode,
    #[serde(rename = "EAN_13")]
    Ean13,
    #[serde(rename = "EAN_8")]
    Ean8,
    UpcA,
}

/// The symbologies every barcode scan accepts.
pub const ACCEPTED_SYMBOLOGIES: [Symbology; 4] = [
    Symbology::QrCode,
    Symbology::Ean13,
    Symbology::Ean8,
    Symbology::UpcA,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    pub formats: Vec<Symbology>,
    pub prompt: String,
}

/// Decoded barcode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannedCode {
    pub text: String,
    pub format: Option<Symbology>,
}

impl ScannedCode {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: None,
        }
    }

    pub fn with_format(mut self, format: Symbology) -> Self {
        self.format = Some(format);
        self
    }
}

/// Image returned by a camera. Cheap to clone.
#[derive(Clone, PartialEq, Eq)]
pub struct CapturedImage {
    data: Arc<[u8]>,
    media_type: String,
}

impl CapturedImage {
    pub fn new(data: impl Into<Arc<[u8]>>, media_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            media_type: media_type.into(),
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl core::fmt::Debug for CapturedImage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CapturedImage")
            .field("media_type", &self.media_type)
            .field("bytes", &self.data.len())
            .finish()
    }
}

#[async_trait]
pub trait BarcodeScanner: Send + Sync {
    async fn available(&self) -> Result<bool, ProviderError>;

    async fn request_permission(&self) -> Result<bool, ProviderError>;

    /// Show the scanner UI and wait for a code. User cancellation and
    /// timeouts are faults.
    async fn scan(&self, options: &ScanOptions) -> Result<ScannedCode, ProviderError>;
}

#[async_trait]
pub trait Camera: Send + Sync {
    async fn request_permission(&self) -> Result<bool, ProviderError>;

    async fn capture(&self) -> Result<CapturedImage, ProviderError>;
}

/// Optical text recognition.
///
/// An engine is created per request and must be handed back to `dispose`
/// exactly once, whatever happened in between.
#[async_trait]
pub trait TextRecognizer: Send + Sync + 'static {
    type Engine: Send + Sync + 'static;

    /// Load and initialize an engine for `language`. Fails on unsupported
    /// languages or model load errors.
    async fn initialize(&self, language: &str) -> Result<Self::Engine, ProviderError>;

    async fn recognize(
        &self,
        engine: &Self::Engine,
        image: &CapturedImage,
    ) -> Result<String, ProviderError>;

    /// Release an engine. Must tolerate engines whose last call failed.
    async fn dispose(&self, engine: Self::Engine) -> Result<(), ProviderError>;
}
