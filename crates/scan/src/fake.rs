//! Recording fake providers for tests.
//!
//! All fakes share one `CallLog`, so tests can assert the relative order of
//! calls across providers. Each fake is `Clone`; clones share state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::provider::{
    BarcodeScanner, Camera, CapturedImage, ScanOptions, ScannedCode, Symbology, TextRecognizer,
};

/// Recorded provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    BarcodeAvailable,
    BarcodePermission,
    BarcodeScan { formats: Vec<Symbology>, prompt: String },
    CameraPermission,
    Capture,
    OcrInitialize { language: String },
    OcrRecognize { engine: u64 },
    OcrDispose { engine: u64 },
}

#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<ProviderCall>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn count(&self, matches: impl Fn(&ProviderCall) -> bool) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|c| matches(c))
            .count()
    }

    fn push(&self, call: ProviderCall) {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).push(call);
    }
}

/// Fault a fake should report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeFault {
    Timeout,
    Cancelled,
    Unsupported(String),
    Other(String),
}

impl From<&FakeFault> for ProviderError {
    fn from(fault: &FakeFault) -> Self {
        match fault {
            FakeFault::Timeout => ProviderError::Timeout,
            FakeFault::Cancelled => ProviderError::Cancelled,
            FakeFault::Unsupported(msg) => ProviderError::Unsupported(msg.clone()),
            FakeFault::Other(msg) => ProviderError::Other(anyhow::anyhow!(msg.clone())),
        }
    }
}

/// Scripted response for one fake operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply<T> {
    Ok(T),
    Fail(FakeFault),
    /// Never resolves; used to exercise cancellation.
    Hang,
}

impl<T: Clone> Reply<T> {
    async fn resolve(&self) -> Result<T, ProviderError> {
        match self {
            Reply::Ok(value) => Ok(value.clone()),
            Reply::Fail(fault) => Err(fault.into()),
            Reply::Hang => std::future::pending().await,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FakeBarcodeScanner {
    log: CallLog,
    available: Reply<bool>,
    permission: Reply<bool>,
    scan: Reply<ScannedCode>,
}

impl FakeBarcodeScanner {
    /// Available, permitted, and decodes `text`.
    pub fn new(log: CallLog, text: &str) -> Self {
        Self {
            log,
            available: Reply::Ok(true),
            permission: Reply::Ok(true),
            scan: Reply::Ok(ScannedCode::new(text).with_format(Symbology::Ean13)),
        }
    }

    pub fn with_available(mut self, reply: Reply<bool>) -> Self {
        self.available = reply;
        self
    }

    pub fn with_permission(mut self, reply: Reply<bool>) -> Self {
        self.permission = reply;
        self
    }

    pub fn with_scan(mut self, reply: Reply<ScannedCode>) -> Self {
        self.scan = reply;
        self
    }
}

#[async_trait]
impl BarcodeScanner for FakeBarcodeScanner {
    async fn available(&self) -> Result<bool, ProviderError> {
        self.log.push(ProviderCall::BarcodeAvailable);
        self.available.resolve().await
    }

    async fn request_permission(&self) -> Result<bool, ProviderError> {
        self.log.push(ProviderCall::BarcodePermission);
        self.permission.resolve().await
    }

    async fn scan(&self, options: &ScanOptions) -> Result<ScannedCode, ProviderError> {
        self.log.push(ProviderCall::BarcodeScan {
            formats: options.formats.clone(),
            prompt: options.prompt.clone(),
        });
        self.scan.resolve().await
    }
}

#[derive(Debug, Clone)]
pub struct FakeCamera {
    log: CallLog,
    permission: Reply<bool>,
    capture: Reply<CapturedImage>,
}

impl FakeCamera {
    /// Permitted, and captures a small PNG.
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            permission: Reply::Ok(true),
            capture: Reply::Ok(CapturedImage::new(vec![0x89, b'P', b'N', b'G'], "image/png")),
        }
    }

    pub fn with_permission(mut self, reply: Reply<bool>) -> Self {
        self.permission = reply;
        self
    }

    pub fn with_capture(mut self, reply: Reply<CapturedImage>) -> Self {
        self.capture = reply;
        self
    }
}

#[async_trait]
impl Camera for FakeCamera {
    async fn request_permission(&self) -> Result<bool, ProviderError> {
        self.log.push(ProviderCall::CameraPermission);
        self.permission.resolve().await
    }

    async fn capture(&self) -> Result<CapturedImage, ProviderError> {
        self.log.push(ProviderCall::Capture);
        self.capture.resolve().await
    }
}

/// Engine handed out by `FakeTextRecognizer`.
#[derive(Debug, PartialEq, Eq)]
pub struct FakeEngine {
    pub id: u64,
    pub language: String,
}

#[derive(Debug, Clone)]
pub struct FakeTextRecognizer {
    log: CallLog,
    next_engine: Arc<AtomicU64>,
    initialize: Reply<()>,
    recognize: Reply<String>,
}

impl FakeTextRecognizer {
    /// Initializes successfully and recognizes `text`.
    pub fn new(log: CallLog, text: &str) -> Self {
        Self {
            log,
            next_engine: Arc::new(AtomicU64::new(1)),
            initialize: Reply::Ok(()),
            recognize: Reply::Ok(text.to_string()),
        }
    }

    pub fn with_initialize(mut self, reply: Reply<()>) -> Self {
        self.initialize = reply;
        self
    }

    pub fn with_recognize(mut self, reply: Reply<String>) -> Self {
        self.recognize = reply;
        self
    }
}

#[async_trait]
impl TextRecognizer for FakeTextRecognizer {
    type Engine = FakeEngine;

    async fn initialize(&self, language: &str) -> Result<FakeEngine, ProviderError> {
        self.log.push(ProviderCall::OcrInitialize {
            language: language.to_string(),
        });
        self.initialize.resolve().await?;
        Ok(FakeEngine {
            id: self.next_engine.fetch_add(1, Ordering::Relaxed),
            language: language.to_string(),
        })
    }

    async fn recognize(
        &self,
        engine: &FakeEngine,
        _image: &CapturedImage,
    ) -> Result<String, ProviderError> {
        self.log.push(ProviderCall::OcrRecognize { engine: engine.id });
        self.recognize.resolve().await
    }

    async fn dispose(&self, engine: FakeEngine) -> Result<(), ProviderError> {
        self.log.push(ProviderCall::OcrDispose { engine: engine.id });
        Ok(())
    }
}
