//! Item acquisition pipeline.
//!
//! `ScanOrchestrator` drives external capture capabilities (barcode scanner,
//! camera, text recognizer) through one of three sequential flows and hands
//! the result back to the caller. Committing a result to the inventory is the
//! caller's decision.

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod provider;
pub mod request;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use config::ScanConfig;
pub use error::{Capability, ProviderError, ScanError, ScanErrorKind};
pub use orchestrator::ScanOrchestrator;
pub use provider::{
    ACCEPTED_SYMBOLOGIES, BarcodeScanner, Camera, CapturedImage, ScanOptions, ScannedCode,
    Symbology, TextRecognizer,
};
pub use request::{ReceiptText, ScanMode, ScanOutcome, ScanPayload, ScanRequest, ScanState};
