//! Scan flow orchestration.
//!
//! Each request runs a fresh, strictly sequential state machine:
//!
//! ```text
//! barcode: CheckingAvailability → RequestingPermission → Scanning → Done | Failed
//! photo:   RequestingPermission → Capturing → Done | Failed
//! receipt: [photo flow] → Initializing → Recognizing → Done | Failed
//! ```
//!
//! Suspension only happens inside provider calls. Every provider call races
//! the request's `CancellationToken`; a cancelled step fails with that step's
//! own error kind (cause `ProviderError::Cancelled`) and exits through the same
//! cleanup as any other failure. Nothing is retried.

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, info, info_span, warn};

use pantry_core::RequestId;

use crate::config::ScanConfig;
use crate::error::{Capability, ProviderError, ScanError};
use crate::provider::{BarcodeScanner, Camera, CapturedImage, ScannedCode, TextRecognizer};
use crate::request::{ReceiptText, ScanMode, ScanOutcome, ScanPayload, ScanRequest, ScanState};

pub struct ScanOrchestrator<B, C, R> {
    barcode: B,
    camera: C,
    ocr: Arc<R>,
    config: ScanConfig,
}

impl<B, C, R> ScanOrchestrator<B, C, R>
where
    B: BarcodeScanner,
    C: Camera,
    R: TextRecognizer,
{
    pub fn new(barcode: B, camera: C, ocr: R) -> Self {
        Self::with_config(barcode, camera, ocr, ScanConfig::default())
    }

    pub fn with_config(barcode: B, camera: C, ocr: R, config: ScanConfig) -> Self {
        Self {
            barcode,
            camera,
            ocr: Arc::new(ocr),
            config,
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Run `request` to completion.
    pub async fn run(&self, request: ScanRequest) -> ScanOutcome {
        self.run_with_cancel(request, &CancellationToken::new()).await
    }

    /// Run `request`, abandoning the pending step once `cancel` fires.
    pub async fn run_with_cancel(
        &self,
        request: ScanRequest,
        cancel: &CancellationToken,
    ) -> ScanOutcome {
        let mut flow = Flow::new(request.mode(), cancel);
        let span = flow.span.clone();

        let result = match request {
            ScanRequest::Barcode => self
                .barcode_flow(&mut flow)
                .instrument(span)
                .await
                .map(ScanPayload::Barcode),
            ScanRequest::Photo => self
                .photo_flow(&mut flow)
                .instrument(span)
                .await
                .map(ScanPayload::Photo),
            ScanRequest::Receipt { image } => self
                .receipt_flow(&mut flow, image)
                .instrument(span)
                .await
                .map(ScanPayload::Receipt),
        };

        flow.finish(&result);
        ScanOutcome {
            request_id: flow.request_id,
            mode: flow.mode,
            trail: flow.trail,
            result,
        }
    }

    pub async fn scan_barcode(&self, cancel: &CancellationToken) -> Result<ScannedCode, ScanError> {
        let mut flow = Flow::new(ScanMode::Barcode, cancel);
        let span = flow.span.clone();
        let result = self.barcode_flow(&mut flow).instrument(span).await;
        flow.finish(&result);
        result
    }

    pub async fn take_photo(&self, cancel: &CancellationToken) -> Result<CapturedImage, ScanError> {
        let mut flow = Flow::new(ScanMode::Photo, cancel);
        let span = flow.span.clone();
        let result = self.photo_flow(&mut flow).instrument(span).await;
        flow.finish(&result);
        result
    }

    /// Recognize receipt text, capturing a photo first when `image` is `None`.
    pub async fn scan_receipt(
        &self,
        image: Option<CapturedImage>,
        cancel: &CancellationToken,
    ) -> Result<ReceiptText, ScanError> {
        let mut flow = Flow::new(ScanMode::Receipt, cancel);
        let span = flow.span.clone();
        let result = self.receipt_flow(&mut flow, image).instrument(span).await;
        flow.finish(&result);
        result
    }

    async fn barcode_flow(&self, flow: &mut Flow<'_>) -> Result<ScannedCode, ScanError> {
        let capability = Capability::Barcode;

        match flow.step(ScanState::CheckingAvailability, self.barcode.available()).await {
            Ok(true) => {}
            Ok(false) => return Err(ScanError::DeviceUnavailable { capability, cause: None }),
            Err(cause) => {
                return Err(ScanError::DeviceUnavailable {
                    capability,
                    cause: Some(cause),
                });
            }
        }

        match flow.step(ScanState::RequestingPermission, self.barcode.request_permission()).await {
            Ok(true) => {}
            Ok(false) => return Err(ScanError::PermissionDenied { capability, cause: None }),
            Err(cause) => {
                return Err(ScanError::PermissionDenied {
                    capability,
                    cause: Some(cause),
                });
            }
        }

        let options = self.config.scan_options();
        let code = flow
            .step(ScanState::Scanning, self.barcode.scan(&options))
            .await
            .map_err(ScanError::ScanFailed)?;

        debug!(len = code.text.len(), format = ?code.format, "barcode decoded");
        Ok(code)
    }

    async fn photo_flow(&self, flow: &mut Flow<'_>) -> Result<CapturedImage, ScanError> {
        let capability = Capability::Camera;

        match flow.step(ScanState::RequestingPermission, self.camera.request_permission()).await {
            Ok(true) => {}
            Ok(false) => return Err(ScanError::PermissionDenied { capability, cause: None }),
            Err(cause) => {
                return Err(ScanError::PermissionDenied {
                    capability,
                    cause: Some(cause),
                });
            }
        }

        let image = flow
            .step(ScanState::Capturing, self.camera.capture())
            .await
            .map_err(ScanError::CaptureFailed)?;

        debug!(bytes = image.len(), media_type = image.media_type(), "photo captured");
        Ok(image)
    }

    async fn receipt_flow(
        &self,
        flow: &mut Flow<'_>,
        image: Option<CapturedImage>,
    ) -> Result<ReceiptText, ScanError> {
        let image = match image {
            Some(image) => image,
            None => self.photo_flow(flow).await?,
        };

        let language = self.config.ocr_language.as_str();
        let engine = flow
            .step(ScanState::Initializing, self.ocr.initialize(language))
            .await
            .map_err(ScanError::OcrInitFailed)?;

        let mut lease = EngineLease::new(Arc::clone(&self.ocr), engine);
        let recognized = flow
            .step(ScanState::Recognizing, lease.recognize(&image))
            .await
            .map_err(ScanError::OcrRecognitionFailed);
        lease.release().await;

        let text = recognized?;
        debug!(chars = text.chars().count(), "receipt recognized");
        Ok(ReceiptText { text, image })
    }
}

impl<B, C, R> core::fmt::Debug for ScanOrchestrator<B, C, R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ScanOrchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Per-request state machine bookkeeping.
struct Flow<'a> {
    request_id: RequestId,
    mode: ScanMode,
    span: Span,
    trail: Vec<ScanState>,
    cancel: &'a CancellationToken,
}

impl<'a> Flow<'a> {
    fn new(mode: ScanMode, cancel: &'a CancellationToken) -> Self {
        let request_id = RequestId::new();
        Self {
            request_id,
            mode,
            span: info_span!("scan", %request_id, %mode),
            trail: Vec::new(),
            cancel,
        }
    }

    fn enter(&mut self, state: ScanState) {
        debug!(?state, "entering state");
        self.trail.push(state);
    }

    fn finish<T>(&mut self, result: &Result<T, ScanError>) {
        let _guard = self.span.clone().entered();
        match result {
            Ok(_) => {
                self.enter(ScanState::Done);
                info!("scan completed");
            }
            Err(err) => {
                self.enter(ScanState::Failed);
                warn!(kind = ?err.kind(), error = %err, cause = ?err.cause(), "scan failed");
            }
        }
    }

    /// Enter `state` and await the provider call, unless cancelled first.
    async fn step<T, F>(&mut self, state: ScanState, call: F) -> Result<T, ProviderError>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        self.enter(state);
        if self.cancel.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ProviderError::Cancelled),
            result = call => result,
        }
    }
}

/// Owns an OCR engine for the duration of one request.
///
/// `release` disposes the engine. If the request future is dropped before
/// that, `Drop` hands the engine to a spawned disposal task instead.
struct EngineLease<R: TextRecognizer> {
    ocr: Arc<R>,
    engine: Option<R::Engine>,
}

impl<R: TextRecognizer> EngineLease<R> {
    fn new(ocr: Arc<R>, engine: R::Engine) -> Self {
        Self {
            ocr,
            engine: Some(engine),
        }
    }

    async fn recognize(&self, image: &CapturedImage) -> Result<String, ProviderError> {
        match &self.engine {
            Some(engine) => self.ocr.recognize(engine, image).await,
            None => Err(ProviderError::Other(anyhow::anyhow!("ocr engine already released"))),
        }
    }

    async fn release(&mut self) {
        if let Some(engine) = self.engine.take() {
            dispose(&*self.ocr, engine).await;
        }
    }
}

impl<R: TextRecognizer> Drop for EngineLease<R> {
    fn drop(&mut self) {
        let Some(engine) = self.engine.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let ocr = Arc::clone(&self.ocr);
                debug!("request abandoned; disposing ocr engine in background");
                handle.spawn(async move { dispose(&*ocr, engine).await });
            }
            Err(_) => warn!("request abandoned outside a runtime; ocr engine not disposed"),
        }
    }
}

async fn dispose<R: TextRecognizer>(ocr: &R, engine: R::Engine) {
    match ocr.dispose(engine).await {
        Ok(()) => debug!("ocr engine disposed"),
        Err(err) => warn!(error = %err, "ocr engine disposal failed"),
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
