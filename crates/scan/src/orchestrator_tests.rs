use super::*;
use std::sync::Mutex;

use chrono::NaiveDate;

use crate::error::ScanErrorKind;
use crate::fake::{
    CallLog, FakeBarcodeScanner, FakeCamera, FakeFault, FakeTextRecognizer, ProviderCall, Reply,
};
use crate::provider::ACCEPTED_SYMBOLOGIES;
use pantry_inventory::{InventoryItem, InventoryRepository};

type FakeOrchestrator = ScanOrchestrator<FakeBarcodeScanner, FakeCamera, FakeTextRecognizer>;

struct Harness {
    log: CallLog,
    barcode: FakeBarcodeScanner,
    camera: FakeCamera,
    ocr: FakeTextRecognizer,
}

impl Harness {
    fn new() -> Self {
        let log = CallLog::new();
        Self {
            barcode: FakeBarcodeScanner::new(log.clone(), "4006381333931"),
            camera: FakeCamera::new(log.clone()),
            ocr: FakeTextRecognizer::new(log.clone(), "MILK 1.99\nEGGS 3.49\nTOTAL 5.48"),
            log,
        }
    }

    fn build(self) -> (FakeOrchestrator, CallLog) {
        (ScanOrchestrator::new(self.barcode, self.camera, self.ocr), self.log)
    }
}

fn is_ocr_init(call: &ProviderCall) -> bool {
    matches!(call, ProviderCall::OcrInitialize { .. })
}

fn is_dispose(call: &ProviderCall) -> bool {
    matches!(call, ProviderCall::OcrDispose { .. })
}

fn receipt_image() -> CapturedImage {
    CapturedImage::new(vec![0xFF, 0xD8, 0xFF], "image/jpeg")
}

#[tokio::test]
async fn barcode_flow_decodes_with_fixed_symbologies() {
    let (orchestrator, log) = Harness::new().build();

    let outcome = orchestrator.run(ScanRequest::Barcode).await;

    assert_eq!(outcome.mode, ScanMode::Barcode);
    assert_eq!(
        outcome.trail,
        vec![
            ScanState::CheckingAvailability,
            ScanState::RequestingPermission,
            ScanState::Scanning,
            ScanState::Done,
        ]
    );
    match outcome.result.unwrap() {
        ScanPayload::Barcode(code) => assert_eq!(code.text, "4006381333931"),
        other => panic!("Expected barcode payload, got {other:?}"),
    }
    assert_eq!(
        log.calls(),
        vec![
            ProviderCall::BarcodeAvailable,
            ProviderCall::BarcodePermission,
            ProviderCall::BarcodeScan {
                formats: ACCEPTED_SYMBOLOGIES.to_vec(),
                prompt: "Place the barcode inside the rectangle to scan it.".to_string(),
            },
        ]
    );
}

#[tokio::test]
async fn unavailable_scanner_never_prompts_for_permission() {
    let mut harness = Harness::new();
    harness.barcode = harness.barcode.with_available(Reply::Ok(false));
    let (orchestrator, log) = harness.build();

    let outcome = orchestrator.run(ScanRequest::Barcode).await;

    let err = outcome.result.unwrap_err();
    assert_eq!(err.kind(), ScanErrorKind::DeviceUnavailable);
    assert!(err.cause().is_none());
    assert_eq!(outcome.trail, vec![ScanState::CheckingAvailability, ScanState::Failed]);
    assert_eq!(log.calls(), vec![ProviderCall::BarcodeAvailable]);
}

#[tokio::test]
async fn availability_fault_is_wrapped_as_device_unavailable() {
    let mut harness = Harness::new();
    harness.barcode = harness
        .barcode
        .with_available(Reply::Fail(FakeFault::Other("no camera module".into())));
    let (orchestrator, _log) = harness.build();

    let err = orchestrator.scan_barcode(&CancellationToken::new()).await.unwrap_err();
    assert_eq!(err.kind(), ScanErrorKind::DeviceUnavailable);
    assert_eq!(err.cause().unwrap().to_string(), "no camera module");
}

#[tokio::test]
async fn denied_barcode_permission_skips_scan() {
    let mut harness = Harness::new();
    harness.barcode = harness.barcode.with_permission(Reply::Ok(false));
    let (orchestrator, log) = harness.build();

    let err = orchestrator.scan_barcode(&CancellationToken::new()).await.unwrap_err();
    match err {
        ScanError::PermissionDenied { capability, cause } => {
            assert_eq!(capability, Capability::Barcode);
            assert!(cause.is_none());
        }
        other => panic!("Expected PermissionDenied, got {other:?}"),
    }
    assert_eq!(log.count(|c| matches!(c, ProviderCall::BarcodeScan { .. })), 0);
}

#[tokio::test]
async fn scanner_faults_become_scan_failed_with_cause() {
    for (fault, cancelled) in [(FakeFault::Timeout, false), (FakeFault::Cancelled, true)] {
        let mut harness = Harness::new();
        harness.barcode = harness.barcode.with_scan(Reply::Fail(fault));
        let (orchestrator, _log) = harness.build();

        let err = orchestrator.scan_barcode(&CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.kind(), ScanErrorKind::ScanFailed);
        assert_eq!(err.is_cancelled(), cancelled);
    }
}

#[tokio::test]
async fn photo_flow_captures_an_image() {
    let (orchestrator, log) = Harness::new().build();

    let outcome = orchestrator.run(ScanRequest::Photo).await;

    assert_eq!(
        outcome.trail,
        vec![ScanState::RequestingPermission, ScanState::Capturing, ScanState::Done]
    );
    let payload = outcome.result.unwrap();
    assert_eq!(payload.suggested_name().as_deref(), Some("Photo Captured Item"));
    assert_eq!(log.calls(), vec![ProviderCall::CameraPermission, ProviderCall::Capture]);
}

#[tokio::test]
async fn photo_flow_failures() {
    let mut harness = Harness::new();
    harness.camera = harness.camera.with_permission(Reply::Ok(false));
    let (orchestrator, log) = harness.build();
    let err = orchestrator.take_photo(&CancellationToken::new()).await.unwrap_err();
    assert_eq!(err.kind(), ScanErrorKind::PermissionDenied);
    assert_eq!(log.calls(), vec![ProviderCall::CameraPermission]);

    let mut harness = Harness::new();
    harness.camera = harness
        .camera
        .with_capture(Reply::Fail(FakeFault::Other("shutter jammed".into())));
    let (orchestrator, _log) = harness.build();
    let err = orchestrator.take_photo(&CancellationToken::new()).await.unwrap_err();
    assert_eq!(err.kind(), ScanErrorKind::CaptureFailed);
    assert_eq!(err.cause().unwrap().to_string(), "shutter jammed");
}

#[tokio::test]
async fn receipt_flow_captures_recognizes_and_disposes() {
    let (orchestrator, log) = Harness::new().build();

    let outcome = orchestrator.run(ScanRequest::receipt()).await;

    assert_eq!(
        outcome.trail,
        vec![
            ScanState::RequestingPermission,
            ScanState::Capturing,
            ScanState::Initializing,
            ScanState::Recognizing,
            ScanState::Done,
        ]
    );
    match outcome.result.unwrap() {
        ScanPayload::Receipt(receipt) => {
            assert!(receipt.text.starts_with("MILK 1.99"));
            assert_eq!(receipt.preview(9), "MILK 1.99...");
            assert_eq!(receipt.image.media_type(), "image/png");
        }
        other => panic!("Expected receipt payload, got {other:?}"),
    }
    assert_eq!(
        log.calls(),
        vec![
            ProviderCall::CameraPermission,
            ProviderCall::Capture,
            ProviderCall::OcrInitialize {
                language: "eng".to_string()
            },
            ProviderCall::OcrRecognize { engine: 1 },
            ProviderCall::OcrDispose { engine: 1 },
        ]
    );
}

#[tokio::test]
async fn receipt_capture_failure_never_initializes_ocr() {
    let mut harness = Harness::new();
    harness.camera = harness.camera.with_capture(Reply::Fail(FakeFault::Timeout));
    let (orchestrator, log) = harness.build();

    let err = orchestrator.scan_receipt(None, &CancellationToken::new()).await.unwrap_err();

    assert_eq!(err.kind(), ScanErrorKind::CaptureFailed);
    assert_eq!(log.count(is_ocr_init), 0);
    assert_eq!(log.count(is_dispose), 0);
}

#[tokio::test]
async fn receipt_recognition_failure_still_disposes_once() {
    let mut harness = Harness::new();
    harness.ocr = harness
        .ocr
        .with_recognize(Reply::Fail(FakeFault::Other("blurry".into())));
    let (orchestrator, log) = harness.build();

    let outcome = orchestrator.run(ScanRequest::receipt()).await;

    let err = outcome.result.unwrap_err();
    assert_eq!(err.kind(), ScanErrorKind::OcrRecognitionFailed);
    assert_eq!(err.cause().unwrap().to_string(), "blurry");
    assert_eq!(log.count(is_dispose), 1);
    assert_eq!(outcome.trail.last(), Some(&ScanState::Failed));
}

#[tokio::test]
async fn receipt_init_failure_has_nothing_to_dispose() {
    let mut harness = Harness::new();
    harness.ocr = harness
        .ocr
        .with_initialize(Reply::Fail(FakeFault::Unsupported("language pack missing".into())));
    let (orchestrator, log) = harness.build();

    let err = orchestrator
        .scan_receipt(Some(receipt_image()), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ScanErrorKind::OcrInitFailed);
    assert_eq!(log.count(|c| matches!(c, ProviderCall::OcrRecognize { .. })), 0);
    assert_eq!(log.count(is_dispose), 0);
}

#[tokio::test]
async fn receipt_with_prior_photo_skips_the_camera() {
    let (orchestrator, log) = Harness::new().build();

    let outcome = orchestrator.run(ScanRequest::receipt_from(receipt_image())).await;

    assert_eq!(
        outcome.trail,
        vec![ScanState::Initializing, ScanState::Recognizing, ScanState::Done]
    );
    match outcome.result.unwrap() {
        ScanPayload::Receipt(receipt) => assert_eq!(receipt.image, receipt_image()),
        other => panic!("Expected receipt payload, got {other:?}"),
    }
    assert_eq!(log.count(|c| matches!(c, ProviderCall::Capture)), 0);
}

#[tokio::test]
async fn ocr_language_comes_from_config() {
    let harness = Harness::new();
    let log = harness.log.clone();
    let orchestrator = ScanOrchestrator::with_config(
        harness.barcode,
        harness.camera,
        harness.ocr,
        ScanConfig::default().with_ocr_language("deu"),
    );

    orchestrator
        .scan_receipt(Some(receipt_image()), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        log.count(|c| matches!(c, ProviderCall::OcrInitialize { language } if language == "deu")),
        1
    );
}

#[tokio::test]
async fn repeated_receipts_use_fresh_engines_each_disposed() {
    let (orchestrator, log) = Harness::new().build();
    let cancel = CancellationToken::new();

    orchestrator.scan_receipt(Some(receipt_image()), &cancel).await.unwrap();
    orchestrator.scan_receipt(Some(receipt_image()), &cancel).await.unwrap();

    let disposed: Vec<_> = log
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            ProviderCall::OcrDispose { engine } => Some(engine),
            _ => None,
        })
        .collect();
    assert_eq!(disposed, vec![1, 2]);
}

#[tokio::test]
async fn cancelling_mid_recognition_fails_that_step_and_disposes() {
    let mut harness = Harness::new();
    harness.ocr = harness.ocr.with_recognize(Reply::Hang);
    let (orchestrator, log) = harness.build();
    let cancel = CancellationToken::new();

    let (outcome, ()) = tokio::join!(
        orchestrator.run_with_cancel(ScanRequest::receipt_from(receipt_image()), &cancel),
        async {
            tokio::task::yield_now().await;
            cancel.cancel();
        }
    );

    let err = outcome.result.unwrap_err();
    assert_eq!(err.kind(), ScanErrorKind::OcrRecognitionFailed);
    assert!(err.is_cancelled());
    assert_eq!(
        outcome.trail,
        vec![ScanState::Initializing, ScanState::Recognizing, ScanState::Failed]
    );
    assert_eq!(log.count(is_dispose), 1);
}

#[tokio::test]
async fn cancelled_before_start_touches_no_provider() {
    let (orchestrator, log) = Harness::new().build();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = orchestrator.run_with_cancel(ScanRequest::Barcode, &cancel).await;

    let err = outcome.result.unwrap_err();
    assert_eq!(err.kind(), ScanErrorKind::DeviceUnavailable);
    assert!(err.is_cancelled());
    assert!(log.calls().is_empty());
}

#[tokio::test]
async fn dropping_a_request_mid_recognition_still_disposes() {
    let mut harness = Harness::new();
    harness.ocr = harness.ocr.with_recognize(Reply::Hang);
    let (orchestrator, log) = harness.build();
    let cancel = CancellationToken::new();

    {
        let request = orchestrator.scan_receipt(Some(receipt_image()), &cancel);
        tokio::pin!(request);
        tokio::select! {
            biased;
            _ = &mut request => panic!("recognition should hang"),
            _ = tokio::task::yield_now() => {}
        }
        assert_eq!(log.count(|c| matches!(c, ProviderCall::OcrRecognize { .. })), 1);
    }

    for _ in 0..10 {
        if log.count(is_dispose) > 0 {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(log.count(is_dispose), 1);
}

#[tokio::test]
async fn scanned_barcode_commits_through_the_repository() {
    let (orchestrator, _log) = Harness::new().build();
    let repo = InventoryRepository::new();
    let seen = std::sync::Arc::new(Mutex::new(Vec::new()));
    {
        let seen = std::sync::Arc::clone(&seen);
        repo.subscribe(move |items: &[InventoryItem]| {
            seen.lock().unwrap().push(items.len());
        });
    }

    let payload = orchestrator.run(ScanRequest::Barcode).await.into_result().unwrap();
    let expiry = NaiveDate::from_ymd_opt(2024, 1, 12)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let draft = payload.to_draft("Dairy", expiry).unwrap();
    let item = repo.add_item(draft).unwrap();

    assert_eq!(item.name(), "Scanned Item: 4006381333931");
    assert_eq!(*seen.lock().unwrap(), vec![1]);
}
