//! End-to-end scan session tests with in-process camera, decoder and lookup mocks

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::json;

use tracelink_core::error::{DeviceError, LookupError};
use tracelink_core::pipeline::{CameraDevice, FrameDecoder, RequestContext, ScanLookup, VideoStream};
use tracelink_core::types::{
    CameraFacing, FailureKind, Frame, ScanLookupResponse, ScanSource, ScanState,
};
use tracelink_core::{ScanEventKind, SessionResult};
use tracelink_qr_scanner::{
    CameraScanLoop, EntityIdField, NoCamera, NoDecoder, QrScannerBuilder, QrScannerConfigBuilder,
    ResultDispatcher, ScanOutcome, TraceabilityPanel,
};

// --- mocks ---

struct CountingStream {
    stops: Arc<AtomicUsize>,
}

impl VideoStream for CountingStream {
    fn has_enough_data(&self) -> bool {
        true
    }

    fn capture_frame(&mut self) -> Option<Frame> {
        Some(Frame::rgb(vec![0u8; 8 * 8 * 3], 8, 8))
    }

    fn stop(&mut self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

struct CountingCamera {
    stops: Arc<AtomicUsize>,
}

impl CameraDevice for CountingCamera {
    type Stream = CountingStream;

    async fn acquire(&self, _facing: CameraFacing) -> Result<CountingStream, DeviceError> {
        Ok(CountingStream {
            stops: Arc::clone(&self.stops),
        })
    }
}

struct FixedDecoder(&'static str);

impl FrameDecoder for FixedDecoder {
    fn decode(&self, _pixels: &[u8], _width: u32, _height: u32) -> Option<String> {
        Some(self.0.to_owned())
    }
}

struct FailingLookup;

impl ScanLookup for FailingLookup {
    async fn scan_by_hash(
        &self,
        _hash: &str,
        _ctx: &RequestContext,
    ) -> Result<ScanLookupResponse, LookupError> {
        Err(LookupError::Network("connection refused".to_owned()))
    }
}

struct RecordingLookup {
    tokens: std::sync::Mutex<Vec<Option<String>>>,
}

impl ScanLookup for RecordingLookup {
    async fn scan_by_hash(
        &self,
        hash: &str,
        ctx: &RequestContext,
    ) -> Result<ScanLookupResponse, LookupError> {
        self.tokens.lock().unwrap().push(ctx.auth_token.clone());
        Ok(ScanLookupResponse {
            success: true,
            data: Some(json!({
                "entityType": "RAW_MATERIAL_BATCH",
                "entityId": hash,
                "entityData": {"species": "Ocimum tenuiflorum"},
                "traceabilityData": {"farmers": [{"name": "M. Iyer"}]},
            })),
        })
    }
}

fn camera() -> (CountingCamera, Arc<AtomicUsize>) {
    let stops = Arc::new(AtomicUsize::new(0));
    (
        CountingCamera {
            stops: Arc::clone(&stops),
        },
        stops,
    )
}

// --- lookup failure degrades to the identifier ---

#[tokio::test(start_paused = true)]
async fn test_lookup_error_still_fills_identifier_consumer() {
    let (camera, stops) = camera();
    let (scanner, _rx) = QrScannerBuilder::new()
        .camera(camera)
        .decoder(FixedDecoder("4e98a08e1809b7b3f4f068eb51d13399"))
        .lookup(FailingLookup)
        .build()
        .unwrap();

    let id_field = Arc::new(EntityIdField::new());
    let panel = Arc::new(TraceabilityPanel::new());
    let mut dispatcher = ResultDispatcher::new();
    dispatcher.register(id_field.clone());
    dispatcher.register(panel.clone());

    let report = scanner.start_camera_scan().await.unwrap();
    dispatcher.expect(report.session_id);
    dispatcher.dispatch(&report);

    assert_eq!(report.state, ScanState::Failed);
    assert!(matches!(report.outcome, ScanOutcome::Degraded(_)));
    assert_eq!(
        id_field.value().as_deref(),
        Some("4e98a08e1809b7b3f4f068eb51d13399")
    );
    assert_eq!(panel.notice().unwrap().kind, FailureKind::LookupError);
    // camera released before resolution
    assert_eq!(stops.load(Ordering::SeqCst), 1);
    assert_eq!(scanner.sessions_degraded(), 1);
}

// --- full resolution with explicit credentials ---

#[tokio::test]
async fn test_manual_entry_resolves_with_explicit_token() {
    let lookup = Arc::new(RecordingLookup {
        tokens: std::sync::Mutex::new(Vec::new()),
    });
    let (scanner, rx) = QrScannerBuilder::new()
        .camera(NoCamera)
        .decoder(NoDecoder)
        .shared_lookup(Arc::clone(&lookup))
        .request_context(RequestContext::with_token("operator-token"))
        .build()
        .unwrap();
    let mut rx = rx.unwrap();

    let report = scanner
        .submit_manual_text(r#"{"qrHash":"rmb-hash","entityId":"rmb-7"}"#)
        .await
        .unwrap();

    let ScanOutcome::Resolved(entity) = &report.outcome else {
        panic!("expected resolved, got {:?}", report.outcome);
    };
    assert_eq!(entity.entity_id, "rmb-hash");
    assert_eq!(entity.scanned_data.as_ref().unwrap()["entityId"], "rmb-7");
    assert_eq!(report.display_id.as_deref(), Some("rmb-7"));
    assert_eq!(
        lookup.tokens.lock().unwrap().as_slice(),
        &[Some("operator-token".to_owned())]
    );

    let mut states = Vec::new();
    let mut completed = None;
    while let Ok(event) = rx.try_recv() {
        assert_eq!(event.source, ScanSource::ManualEntry);
        match event.kind {
            ScanEventKind::StateChanged { to, .. } => states.push(to),
            ScanEventKind::Completed { outcome } => completed = Some(outcome),
            ScanEventKind::Detected { .. } => {}
        }
    }
    assert_eq!(
        states,
        vec![ScanState::Detected, ScanState::Resolving, ScanState::Resolved]
    );
    assert_eq!(completed, Some(SessionResult::Resolved));
}

#[tokio::test]
async fn test_camera_unavailable_on_headless_host() {
    let (scanner, _rx) = QrScannerBuilder::new()
        .camera(NoCamera)
        .decoder(NoDecoder)
        .lookup(FailingLookup)
        .build()
        .unwrap();

    let report = scanner.start_camera_scan().await.unwrap();
    let ScanOutcome::Failed(failure) = report.outcome else {
        panic!("expected failure");
    };
    assert_eq!(failure.kind, FailureKind::DeviceUnavailable);
    assert_eq!(failure.message, FailureKind::DeviceUnavailable.user_message());
}

// --- camera loop lifecycle ---

#[tokio::test]
async fn test_double_stop_releases_camera_once() {
    let (camera, stops) = camera();
    let mut scan = CameraScanLoop::new(Arc::new(NoDecoder), Duration::from_millis(250));
    scan.acquire(&camera, CameraFacing::Environment).await.unwrap();
    assert_eq!(scan.state(), ScanState::Scanning);

    scan.stop();
    scan.stop();

    assert_eq!(scan.state(), ScanState::Cancelled);
    assert_eq!(stops.load(Ordering::SeqCst), 1);
    assert!(!scan.holds_stream());
    assert!(!scan.is_ticking());
}

#[tokio::test]
async fn test_fifty_misses_keep_scanning() {
    let (camera, stops) = camera();
    let mut scan = CameraScanLoop::new(Arc::new(NoDecoder), Duration::from_millis(250));
    scan.acquire(&camera, CameraFacing::Environment).await.unwrap();

    for _ in 0..50 {
        assert!(scan.tick().is_none());
    }

    assert_eq!(scan.state(), ScanState::Scanning);
    assert_eq!(scan.attempts(), 50);
    assert_eq!(stops.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_second_session_rejected_while_active() {
    let config = QrScannerConfigBuilder::new()
        .poll_interval_ms(100)
        .build()
        .unwrap();
    let (camera, _stops) = camera();
    let (scanner, _rx) = QrScannerBuilder::new()
        .config(config)
        .camera(camera)
        .decoder(NoDecoder)
        .lookup(FailingLookup)
        .build()
        .unwrap();
    let scanner = Arc::new(scanner);

    let task = tokio::spawn({
        let scanner = Arc::clone(&scanner);
        async move { scanner.start_camera_scan().await }
    });

    // wait for the camera session to register
    while scanner.active_session().is_none() {
        tokio::task::yield_now().await;
    }
    assert!(scanner.scan_uploaded_image(b"irrelevant").await.is_err());

    scanner.cancel();
    let report = task.await.unwrap().unwrap();
    assert_eq!(report.outcome, ScanOutcome::Cancelled);
    assert_eq!(scanner.sessions_started(), 1);
}
