//! QR 스캐너 파사드: 획득 경로별 진입점과 세션 관리
//!
//! [`QrScanner`]는 UI 계층에 노출되는 인터페이스입니다.
//!
//! # 내부 아키텍처
//!
//! ```text
//! start_camera_scan() --> CameraScanLoop --+
//! scan_uploaded_image() --> UploadedImage --+--> ScanSession(Detected) --> ResolutionPipeline --> ScanReport
//! submit_manual_text() ---------------------+                                       |
//!                                                                      mpsc --> ScanEvent
//! ```
//!
//! 한 번에 하나의 세션만 활성화됩니다. 두 번째 시작 요청은 `AlreadyActive`로 거부되며,
//! [`QrScanner::cancel`]은 어떤 단계의 세션이든 멈춥니다.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use metrics::counter;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tracelink_core::event::{ScanEvent, SessionResult};
use tracelink_core::metrics as m;
use tracelink_core::pipeline::{CameraDevice, FrameDecoder, RequestContext, ScanLookup};
use tracelink_core::types::{FailureKind, Frame, ScanSource, ScanState, SessionId};

use crate::config::QrScannerConfig;
use crate::error::QrScannerError;
use crate::frame::UploadedImage;
use crate::pipeline::{ResolutionPipeline, ScanFailure, ScanOutcome, ScanReport};
use crate::scan_loop::CameraScanLoop;
use crate::session::ScanSession;

/// 현재 활성 세션 정보
#[derive(Debug, Clone)]
struct ActiveScan {
    id: SessionId,
    source: ScanSource,
    cancel: CancellationToken,
}

/// 활성 세션 슬롯을 점유하는 가드. drop 시 슬롯을 비웁니다.
struct ActiveGuard<'a> {
    slot: &'a Mutex<Option<ActiveScan>>,
    scan: ActiveScan,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        let mut slot = lock(self.slot);
        if slot.as_ref().is_some_and(|active| active.id == self.scan.id) {
            *slot = None;
        }
    }
}

fn lock(slot: &Mutex<Option<ActiveScan>>) -> MutexGuard<'_, Option<ActiveScan>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// QR 스캐너
///
/// 카메라, 디코더, 조회 협력자를 주입받아 세 가지 획득 경로를 제공합니다.
/// `&self`로 호출되므로 `Arc<QrScanner>`를 공유해 다른 태스크에서 `cancel()`할 수 있습니다.
pub struct QrScanner<C: CameraDevice, D: FrameDecoder, L: ScanLookup> {
    config: QrScannerConfig,
    camera: Arc<C>,
    decoder: Arc<D>,
    pipeline: ResolutionPipeline<L>,
    event_tx: mpsc::Sender<ScanEvent>,
    active: Mutex<Option<ActiveScan>>,
    sessions_started: AtomicU64,
    sessions_resolved: AtomicU64,
    sessions_degraded: AtomicU64,
    sessions_failed: AtomicU64,
    sessions_cancelled: AtomicU64,
}

impl<C: CameraDevice, D: FrameDecoder, L: ScanLookup> QrScanner<C, D, L> {
    /// 스캐너 설정
    pub fn config(&self) -> &QrScannerConfig {
        &self.config
    }

    /// 시작된 세션 수
    pub fn sessions_started(&self) -> u64 {
        self.sessions_started.load(Ordering::Relaxed)
    }

    /// 엔티티 해석에 성공한 세션 수
    pub fn sessions_resolved(&self) -> u64 {
        self.sessions_resolved.load(Ordering::Relaxed)
    }

    /// fallback 식별자로 끝난 세션 수
    pub fn sessions_degraded(&self) -> u64 {
        self.sessions_degraded.load(Ordering::Relaxed)
    }

    /// 치명적 실패로 끝난 세션 수
    pub fn sessions_failed(&self) -> u64 {
        self.sessions_failed.load(Ordering::Relaxed)
    }

    /// 취소된 세션 수
    pub fn sessions_cancelled(&self) -> u64 {
        self.sessions_cancelled.load(Ordering::Relaxed)
    }

    /// 활성 세션 ID
    pub fn active_session(&self) -> Option<SessionId> {
        lock(&self.active).as_ref().map(|active| active.id)
    }

    /// 활성 세션을 취소합니다. 취소할 세션이 있었으면 `true`.
    ///
    /// 카메라 획득/폴링 중이면 즉시 스트림을 해제하고,
    /// 조회가 진행 중이면 응답을 기다린 뒤 결과를 버립니다.
    pub fn cancel(&self) -> bool {
        match lock(&self.active).as_ref() {
            Some(active) => {
                info!(session_id = %active.id, source = active.source.as_str(), "cancelling scan session");
                active.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// 카메라 스캔 세션을 실행합니다.
    ///
    /// 코드가 검출될 때까지 폴링하고, 검출되면 카메라를 해제한 뒤 해석합니다.
    /// 장치 에러는 `Ok(ScanReport)`의 `Failed` 결과로 보고됩니다.
    ///
    /// # Errors
    ///
    /// 다른 세션이 활성 상태면 `AlreadyActive`
    pub async fn start_camera_scan(&self) -> Result<ScanReport, QrScannerError> {
        let guard = self.begin(ScanSource::Camera)?;
        let token = guard.scan.cancel.clone();
        let mut session = self.open_session(&guard);

        let mut scan_loop = CameraScanLoop::with_cancel(
            Arc::clone(&self.decoder),
            self.config.poll_interval(),
            token.clone(),
        );

        session.transition(ScanState::AcquiringDevice);
        if let Err(e) = scan_loop
            .acquire(self.camera.as_ref(), self.config.camera_facing)
            .await
        {
            return Ok(self.finish(fail(&mut session, &e)));
        }
        if scan_loop.state() != ScanState::Scanning {
            return Ok(self.finish(cancelled(&mut session)));
        }
        session.transition(ScanState::Scanning);

        let Some(raw) = scan_loop.next_payload().await else {
            return Ok(self.finish(cancelled(&mut session)));
        };
        drop(scan_loop);

        session.detect(raw);
        let report = self.pipeline.run(&mut session, &token).await;
        Ok(self.finish(report))
    }

    /// 업로드된 이미지 바이트에서 코드를 한 번 디코드하고 해석합니다.
    ///
    /// 코드가 없으면 `NoCodeInImage`로 실패하며 재시도하지 않습니다.
    ///
    /// # Errors
    ///
    /// 다른 세션이 활성 상태면 `AlreadyActive`
    pub async fn scan_uploaded_image(&self, bytes: &[u8]) -> Result<ScanReport, QrScannerError> {
        let guard = self.begin(ScanSource::UploadedImage)?;

        let max_bytes = self.config.max_upload_bytes;
        if bytes.len() > max_bytes {
            let too_large = QrScannerError::ImageTooLarge {
                size: bytes.len(),
                max: max_bytes,
            };
            return self.finish_upload(&guard, Err(too_large)).await;
        }

        let decoder = Arc::clone(&self.decoder);
        let bytes = bytes.to_vec();
        let decoded = tokio::task::spawn_blocking(move || {
            UploadedImage::from_bytes(&bytes, max_bytes).map(|frame| decode_frame(decoder.as_ref(), &frame))
        })
        .await
        .map_err(|e| QrScannerError::Channel(format!("spawn_blocking failed: {e}")))
        .and_then(|result| result);

        self.finish_upload(&guard, decoded).await
    }

    /// 업로드된 이미지 파일에서 코드를 한 번 디코드하고 해석합니다.
    ///
    /// # Errors
    ///
    /// 다른 세션이 활성 상태면 `AlreadyActive`
    pub async fn scan_uploaded_file(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<ScanReport, QrScannerError> {
        let guard = self.begin(ScanSource::UploadedImage)?;

        let decoded = match UploadedImage::from_path(path, self.config.max_upload_bytes).await {
            Ok(frame) => {
                let decoder = Arc::clone(&self.decoder);
                tokio::task::spawn_blocking(move || decode_frame(decoder.as_ref(), &frame))
                    .await
                    .map_err(|e| QrScannerError::Channel(format!("spawn_blocking failed: {e}")))
            }
            Err(e) => Err(e),
        };

        self.finish_upload(&guard, decoded).await
    }

    /// 수동 입력 문자열을 해석합니다.
    ///
    /// 입력은 변경 없이 원본 페이로드로 기록되며, 공백뿐인 입력은 `EmptyPayload`로 끝납니다.
    ///
    /// # Errors
    ///
    /// 다른 세션이 활성 상태면 `AlreadyActive`
    pub async fn submit_manual_text(&self, text: &str) -> Result<ScanReport, QrScannerError> {
        let guard = self.begin(ScanSource::ManualEntry)?;
        let token = guard.scan.cancel.clone();
        let mut session = self.open_session(&guard);

        if token.is_cancelled() {
            return Ok(self.finish(cancelled(&mut session)));
        }
        session.detect(text.to_owned());
        counter!(m::QR_SCANNER_CODES_DETECTED_TOTAL, m::LABEL_SOURCE => ScanSource::ManualEntry.as_str())
            .increment(1);

        let report = self.pipeline.run(&mut session, &token).await;
        Ok(self.finish(report))
    }

    /// 활성 세션 슬롯을 점유합니다.
    fn begin(&self, source: ScanSource) -> Result<ActiveGuard<'_>, QrScannerError> {
        let mut slot = lock(&self.active);
        if let Some(active) = slot.as_ref() {
            warn!(
                active_session = %active.id,
                requested = source.as_str(),
                "scan session already active"
            );
            return Err(QrScannerError::AlreadyActive(active.id));
        }

        let scan = ActiveScan {
            id: SessionId::new(),
            source,
            cancel: CancellationToken::new(),
        };
        *slot = Some(scan.clone());
        drop(slot);

        self.sessions_started.fetch_add(1, Ordering::Relaxed);
        counter!(m::QR_SCANNER_SESSIONS_STARTED_TOTAL, m::LABEL_SOURCE => source.as_str()).increment(1);
        debug!(session_id = %scan.id, source = source.as_str(), "scan session started");

        Ok(ActiveGuard {
            slot: &self.active,
            scan,
        })
    }

    fn open_session(&self, guard: &ActiveGuard<'_>) -> ScanSession {
        ScanSession::with_id(guard.scan.id, guard.scan.source, Some(self.event_tx.clone()))
    }

    /// 업로드 디코드 결과로 세션을 진행합니다.
    async fn finish_upload(
        &self,
        guard: &ActiveGuard<'_>,
        decoded: Result<Option<String>, QrScannerError>,
    ) -> Result<ScanReport, QrScannerError> {
        let token = guard.scan.cancel.clone();
        let mut session = self.open_session(guard);

        if token.is_cancelled() {
            return Ok(self.finish(cancelled(&mut session)));
        }

        let raw = match decoded {
            Ok(Some(raw)) => raw,
            Ok(None) => return Ok(self.finish(fail(&mut session, &QrScannerError::NoCodeInImage))),
            Err(e) if e.kind().is_some() => return Ok(self.finish(fail(&mut session, &e))),
            Err(e) => return Err(e),
        };

        counter!(m::QR_SCANNER_CODES_DETECTED_TOTAL, m::LABEL_SOURCE => ScanSource::UploadedImage.as_str())
            .increment(1);
        session.detect(raw);
        let report = self.pipeline.run(&mut session, &token).await;
        Ok(self.finish(report))
    }

    /// 종료된 세션을 집계합니다.
    fn finish(&self, report: ScanReport) -> ScanReport {
        let result = report.outcome.result();
        let counter_ref = match result {
            SessionResult::Resolved => &self.sessions_resolved,
            SessionResult::Degraded => &self.sessions_degraded,
            SessionResult::Failed => &self.sessions_failed,
            SessionResult::Cancelled => &self.sessions_cancelled,
        };
        counter_ref.fetch_add(1, Ordering::Relaxed);

        match failure_kind(&report.outcome) {
            Some(kind) => counter!(
                m::QR_SCANNER_SESSIONS_FINISHED_TOTAL,
                m::LABEL_RESULT => result.as_str(),
                m::LABEL_KIND => kind
            )
            .increment(1),
            None => counter!(m::QR_SCANNER_SESSIONS_FINISHED_TOTAL, m::LABEL_RESULT => result.as_str())
                .increment(1),
        }

        info!(
            session_id = %report.session_id,
            source = report.source.as_str(),
            state = %report.state,
            result = %result,
            "scan session finished"
        );
        report
    }
}

/// 단일 프레임 디코드. 공백뿐인 결과는 미검출로 취급합니다.
fn decode_frame<D: FrameDecoder>(decoder: &D, frame: &Frame) -> Option<String> {
    decoder
        .decode(&frame.data, frame.width, frame.height)
        .filter(|payload| !payload.trim().is_empty())
}

fn failure_kind(outcome: &ScanOutcome) -> Option<&'static str> {
    match outcome {
        ScanOutcome::Degraded(degraded) => Some(degraded.kind.as_str()),
        ScanOutcome::Failed(failure) => Some(failure.kind.as_str()),
        ScanOutcome::Resolved(_) | ScanOutcome::Cancelled => None,
    }
}

/// 세션을 치명적 실패로 종료합니다.
fn fail(session: &mut ScanSession, err: &QrScannerError) -> ScanReport {
    let failure = ScanFailure::from_error(err)
        .unwrap_or_else(|| ScanFailure::new(FailureKind::InvalidImage).with_detail(err.to_string()));
    session.transition(ScanState::Failed);
    let report = ScanReport::early(session, ScanOutcome::Failed(failure));
    session.complete(SessionResult::Failed);
    report
}

/// 세션을 취소 상태로 종료합니다.
fn cancelled(session: &mut ScanSession) -> ScanReport {
    session.transition(ScanState::Cancelled);
    let report = ScanReport::cancelled(session);
    session.complete(SessionResult::Cancelled);
    report
}

/// QR 스캐너 빌더
///
/// 카메라, 디코더, 조회 협력자는 필수입니다.
///
/// # 사용 예시
///
/// ```ignore
/// let (scanner, event_rx) = QrScannerBuilder::new()
///     .config(config)
///     .camera(camera)
///     .decoder(decoder)
///     .lookup(HttpScanLookup::from_core(&core.resolver)?)
///     .request_context(RequestContext::with_token(token))
///     .build()?;
/// ```
pub struct QrScannerBuilder<C, D, L> {
    config: QrScannerConfig,
    camera: Option<Arc<C>>,
    decoder: Option<Arc<D>>,
    lookup: Option<Arc<L>>,
    request_context: RequestContext,
    event_tx: Option<mpsc::Sender<ScanEvent>>,
}

impl<C: CameraDevice, D: FrameDecoder, L: ScanLookup> QrScannerBuilder<C, D, L> {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: QrScannerConfig::default(),
            camera: None,
            decoder: None,
            lookup: None,
            request_context: RequestContext::anonymous(),
            event_tx: None,
        }
    }

    /// 설정을 지정합니다.
    pub fn config(mut self, config: QrScannerConfig) -> Self {
        self.config = config;
        self
    }

    /// 카메라 장치를 지정합니다.
    pub fn camera(mut self, camera: C) -> Self {
        self.camera = Some(Arc::new(camera));
        self
    }

    /// 공유 카메라 장치를 지정합니다.
    pub fn shared_camera(mut self, camera: Arc<C>) -> Self {
        self.camera = Some(camera);
        self
    }

    /// 프레임 디코더를 지정합니다.
    pub fn decoder(mut self, decoder: D) -> Self {
        self.decoder = Some(Arc::new(decoder));
        self
    }

    /// 백엔드 조회 클라이언트를 지정합니다.
    pub fn lookup(mut self, lookup: L) -> Self {
        self.lookup = Some(Arc::new(lookup));
        self
    }

    /// 공유 조회 클라이언트를 지정합니다.
    pub fn shared_lookup(mut self, lookup: Arc<L>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    /// 조회 요청 컨텍스트(자격 증명)를 지정합니다.
    pub fn request_context(mut self, ctx: RequestContext) -> Self {
        self.request_context = ctx;
        self
    }

    /// 외부 이벤트 전송 채널을 지정합니다.
    ///
    /// 지정하지 않으면 `build()`가 내부 채널을 생성하고 수신 측을 반환합니다.
    pub fn event_sender(mut self, tx: mpsc::Sender<ScanEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// 스캐너를 빌드합니다.
    ///
    /// # Returns
    ///
    /// `(QrScanner, Option<mpsc::Receiver<ScanEvent>>)`.
    /// 외부 sender를 지정했으면 receiver는 `None`입니다.
    ///
    /// # Errors
    ///
    /// 설정 검증 실패 또는 필수 협력자 누락 시 `Config`
    pub fn build(
        self,
    ) -> Result<(QrScanner<C, D, L>, Option<mpsc::Receiver<ScanEvent>>), QrScannerError> {
        self.config.validate()?;

        let camera = self.camera.ok_or_else(|| missing("camera"))?;
        let decoder = self.decoder.ok_or_else(|| missing("decoder"))?;
        let lookup = self.lookup.ok_or_else(|| missing("lookup"))?;

        let (event_tx, event_rx) = match self.event_tx {
            Some(tx) => (tx, None),
            None => {
                let (tx, rx) = mpsc::channel(self.config.event_channel_capacity);
                (tx, Some(rx))
            }
        };

        let scanner = QrScanner {
            pipeline: ResolutionPipeline::new(lookup, self.request_context),
            config: self.config,
            camera,
            decoder,
            event_tx,
            active: Mutex::new(None),
            sessions_started: AtomicU64::new(0),
            sessions_resolved: AtomicU64::new(0),
            sessions_degraded: AtomicU64::new(0),
            sessions_failed: AtomicU64::new(0),
            sessions_cancelled: AtomicU64::new(0),
        };

        Ok((scanner, event_rx))
    }
}

impl<C: CameraDevice, D: FrameDecoder, L: ScanLookup> Default for QrScannerBuilder<C, D, L> {
    fn default() -> Self {
        Self::new()
    }
}

fn missing(field: &str) -> QrScannerError {
    QrScannerError::Config {
        field: field.to_owned(),
        reason: "is required".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use serde_json::json;

    use tracelink_core::error::{DeviceError, LookupError};
    use tracelink_core::event::ScanEventKind;
    use tracelink_core::pipeline::VideoStream;
    use tracelink_core::types::{CameraFacing, ScanLookupResponse};

    use crate::config::QrScannerConfigBuilder;
    use crate::headless::{NoCamera, NoDecoder};

    // --- mocks ---

    struct MockStream {
        stops: Arc<AtomicUsize>,
    }

    impl VideoStream for MockStream {
        fn has_enough_data(&self) -> bool {
            true
        }

        fn capture_frame(&mut self) -> Option<Frame> {
            Some(Frame::rgb(vec![0u8; 4 * 4 * 3], 4, 4))
        }

        fn stop(&mut self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct MockCamera {
        result: Result<(), DeviceError>,
        stops: Arc<AtomicUsize>,
    }

    impl CameraDevice for MockCamera {
        type Stream = MockStream;

        async fn acquire(&self, _facing: CameraFacing) -> Result<MockStream, DeviceError> {
            self.result.clone().map(|()| MockStream {
                stops: Arc::clone(&self.stops),
            })
        }
    }

    /// N번째 시도에서 고정 페이로드를 반환하는 디코더
    struct HitOnAttempt {
        hit_on: usize,
        payload: &'static str,
        calls: AtomicUsize,
    }

    impl FrameDecoder for HitOnAttempt {
        fn decode(&self, _pixels: &[u8], _width: u32, _height: u32) -> Option<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            (n >= self.hit_on).then(|| self.payload.to_owned())
        }
    }

    struct MockLookup {
        response: Result<ScanLookupResponse, LookupError>,
        delay: Duration,
    }

    impl ScanLookup for MockLookup {
        async fn scan_by_hash(
            &self,
            _hash: &str,
            _ctx: &RequestContext,
        ) -> Result<ScanLookupResponse, LookupError> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.response.clone()
        }
    }

    fn found() -> MockLookup {
        MockLookup {
            response: Ok(ScanLookupResponse {
                success: true,
                data: Some(json!({"entityType": "LAB_TEST", "entityId": "lt-1"})),
            }),
            delay: Duration::ZERO,
        }
    }

    fn fast_config() -> QrScannerConfig {
        QrScannerConfigBuilder::new()
            .poll_interval_ms(100)
            .build()
            .unwrap()
    }

    fn manual_scanner(
        lookup: MockLookup,
    ) -> (
        QrScanner<NoCamera, NoDecoder, MockLookup>,
        Option<mpsc::Receiver<ScanEvent>>,
    ) {
        QrScannerBuilder::new()
            .camera(NoCamera)
            .decoder(NoDecoder)
            .lookup(lookup)
            .build()
            .unwrap()
    }

    // --- builder ---

    #[test]
    fn builder_creates_internal_channel() {
        let (scanner, rx) = manual_scanner(found());
        assert!(rx.is_some());
        assert_eq!(scanner.sessions_started(), 0);
        assert!(scanner.active_session().is_none());
    }

    #[test]
    fn builder_with_external_sender() {
        let (tx, _rx) = mpsc::channel(4);
        let (_scanner, rx) = QrScannerBuilder::new()
            .camera(NoCamera)
            .decoder(NoDecoder)
            .lookup(found())
            .event_sender(tx)
            .build()
            .unwrap();
        assert!(rx.is_none());
    }

    #[test]
    fn builder_requires_lookup() {
        let result = QrScannerBuilder::<NoCamera, NoDecoder, MockLookup>::new()
            .camera(NoCamera)
            .decoder(NoDecoder)
            .build();
        let Err(QrScannerError::Config { field, .. }) = result else {
            panic!("expected config error");
        };
        assert_eq!(field, "lookup");
    }

    #[test]
    fn builder_rejects_invalid_config() {
        let result = QrScannerBuilder::new()
            .config(QrScannerConfig {
                poll_interval_ms: 0,
                ..Default::default()
            })
            .camera(NoCamera)
            .decoder(NoDecoder)
            .lookup(found())
            .build();
        assert!(result.is_err());
    }

    // --- manual entry ---

    #[tokio::test]
    async fn manual_entry_resolves() {
        let (scanner, rx) = manual_scanner(found());
        let mut rx = rx.unwrap();

        let report = scanner.submit_manual_text("lt-hash").await.unwrap();
        assert_eq!(report.state, ScanState::Resolved);
        assert_eq!(report.source, ScanSource::ManualEntry);
        assert_eq!(scanner.sessions_resolved(), 1);
        assert!(scanner.active_session().is_none());

        let mut last = None;
        while let Ok(event) = rx.try_recv() {
            assert_eq!(event.session_id, report.session_id);
            last = Some(event.kind);
        }
        assert_eq!(
            last,
            Some(ScanEventKind::Completed {
                outcome: SessionResult::Resolved
            })
        );
    }

    #[tokio::test]
    async fn blank_manual_entry_is_empty_payload() {
        let (scanner, _rx) = manual_scanner(found());
        let report = scanner.submit_manual_text("   ").await.unwrap();
        let ScanOutcome::Failed(failure) = report.outcome else {
            panic!("expected failure");
        };
        assert_eq!(failure.kind, FailureKind::EmptyPayload);
        assert_eq!(scanner.sessions_failed(), 1);
    }

    #[tokio::test]
    async fn lookup_error_degrades_with_canonical_id() {
        let (scanner, _rx) = manual_scanner(MockLookup {
            response: Err(LookupError::Http { status: 500 }),
            delay: Duration::ZERO,
        });
        let report = scanner
            .submit_manual_text("4e98a08e1809b7b3f4f068eb51d13399")
            .await
            .unwrap();
        let ScanOutcome::Degraded(degraded) = &report.outcome else {
            panic!("expected degraded");
        };
        assert_eq!(degraded.fallback_id, "4e98a08e1809b7b3f4f068eb51d13399");
        assert_eq!(scanner.sessions_degraded(), 1);
    }

    // --- uploads ---

    #[tokio::test]
    async fn invalid_upload_is_fatal() {
        let (scanner, _rx) = manual_scanner(found());
        let report = scanner.scan_uploaded_image(b"not an image").await.unwrap();
        let ScanOutcome::Failed(failure) = report.outcome else {
            panic!("expected failure");
        };
        assert_eq!(failure.kind, FailureKind::InvalidImage);
        assert_eq!(report.state, ScanState::Failed);
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([255, 255, 255]));
        let mut out = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut out, image::ImageOutputFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[tokio::test]
    async fn upload_with_code_degrades_on_lookup_error() {
        let (scanner, rx) = QrScannerBuilder::new()
            .camera(NoCamera)
            .decoder(HitOnAttempt {
                hit_on: 1,
                payload: "https://x.example/q/abc123",
                calls: AtomicUsize::new(0),
            })
            .lookup(MockLookup {
                response: Err(LookupError::Network("connection refused".to_owned())),
                delay: Duration::ZERO,
            })
            .build()
            .unwrap();
        let mut rx = rx.unwrap();

        let report = scanner.scan_uploaded_image(&png_bytes(8, 8)).await.unwrap();
        assert_eq!(report.source, ScanSource::UploadedImage);
        assert_eq!(report.state, ScanState::Failed);
        assert_eq!(report.raw_payload.as_deref(), Some("https://x.example/q/abc123"));
        let ScanOutcome::Degraded(degraded) = &report.outcome else {
            panic!("expected degraded");
        };
        assert_eq!(degraded.fallback_id, "abc123");
        assert_eq!(degraded.kind, FailureKind::LookupError);
        assert_eq!(scanner.sessions_degraded(), 1);

        let mut states = Vec::new();
        while let Ok(event) = rx.try_recv() {
            assert_eq!(event.source, ScanSource::UploadedImage);
            if let ScanEventKind::StateChanged { to, .. } = event.kind {
                states.push(to);
            }
        }
        let detected = states.iter().position(|s| *s == ScanState::Detected);
        let resolving = states.iter().position(|s| *s == ScanState::Resolving);
        assert!(detected.is_some());
        assert!(detected < resolving);
    }

    #[tokio::test]
    async fn upload_without_code_is_no_code_in_image() {
        let (scanner, _rx) = manual_scanner(found());
        let report = scanner.scan_uploaded_image(&png_bytes(8, 8)).await.unwrap();
        assert_eq!(report.state, ScanState::Failed);
        let ScanOutcome::Failed(failure) = report.outcome else {
            panic!("expected failure");
        };
        assert_eq!(failure.kind, FailureKind::NoCodeInImage);
        assert_eq!(scanner.sessions_failed(), 1);
        assert!(scanner.active_session().is_none());
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected_before_decoding() {
        let decoder = HitOnAttempt {
            hit_on: 1,
            payload: "abc123",
            calls: AtomicUsize::new(0),
        };
        let (scanner, _rx) = QrScannerBuilder::new()
            .config(QrScannerConfigBuilder::new().max_upload_bytes(16).build().unwrap())
            .camera(NoCamera)
            .decoder(decoder)
            .lookup(found())
            .build()
            .unwrap();

        let report = scanner.scan_uploaded_image(&png_bytes(8, 8)).await.unwrap();
        let ScanOutcome::Failed(failure) = &report.outcome else {
            panic!("expected failure");
        };
        assert_eq!(failure.kind, FailureKind::InvalidImage);
        assert!(failure.detail.as_deref().unwrap().contains("too large"));
        assert_eq!(scanner.sessions_failed(), 1);
    }

    #[tokio::test]
    async fn missing_upload_file_is_fatal() {
        let (scanner, _rx) = manual_scanner(found());
        let report = scanner
            .scan_uploaded_file("/nonexistent/tracelink/upload.png")
            .await
            .unwrap();
        assert_eq!(report.outcome.result(), SessionResult::Failed);
    }

    // --- camera ---

    #[tokio::test(start_paused = true)]
    async fn camera_scan_detects_and_releases_stream() {
        let stops = Arc::new(AtomicUsize::new(0));
        let (scanner, _rx) = QrScannerBuilder::new()
            .config(fast_config())
            .camera(MockCamera {
                result: Ok(()),
                stops: Arc::clone(&stops),
            })
            .decoder(HitOnAttempt {
                hit_on: 3,
                payload: r#"{"qrHash":"h-1","entityId":"lt-1"}"#,
                calls: AtomicUsize::new(0),
            })
            .lookup(found())
            .build()
            .unwrap();

        let report = scanner.start_camera_scan().await.unwrap();
        assert_eq!(report.state, ScanState::Resolved);
        assert_eq!(report.normalized.unwrap().canonical_id, "h-1");
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn camera_denied_is_device_unavailable() {
        let stops = Arc::new(AtomicUsize::new(0));
        let (scanner, _rx) = QrScannerBuilder::new()
            .camera(MockCamera {
                result: Err(DeviceError::PermissionDenied("NotAllowedError".to_owned())),
                stops,
            })
            .decoder(NoDecoder)
            .lookup(found())
            .build()
            .unwrap();

        let report = scanner.start_camera_scan().await.unwrap();
        let ScanOutcome::Failed(failure) = report.outcome else {
            panic!("expected failure");
        };
        assert_eq!(failure.kind, FailureKind::DeviceUnavailable);
        assert!(failure.detail.unwrap().contains("NotAllowedError"));
        assert!(scanner.active_session().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_polling_camera() {
        let stops = Arc::new(AtomicUsize::new(0));
        let (scanner, _rx) = QrScannerBuilder::new()
            .config(fast_config())
            .camera(MockCamera {
                result: Ok(()),
                stops: Arc::clone(&stops),
            })
            .decoder(NoDecoder)
            .lookup(found())
            .build()
            .unwrap();
        let scanner = Arc::new(scanner);

        let task = tokio::spawn({
            let scanner = Arc::clone(&scanner);
            async move { scanner.start_camera_scan().await }
        });

        tokio::time::sleep(Duration::from_millis(550)).await;
        assert!(scanner.active_session().is_some());
        // 다른 세션은 시작할 수 없음
        assert!(matches!(
            scanner.submit_manual_text("abc").await,
            Err(QrScannerError::AlreadyActive(_))
        ));

        assert!(scanner.cancel());
        let report = task.await.unwrap().unwrap();
        assert_eq!(report.outcome, ScanOutcome::Cancelled);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
        assert!(scanner.active_session().is_none());
        assert!(!scanner.cancel());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_lookup_discards_result() {
        let (scanner, _rx) = manual_scanner(MockLookup {
            delay: Duration::from_secs(2),
            ..found()
        });
        let scanner = Arc::new(scanner);

        let task = tokio::spawn({
            let scanner = Arc::clone(&scanner);
            async move { scanner.submit_manual_text("lt-hash").await }
        });

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(scanner.cancel());
        let report = task.await.unwrap().unwrap();
        assert_eq!(report.outcome, ScanOutcome::Cancelled);
        assert_eq!(report.state, ScanState::Cancelled);
        assert_eq!(scanner.sessions_cancelled(), 1);
        assert_eq!(scanner.sessions_resolved(), 0);
    }
}
