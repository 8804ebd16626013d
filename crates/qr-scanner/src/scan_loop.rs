//! 카메라 스캔 루프: 프레임 폴링 상태 머신
//!
//! [`CameraScanLoop`]는 카메라 스트림 하나와 폴링 타이머 하나를 소유하며,
//! 첫 디코드 성공 또는 취소 시점에 둘 다 해제합니다.
//!
//! # 상태 흐름
//!
//! ```text
//! Idle --acquire--> AcquiringDevice --stream--> Scanning --payload--> Detected
//!                          |                       |  ^
//!                          +--error--> Failed      |  | (miss: 상태 유지)
//!                                                  +--+
//! (any non-terminal) --stop()/cancel--> Cancelled
//! ```
//!
//! 틱 하나는 동기적으로 준비 확인, 캡처, 디코드를 수행하므로
//! 동시에 진행 중인 디코드는 최대 하나입니다.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use tracelink_core::metrics as m;
use tracelink_core::pipeline::{CameraDevice, FrameDecoder, VideoStream};
use tracelink_core::types::{CameraFacing, ScanSource, ScanState};

use crate::error::QrScannerError;

/// 다른 태스크에서 스캔 루프를 취소하기 위한 핸들
#[derive(Debug, Clone)]
pub struct ScanCancelHandle {
    token: CancellationToken,
}

impl ScanCancelHandle {
    /// 스캔 루프에 취소를 요청합니다. 여러 번 호출해도 안전합니다.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// 취소가 요청되었는지 여부
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// 카메라 프레임 폴링 루프
///
/// 스트림 핸들(`Option<S>`)과 타이머(`Option<Interval>`)를 단독 소유합니다.
/// 해제는 `take()`로 수행되므로 스트림 정지와 타이머 해제는 각각 최대 한 번만 일어납니다.
pub struct CameraScanLoop<S: VideoStream, D: FrameDecoder> {
    decoder: Arc<D>,
    poll_interval: Duration,
    state: ScanState,
    stream: Option<S>,
    ticker: Option<Interval>,
    cancel: CancellationToken,
    attempts: u64,
}

impl<S: VideoStream, D: FrameDecoder> CameraScanLoop<S, D> {
    /// 새 루프를 생성합니다 (`Idle`).
    pub fn new(decoder: Arc<D>, poll_interval: Duration) -> Self {
        Self::with_cancel(decoder, poll_interval, CancellationToken::new())
    }

    /// 외부 취소 토큰에 연결된 루프를 생성합니다.
    ///
    /// 세션 전체를 취소하는 토큰을 넘기면 루프도 함께 정지합니다.
    pub fn with_cancel(decoder: Arc<D>, poll_interval: Duration, cancel: CancellationToken) -> Self {
        Self {
            decoder,
            poll_interval,
            state: ScanState::Idle,
            stream: None,
            ticker: None,
            cancel,
            attempts: 0,
        }
    }

    /// 현재 상태
    pub fn state(&self) -> ScanState {
        self.state
    }

    /// 지금까지 디코더에 넘긴 프레임 수
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// 카메라 스트림을 보유 중인지 여부
    pub fn holds_stream(&self) -> bool {
        self.stream.is_some()
    }

    /// 폴링 타이머가 살아 있는지 여부
    pub fn is_ticking(&self) -> bool {
        self.ticker.is_some()
    }

    /// 취소 핸들을 반환합니다.
    pub fn cancel_handle(&self) -> ScanCancelHandle {
        ScanCancelHandle {
            token: self.cancel.clone(),
        }
    }

    /// 카메라 스트림을 획득하고 폴링을 시작합니다.
    ///
    /// 획득 도중 취소되면 `Ok(())`와 함께 `Cancelled` 상태가 됩니다.
    /// 권한 거부나 장치 없음은 재시도 없이 `Failed`로 끝납니다.
    pub async fn acquire<C>(&mut self, camera: &C, facing: CameraFacing) -> Result<(), QrScannerError>
    where
        C: CameraDevice<Stream = S>,
    {
        if self.state != ScanState::Idle {
            debug!(state = %self.state, "acquire called outside idle state, ignoring");
            return Ok(());
        }
        if self.cancel.is_cancelled() {
            self.state = ScanState::Cancelled;
            return Ok(());
        }

        self.state = ScanState::AcquiringDevice;
        debug!(facing = facing.as_str(), "requesting camera stream");

        let cancel = self.cancel.clone();
        let acquired = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = camera.acquire(facing) => Some(result),
        };

        match acquired {
            None => {
                debug!("camera acquisition cancelled");
                self.state = ScanState::Cancelled;
                Ok(())
            }
            Some(Err(e)) => {
                warn!(error = %e, "camera unavailable");
                self.state = ScanState::Failed;
                Err(QrScannerError::DeviceUnavailable(e))
            }
            Some(Ok(mut stream)) => {
                if self.cancel.is_cancelled() {
                    // 취소 이후 도착한 스트림은 바로 해제
                    stream.stop();
                    self.state = ScanState::Cancelled;
                    return Ok(());
                }

                let mut ticker = tokio::time::interval(self.poll_interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

                self.stream = Some(stream);
                self.ticker = Some(ticker);
                self.state = ScanState::Scanning;
                info!(
                    poll_interval_ms = self.poll_interval.as_millis() as u64,
                    "camera scanning started"
                );
                Ok(())
            }
        }
    }

    /// 폴링 한 번을 수행합니다.
    ///
    /// 코드를 찾으면 스트림과 타이머를 해제한 뒤 원본 페이로드를 반환합니다.
    /// 미검출은 `None`이며 상태가 바뀌지 않습니다.
    pub fn tick(&mut self) -> Option<String> {
        if self.state != ScanState::Scanning {
            return None;
        }
        if self.cancel.is_cancelled() {
            self.stop();
            return None;
        }

        let stream = self.stream.as_mut()?;
        if !stream.has_enough_data() {
            trace!("video not ready, skipping tick");
            return None;
        }
        let frame = stream.capture_frame()?;
        if !frame.is_well_formed() {
            debug!(
                width = frame.width,
                height = frame.height,
                len = frame.data.len(),
                "malformed frame, skipping"
            );
            return None;
        }

        self.attempts += 1;
        counter!(m::QR_SCANNER_DECODE_ATTEMPTS_TOTAL).increment(1);

        match self.decoder.decode(&frame.data, frame.width, frame.height) {
            Some(payload) if !payload.trim().is_empty() => {
                self.release();
                self.state = ScanState::Detected;
                counter!(m::QR_SCANNER_CODES_DETECTED_TOTAL, m::LABEL_SOURCE => ScanSource::Camera.as_str())
                    .increment(1);
                info!(
                    attempts = self.attempts,
                    len = payload.len(),
                    "QR code detected"
                );
                Some(payload)
            }
            _ => {
                trace!(attempt = self.attempts, "no code in frame");
                None
            }
        }
    }

    /// 코드가 검출되거나 취소될 때까지 폴링합니다.
    ///
    /// 취소되었거나 스캔 중이 아니면 `None`을 반환합니다.
    pub async fn next_payload(&mut self) -> Option<String> {
        let cancel = self.cancel.clone();
        loop {
            if self.state != ScanState::Scanning {
                return None;
            }

            let ticker = self.ticker.as_mut()?;
            let ticked = tokio::select! {
                biased;
                _ = cancel.cancelled() => false,
                _ = ticker.tick() => true,
            };

            if !ticked {
                self.stop();
                return None;
            }
            if let Some(payload) = self.tick() {
                return Some(payload);
            }
        }
    }

    /// 루프를 정지합니다.
    ///
    /// 어떤 상태에서든 호출할 수 있으며 여러 번 호출해도 no-op입니다.
    /// 종료 상태가 아니면 `Cancelled`로 전이합니다.
    pub fn stop(&mut self) {
        self.cancel.cancel();
        let released = self.release();
        if self.state.can_transition_to(ScanState::Cancelled) {
            debug!(from = %self.state, released, "scan loop stopped");
            self.state = ScanState::Cancelled;
        }
    }

    /// 스트림과 타이머를 해제합니다. 스트림을 정지했으면 `true`.
    fn release(&mut self) -> bool {
        self.ticker = None;
        match self.stream.take() {
            Some(mut stream) => {
                stream.stop();
                true
            }
            None => false,
        }
    }
}

impl<S: VideoStream, D: FrameDecoder> Drop for CameraScanLoop<S, D> {
    fn drop(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
        }
    }
}
