//! 파이프라인 trait: 외부 협력자 확장 포인트 정의
//!
//! 카메라 권한 API, 단일 이미지 QR 디코더, 백엔드 scan 조회는 이 crate의 범위 밖입니다.
//! 각 협력자는 아래 trait으로 추상화되어 운영 구현과 테스트 mock을 교체할 수 있습니다.
//!
//! ```text
//! CameraDevice ──acquire──> VideoStream ──capture_frame──> Frame
//!                                                            │
//!                                                      FrameDecoder
//!                                                            │
//!                                                      payload string ──> ScanLookup
//! ```

use std::future::Future;

use crate::error::{DeviceError, LookupError};
use crate::types::{CameraFacing, Frame, ScanLookupResponse};

/// 단일 프레임 QR 디코더
///
/// 순수 동기 함수여야 하며 I/O를 수행하지 않습니다.
/// 코드를 찾지 못하면 `None`을 반환합니다.
pub trait FrameDecoder: Send + Sync + 'static {
    /// RGB8 픽셀 버퍼에서 페이로드 문자열을 추출합니다.
    fn decode(&self, pixels: &[u8], width: u32, height: u32) -> Option<String>;
}

impl<F> FrameDecoder for F
where
    F: Fn(&[u8], u32, u32) -> Option<String> + Send + Sync + 'static,
{
    fn decode(&self, pixels: &[u8], width: u32, height: u32) -> Option<String> {
        self(pixels, width, height)
    }
}

/// 카메라 권한 API
///
/// 스트림 요청은 권한 프롬프트를 띄울 수 있으며, 거부/장치 없음 에러는
/// 사유 문자열과 함께 그대로 반환되어야 합니다.
pub trait CameraDevice: Send + Sync + 'static {
    /// 획득한 비디오 스트림 타입
    type Stream: VideoStream;

    /// 지정한 방향의 카메라 스트림을 요청합니다.
    fn acquire(
        &self,
        facing: CameraFacing,
    ) -> impl Future<Output = Result<Self::Stream, DeviceError>> + Send;
}

/// 라이브 비디오 싱크에 연결된 카메라 스트림
///
/// 스트림은 한 번에 하나의 ScanLoop만 소유합니다.
pub trait VideoStream: Send + 'static {
    /// 현재 프레임을 캡처할 만큼 데이터가 버퍼링되었는지 여부
    fn has_enough_data(&self) -> bool;

    /// 현재 프레임을 픽셀 버퍼로 캡처합니다.
    fn capture_frame(&mut self) -> Option<Frame>;

    /// 스트림 트랙을 정지하고 장치를 해제합니다.
    fn stop(&mut self);
}

/// 백엔드 조회 요청 컨텍스트
///
/// 자격 증명은 전역 저장소에서 읽지 않고 호출마다 명시적으로 전달됩니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Bearer 토큰 (없으면 익명 요청)
    pub auth_token: Option<String>,
}

impl RequestContext {
    /// 익명 컨텍스트
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// 토큰이 포함된 컨텍스트. 빈 문자열은 익명으로 취급합니다.
    pub fn with_token(token: impl Into<String>) -> Self {
        let token = token.into();
        Self {
            auth_token: (!token.trim().is_empty()).then_some(token),
        }
    }
}

/// 백엔드 `scan by hash` 조회
///
/// non-2xx 응답이나 `success: false`는 에러가 아니라 해석 실패로 취급되어야 하므로,
/// 구현체는 전송/프로토콜 수준 실패만 `LookupError`로 반환합니다.
pub trait ScanLookup: Send + Sync + 'static {
    /// `hash`로 엔티티를 조회합니다.
    fn scan_by_hash(
        &self,
        hash: &str,
        ctx: &RequestContext,
    ) -> impl Future<Output = Result<ScanLookupResponse, LookupError>> + Send;
}
