//! QR 스캐너 에러 타입
//!
//! [`QrScannerError`]는 QR 스캐너 모듈 내에서 발생할 수 있는 모든 에러를 나타냅니다.
//! `From<QrScannerError> for TracelinkError` 구현을 통해 `?` 연산자로
//! 상위 에러 타입으로 전파됩니다.
//!
//! # 에러 카테고리
//!
//! - **장치**: `DeviceUnavailable`
//! - **디코딩**: `NoCodeInImage`, `InvalidImage`, `ImageTooLarge`
//! - **정규화**: `EmptyPayload`
//! - **세션**: `AlreadyActive`
//! - **설정**: `Config`
//! - **조회 클라이언트**: `Lookup`
//! - **태스크/파일 I/O**: `Channel`, `Io`
//!
//! 사용자에게 보여줄 분류는 [`QrScannerError::kind`]로 얻습니다.

use tracelink_core::error::{ConfigError, DeviceError, LookupError, ScanError, TracelinkError};
use tracelink_core::types::{FailureKind, SessionId};

/// QR 스캐너 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum QrScannerError {
    /// 카메라 권한 거부 또는 장치 없음
    #[error("camera unavailable: {0}")]
    DeviceUnavailable(DeviceError),

    /// 업로드 이미지에서 QR 코드를 찾지 못함
    #[error("no QR code found in image")]
    NoCodeInImage,

    /// 정규화 결과 식별자가 비어 있음
    #[error("payload contains no usable identifier")]
    EmptyPayload,

    /// 이미지 디코딩 실패
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// 업로드 이미지 크기 초과
    #[error("image too large: {size} bytes (max: {max})")]
    ImageTooLarge {
        /// 실제 크기 (바이트)
        size: usize,
        /// 최대 허용 크기 (바이트)
        max: usize,
    },

    /// 이미 활성화된 세션이 있음
    #[error("scan session {0} is already active")]
    AlreadyActive(SessionId),

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 조회 클라이언트 구성 에러
    #[error("lookup client error: {0}")]
    Lookup(LookupError),

    /// 백그라운드 태스크 통신 에러
    #[error("channel error: {0}")]
    Channel(String),

    /// 파일 I/O 에러
    #[error("io error: {path}: {source}")]
    Io {
        /// 관련 파일 경로
        path: String,
        /// 원본 I/O 에러
        source: std::io::Error,
    },
}

impl QrScannerError {
    /// 세션 실패 분류를 반환합니다.
    ///
    /// 세션 결과로 보고되지 않는 에러(설정, 중복 세션 등)는 `None`입니다.
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            Self::DeviceUnavailable(_) => Some(FailureKind::DeviceUnavailable),
            Self::NoCodeInImage => Some(FailureKind::NoCodeInImage),
            Self::EmptyPayload => Some(FailureKind::EmptyPayload),
            Self::InvalidImage(_) | Self::ImageTooLarge { .. } | Self::Io { .. } => {
                Some(FailureKind::InvalidImage)
            }
            Self::Lookup(_) => Some(FailureKind::LookupError),
            Self::AlreadyActive(_) | Self::Config { .. } | Self::Channel(_) => None,
        }
    }
}

impl From<DeviceError> for QrScannerError {
    fn from(err: DeviceError) -> Self {
        Self::DeviceUnavailable(err)
    }
}

impl From<QrScannerError> for TracelinkError {
    fn from(err: QrScannerError) -> Self {
        match err {
            QrScannerError::DeviceUnavailable(e) => TracelinkError::Device(e),
            QrScannerError::NoCodeInImage => {
                TracelinkError::Scan(ScanError::Decode("no QR code found in image".to_owned()))
            }
            QrScannerError::EmptyPayload => TracelinkError::Scan(ScanError::Normalize(
                "payload contains no usable identifier".to_owned(),
            )),
            QrScannerError::InvalidImage(msg) => TracelinkError::Scan(ScanError::Image(msg)),
            QrScannerError::ImageTooLarge { size, max } => TracelinkError::Scan(
                ScanError::Image(format!("image too large: {size} bytes (max: {max})")),
            ),
            QrScannerError::AlreadyActive(id) => {
                TracelinkError::Scan(ScanError::AlreadyActive(id.to_string()))
            }
            QrScannerError::Config { field, reason } => {
                TracelinkError::Config(ConfigError::InvalidValue { field, reason })
            }
            QrScannerError::Lookup(e) => TracelinkError::Lookup(e),
            QrScannerError::Channel(msg) => TracelinkError::Scan(ScanError::Image(msg)),
            QrScannerError::Io { source, .. } => TracelinkError::Io(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_error_keeps_reason() {
        let err: QrScannerError = DeviceError::PermissionDenied("NotAllowedError".to_owned()).into();
        assert!(err.to_string().contains("NotAllowedError"));
        assert_eq!(err.kind(), Some(FailureKind::DeviceUnavailable));
    }

    #[test]
    fn image_errors_are_invalid_image() {
        let too_large = QrScannerError::ImageTooLarge { size: 20, max: 10 };
        assert_eq!(too_large.kind(), Some(FailureKind::InvalidImage));
        assert!(too_large.to_string().contains("20 bytes"));

        let invalid = QrScannerError::InvalidImage("unsupported format".to_owned());
        assert_eq!(invalid.kind(), Some(FailureKind::InvalidImage));
    }

    #[test]
    fn session_errors_have_no_failure_kind() {
        assert_eq!(QrScannerError::AlreadyActive(SessionId::new()).kind(), None);
        let config = QrScannerError::Config {
            field: "poll_interval_ms".to_owned(),
            reason: "must be 100-500".to_owned(),
        };
        assert_eq!(config.kind(), None);
    }

    #[test]
    fn converts_to_tracelink_error() {
        let err: TracelinkError = QrScannerError::EmptyPayload.into();
        assert!(matches!(err, TracelinkError::Scan(ScanError::Normalize(_))));

        let err: TracelinkError =
            QrScannerError::DeviceUnavailable(DeviceError::NotFound("no camera".to_owned())).into();
        assert!(matches!(err, TracelinkError::Device(DeviceError::NotFound(_))));

        let err: TracelinkError = QrScannerError::Config {
            field: "max_upload_bytes".to_owned(),
            reason: "must be greater than 0".to_owned(),
        }
        .into();
        assert!(matches!(err, TracelinkError::Config(_)));
    }

    #[test]
    fn lookup_error_converts_verbatim() {
        let err: TracelinkError = QrScannerError::Lookup(LookupError::Http { status: 502 }).into();
        assert!(matches!(
            err,
            TracelinkError::Lookup(LookupError::Http { status: 502 })
        ));
    }
}
