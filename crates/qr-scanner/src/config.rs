//! QR 스캐너 설정
//!
//! [`QrScannerConfig`]는 core의 [`ScannerConfig`](tracelink_core::config::ScannerConfig)를
//! 타입이 있는 값(`Duration`, `CameraFacing`)으로 변환한 스캐너 전용 설정입니다.
//!
//! # 사용 예시
//!
//! ```
//! use tracelink_qr_scanner::{QrScannerConfig, QrScannerConfigBuilder};
//!
//! let config = QrScannerConfig::default();
//! config.validate().unwrap();
//!
//! let config = QrScannerConfigBuilder::new()
//!     .poll_interval_ms(200)
//!     .max_upload_bytes(2 * 1024 * 1024)
//!     .build()
//!     .unwrap();
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use tracelink_core::config::{MAX_UPLOAD_BYTES_LIMIT, POLL_INTERVAL_RANGE_MS};
use tracelink_core::types::CameraFacing;

use crate::error::QrScannerError;

/// QR 스캐너 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrScannerConfig {
    /// 카메라 프레임 폴링 간격 (밀리초)
    pub poll_interval_ms: u64,
    /// 요청할 카메라 방향
    pub camera_facing: CameraFacing,
    /// 업로드 이미지 최대 크기 (바이트)
    pub max_upload_bytes: usize,
    /// 세션 이벤트 채널 용량
    pub event_channel_capacity: usize,
}

impl Default for QrScannerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 250,
            camera_facing: CameraFacing::Environment,
            max_upload_bytes: 10 * 1024 * 1024, // 10 MB
            event_channel_capacity: 64,
        }
    }
}

impl QrScannerConfig {
    /// core의 `ScannerConfig`에서 스캐너 설정을 생성합니다.
    ///
    /// 알 수 없는 카메라 방향은 후면(`Environment`)으로 대체됩니다.
    pub fn from_core(core: &tracelink_core::config::ScannerConfig) -> Self {
        Self {
            poll_interval_ms: core.poll_interval_ms,
            camera_facing: CameraFacing::from_str_loose(&core.camera_facing).unwrap_or_default(),
            max_upload_bytes: core.max_upload_bytes,
            event_channel_capacity: core.event_channel_capacity,
        }
    }

    /// 폴링 간격
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// 설정 값의 유효성을 검증합니다.
    ///
    /// # 검증 규칙
    ///
    /// - `poll_interval_ms`: 100-500
    /// - `max_upload_bytes`: 1-52428800 (50MB)
    /// - `event_channel_capacity`: 1 이상
    pub fn validate(&self) -> Result<(), QrScannerError> {
        let (min_poll, max_poll) = POLL_INTERVAL_RANGE_MS;
        if !(min_poll..=max_poll).contains(&self.poll_interval_ms) {
            return Err(QrScannerError::Config {
                field: "poll_interval_ms".to_owned(),
                reason: format!("must be {min_poll}-{max_poll}"),
            });
        }

        if self.max_upload_bytes == 0 || self.max_upload_bytes > MAX_UPLOAD_BYTES_LIMIT {
            return Err(QrScannerError::Config {
                field: "max_upload_bytes".to_owned(),
                reason: format!("must be 1-{MAX_UPLOAD_BYTES_LIMIT}"),
            });
        }

        if self.event_channel_capacity == 0 {
            return Err(QrScannerError::Config {
                field: "event_channel_capacity".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        Ok(())
    }
}

/// QR 스캐너 설정 빌더
#[derive(Debug, Default)]
pub struct QrScannerConfigBuilder {
    config: QrScannerConfig,
}

impl QrScannerConfigBuilder {
    /// 기본값을 가진 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 폴링 간격(밀리초)을 설정합니다.
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    /// 카메라 방향을 설정합니다.
    pub fn camera_facing(mut self, facing: CameraFacing) -> Self {
        self.config.camera_facing = facing;
        self
    }

    /// 업로드 이미지 최대 크기를 설정합니다.
    pub fn max_upload_bytes(mut self, max: usize) -> Self {
        self.config.max_upload_bytes = max;
        self
    }

    /// 이벤트 채널 용량을 설정합니다.
    pub fn event_channel_capacity(mut self, capacity: usize) -> Self {
        self.config.event_channel_capacity = capacity;
        self
    }

    /// 설정을 검증하고 빌드합니다.
    ///
    /// # Errors
    ///
    /// 유효성 검증 실패 시 `QrScannerError::Config` 반환
    pub fn build(self) -> Result<QrScannerConfig, QrScannerError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
