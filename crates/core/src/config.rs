//! 설정 관리: tracelink.toml 파싱 및 런타임 설정
//!
//! [`TracelinkConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`TRACELINK_RESOLVER_BASE_URL=https://api.example.com` 형식)
//! 3. 설정 파일 (`tracelink.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), tracelink_core::error::TracelinkError> {
//! use tracelink_core::config::TracelinkConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = TracelinkConfig::load("tracelink.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = TracelinkConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, TracelinkError};

/// 폴링 간격 허용 범위 (밀리초)
pub const POLL_INTERVAL_RANGE_MS: (u64, u64) = (100, 500);
/// 업로드 이미지 최대 허용 크기 상한
pub const MAX_UPLOAD_BYTES_LIMIT: usize = 50 * 1024 * 1024; // 50 MB
/// 조회 타임아웃 상한 (초)
pub const MAX_TIMEOUT_SECS: u64 = 120;

/// Tracelink 통합 설정
///
/// `tracelink.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 모듈은 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TracelinkConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// QR 스캐너 설정
    #[serde(default)]
    pub scanner: ScannerConfig,
    /// 엔티티 해석 (백엔드 조회) 설정
    #[serde(default)]
    pub resolver: ResolverConfig,
}

impl TracelinkConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, TracelinkError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, TracelinkError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TracelinkError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                TracelinkError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, TracelinkError> {
        toml::from_str(toml_str).map_err(|e| {
            TracelinkError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `TRACELINK_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "TRACELINK_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "TRACELINK_GENERAL_LOG_FORMAT");

        // Scanner
        override_u64(
            &mut self.scanner.poll_interval_ms,
            "TRACELINK_SCANNER_POLL_INTERVAL_MS",
        );
        override_string(
            &mut self.scanner.camera_facing,
            "TRACELINK_SCANNER_CAMERA_FACING",
        );
        override_usize(
            &mut self.scanner.max_upload_bytes,
            "TRACELINK_SCANNER_MAX_UPLOAD_BYTES",
        );
        override_usize(
            &mut self.scanner.event_channel_capacity,
            "TRACELINK_SCANNER_EVENT_CHANNEL_CAPACITY",
        );

        // Resolver
        override_string(&mut self.resolver.base_url, "TRACELINK_RESOLVER_BASE_URL");
        override_u64(
            &mut self.resolver.timeout_secs,
            "TRACELINK_RESOLVER_TIMEOUT_SECS",
        );
        override_string(
            &mut self.resolver.auth_token,
            "TRACELINK_RESOLVER_AUTH_TOKEN",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), TracelinkError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        let (min_poll, max_poll) = POLL_INTERVAL_RANGE_MS;
        if !(min_poll..=max_poll).contains(&self.scanner.poll_interval_ms) {
            return Err(ConfigError::InvalidValue {
                field: "scanner.poll_interval_ms".to_owned(),
                reason: format!("must be {min_poll}-{max_poll}"),
            }
            .into());
        }

        let valid_facings = ["environment", "user"];
        if !valid_facings.contains(&self.scanner.camera_facing.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "scanner.camera_facing".to_owned(),
                reason: format!("must be one of: {}", valid_facings.join(", ")),
            }
            .into());
        }

        if self.scanner.max_upload_bytes == 0 || self.scanner.max_upload_bytes > MAX_UPLOAD_BYTES_LIMIT
        {
            return Err(ConfigError::InvalidValue {
                field: "scanner.max_upload_bytes".to_owned(),
                reason: format!("must be 1-{MAX_UPLOAD_BYTES_LIMIT}"),
            }
            .into());
        }

        if self.scanner.event_channel_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scanner.event_channel_capacity".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        // base_url 검증
        let base_url = self.resolver.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "resolver.base_url".to_owned(),
                reason: "must start with http:// or https://".to_owned(),
            }
            .into());
        }

        if self.resolver.timeout_secs == 0 || self.resolver.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(ConfigError::InvalidValue {
                field: "resolver.timeout_secs".to_owned(),
                reason: format!("must be 1-{MAX_TIMEOUT_SECS}"),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// QR 스캐너 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// 카메라 프레임 폴링 간격 (밀리초)
    pub poll_interval_ms: u64,
    /// 요청할 카메라 방향 (environment, user)
    pub camera_facing: String,
    /// 업로드 이미지 최대 크기 (바이트)
    pub max_upload_bytes: usize,
    /// 세션 이벤트 채널 용량
    pub event_channel_capacity: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 250,
            camera_facing: "environment".to_owned(),
            max_upload_bytes: 10 * 1024 * 1024, // 10 MB
            event_channel_capacity: 64,
        }
    }
}

/// 엔티티 해석 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// 백엔드 API 기본 URL
    pub base_url: String,
    /// 조회 타임아웃 (초)
    pub timeout_secs: u64,
    /// Bearer 토큰 (비어 있으면 익명)
    pub auth_token: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_owned(),
            timeout_secs: 15,
            auth_token: String::new(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
