//! 에러 타입: 도메인별 에러 정의

/// Tracelink 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum TracelinkError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 스캔 처리 에러
    #[error("scan error: {0}")]
    Scan(#[from] ScanError),

    /// 카메라 장치 에러
    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    /// 백엔드 조회 에러
    #[error("lookup error: {0}")]
    Lookup(#[from] LookupError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 스캔 처리 에러
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// 이미 활성화된 스캔 세션이 있음
    #[error("a scan session is already active: {0}")]
    AlreadyActive(String),

    /// 디코딩 실패
    #[error("decode failed: {0}")]
    Decode(String),

    /// 페이로드 정규화 실패
    #[error("normalization failed: {0}")]
    Normalize(String),

    /// 이미지 로딩 실패
    #[error("image error: {0}")]
    Image(String),
}

/// 카메라 장치 에러
///
/// 권한 API가 반환한 사유를 그대로 담습니다.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    /// 사용자가 카메라 권한을 거부함
    #[error("camera permission denied: {0}")]
    PermissionDenied(String),

    /// 사용 가능한 카메라 없음
    #[error("no camera device found: {0}")]
    NotFound(String),

    /// 기타 장치 에러 (장치 사용 중 등)
    #[error("camera error: {0}")]
    Other(String),
}

/// 백엔드 조회 에러
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// 연결 실패, 타임아웃 등 전송 계층 에러
    #[error("network error: {0}")]
    Network(String),

    /// 2xx가 아닌 HTTP 응답
    #[error("http status {status}")]
    Http { status: u16 },

    /// 응답 본문 파싱 실패
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// 요청 URL 구성 실패
    #[error("invalid lookup url: {0}")]
    InvalidUrl(String),
}
