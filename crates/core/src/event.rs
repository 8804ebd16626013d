//! 이벤트 시스템: 스캔 세션 진행 상황 전달
//!
//! 스캔 세션은 상태가 바뀔 때마다 [`ScanEvent`]를 채널로 내보냅니다.
//! [`EventMetadata`]는 모든 이벤트에 공통으로 포함되는 메타데이터이며,
//! [`Event`] trait은 모든 이벤트 타입이 구현해야 하는 인터페이스입니다.
//!
//! 이벤트는 관측용일 뿐 제어 흐름에 영향을 주지 않습니다.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::types::{ScanSource, ScanState, SessionId};

// --- 모듈명 상수 ---

/// QR 스캐너 모듈명
pub const MODULE_QR_SCANNER: &str = "qr-scanner";

// --- 이벤트 타입 상수 ---

/// 스캔 이벤트 타입
pub const EVENT_TYPE_SCAN: &str = "scan";

/// 이벤트 메타데이터: 모든 이벤트에 공통으로 포함되는 추적 정보
///
/// 각 이벤트의 발생 시각, 생성 모듈, 추적 ID를 담고 있어
/// 하나의 스캔에서 나온 이벤트들을 연결할 수 있습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetadata {
    /// 이벤트 발생 시각
    pub timestamp: SystemTime,
    /// 이벤트를 생성한 모듈명 (예: "qr-scanner")
    pub source_module: String,
    /// 추적 ID: 같은 세션의 이벤트를 연결합니다
    pub trace_id: String,
}

impl EventMetadata {
    /// 기존 trace_id를 사용하여 새 메타데이터를 생성합니다.
    pub fn new(source_module: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self {
            timestamp: SystemTime::now(),
            source_module: source_module.into(),
            trace_id: trace_id.into(),
        }
    }

    /// 새로운 UUID v4 trace_id를 생성하여 메타데이터를 만듭니다.
    pub fn with_new_trace(source_module: impl Into<String>) -> Self {
        Self {
            timestamp: SystemTime::now(),
            source_module: source_module.into(),
            trace_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

impl fmt::Display for EventMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] source={} trace={}",
            unix_timestamp_str(self.timestamp),
            self.source_module,
            self.trace_id,
        )
    }
}

/// 모든 이벤트가 구현해야 하는 기본 trait
///
/// `Send + Sync + 'static` 바운드로 `tokio::mpsc` 채널을 통한
/// 안전한 전송을 보장합니다.
pub trait Event: Send + Sync + 'static {
    /// 이벤트 고유 ID (UUID v4)
    fn event_id(&self) -> &str;

    /// 이벤트 메타데이터 (timestamp, source_module, trace_id)
    fn metadata(&self) -> &EventMetadata;

    /// 이벤트 타입명 (로깅 및 라우팅에 사용)
    fn event_type(&self) -> &str;
}

/// 세션 종료 결과 분류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionResult {
    /// 엔티티 해석 성공
    Resolved,
    /// 조회 실패, 식별자 fallback 제공
    Degraded,
    /// 치명적 실패
    Failed,
    /// 취소됨
    Cancelled,
}

impl SessionResult {
    /// 메트릭 레이블용 이름
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Resolved => "resolved",
            Self::Degraded => "degraded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SessionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 스캔 이벤트 종류
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEventKind {
    /// 세션 상태 전이
    StateChanged { from: ScanState, to: ScanState },
    /// 페이로드 검출 (원본 길이만 기록)
    Detected { raw_len: usize },
    /// 세션 종료
    Completed { outcome: SessionResult },
}

/// 스캔 세션 이벤트
#[derive(Debug, Clone)]
pub struct ScanEvent {
    /// 이벤트 고유 ID
    pub id: String,
    /// 이벤트 메타데이터 (trace_id = 세션 ID)
    pub metadata: EventMetadata,
    /// 세션 ID
    pub session_id: SessionId,
    /// 페이로드 획득 경로
    pub source: ScanSource,
    /// 이벤트 종류
    pub kind: ScanEventKind,
}

impl ScanEvent {
    /// 세션에 연결된 스캔 이벤트를 생성합니다.
    pub fn new(session_id: SessionId, source: ScanSource, kind: ScanEventKind) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            metadata: EventMetadata::new(MODULE_QR_SCANNER, session_id.to_string()),
            session_id,
            source,
            kind,
        }
    }

    /// 상태 전이 이벤트
    pub fn state_changed(
        session_id: SessionId,
        source: ScanSource,
        from: ScanState,
        to: ScanState,
    ) -> Self {
        Self::new(session_id, source, ScanEventKind::StateChanged { from, to })
    }
}

impl Event for ScanEvent {
    fn event_id(&self) -> &str {
        &self.id
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    fn event_type(&self) -> &str {
        EVENT_TYPE_SCAN
    }
}

impl fmt::Display for ScanEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short_id = &self.id[..8.min(self.id.len())];
        match &self.kind {
            ScanEventKind::StateChanged { from, to } => write!(
                f,
                "ScanEvent[{short_id}] session={} source={} {from} -> {to}",
                self.session_id, self.source,
            ),
            ScanEventKind::Detected { raw_len } => write!(
                f,
                "ScanEvent[{short_id}] session={} source={} detected len={raw_len}",
                self.session_id, self.source,
            ),
            ScanEventKind::Completed { outcome } => write!(
                f,
                "ScanEvent[{short_id}] session={} source={} completed={outcome}",
                self.session_id, self.source,
            ),
        }
    }
}

/// SystemTime을 사람이 읽을 수 있는 형태로 변환합니다.
fn unix_timestamp_str(time: SystemTime) -> String {
    match time.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(duration) => {
            let secs = duration.as_secs();
            format!("{secs}")
        }
        Err(_) => "unknown".to_owned(),
    }
}
