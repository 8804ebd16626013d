//! 스캔 세션: 상태 전이 검증과 이벤트 발행
//!
//! [`ScanSession`]은 스캔 시도 하나를 나타내며, 그것을 시작한 컴포넌트만 소유합니다.
//! 허용되지 않는 전이는 무시되고 경고 로그만 남습니다.
//! 이벤트 채널이 가득 차거나 닫혀 있어도 스캔은 막히지 않습니다.

use tokio::sync::mpsc;
use tracing::{debug, warn};

use tracelink_core::event::{ScanEvent, ScanEventKind, SessionResult};
use tracelink_core::types::{ScanSource, ScanState, SessionId};

/// 스캔 시도 하나
#[derive(Debug)]
pub struct ScanSession {
    id: SessionId,
    source: ScanSource,
    state: ScanState,
    raw_payload: Option<String>,
    events: Option<mpsc::Sender<ScanEvent>>,
}

impl ScanSession {
    /// 새 세션을 생성합니다 (`Idle`).
    pub fn new(source: ScanSource, events: Option<mpsc::Sender<ScanEvent>>) -> Self {
        Self::with_id(SessionId::new(), source, events)
    }

    /// 지정한 ID로 세션을 생성합니다.
    pub fn with_id(
        id: SessionId,
        source: ScanSource,
        events: Option<mpsc::Sender<ScanEvent>>,
    ) -> Self {
        Self {
            id,
            source,
            state: ScanState::Idle,
            raw_payload: None,
            events,
        }
    }

    /// 세션 ID
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// 획득 경로
    pub fn source(&self) -> ScanSource {
        self.source
    }

    /// 현재 상태
    pub fn state(&self) -> ScanState {
        self.state
    }

    /// 디코드되었거나 입력된 원본 문자열
    pub fn raw_payload(&self) -> Option<&str> {
        self.raw_payload.as_deref()
    }

    /// 상태를 전이합니다. 허용되지 않는 전이면 `false`를 반환하고 상태를 유지합니다.
    pub fn transition(&mut self, to: ScanState) -> bool {
        let from = self.state;
        if !from.can_transition_to(to) {
            warn!(
                session_id = %self.id,
                from = %from,
                to = %to,
                "illegal scan state transition ignored"
            );
            return false;
        }

        self.state = to;
        debug!(session_id = %self.id, from = %from, to = %to, "scan state changed");
        self.emit(ScanEventKind::StateChanged { from, to });
        true
    }

    /// 페이로드 검출을 기록하고 `Detected`로 전이합니다.
    ///
    /// 세션당 한 번만 기록되며, 이미 페이로드가 있으면 `false`입니다.
    pub fn detect(&mut self, raw: String) -> bool {
        if self.raw_payload.is_some() {
            warn!(session_id = %self.id, "payload already detected, ignoring");
            return false;
        }
        if !self.transition(ScanState::Detected) {
            return false;
        }

        let raw_len = raw.len();
        self.raw_payload = Some(raw);
        self.emit(ScanEventKind::Detected { raw_len });
        true
    }

    /// 세션 종료 이벤트를 발행합니다.
    pub fn complete(&self, outcome: SessionResult) {
        self.emit(ScanEventKind::Completed { outcome });
    }

    fn emit(&self, kind: ScanEventKind) {
        let Some(tx) = &self.events else {
            return;
        };
        if let Err(e) = tx.try_send(ScanEvent::new(self.id, self.source, kind)) {
            debug!(session_id = %self.id, error = %e, "scan event dropped");
        }
    }
}
