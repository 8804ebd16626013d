//! 해석 파이프라인: Detected 이후 정규화, 조회, 결과 보고
//!
//! 모든 획득 경로가 검출 이후에는 같은 흐름을 따릅니다.
//!
//! ```text
//! Detected --normalize--> Resolving --lookup--> Resolved
//!    |                        |
//!    +--EmptyPayload--> Failed  +--NotFound/LookupError--> Failed (degraded, fallback id 제공)
//! ```
//!
//! 진행 중인 조회는 중단하지 않습니다. 조회 도중 세션이 취소되면 결과를 버리고
//! `Cancelled`로 보고합니다.

use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use tracelink_core::event::SessionResult;
use tracelink_core::pipeline::{RequestContext, ScanLookup};
use tracelink_core::types::{
    FailureKind, NormalizedPayload, ResolvedEntity, ScanSource, ScanState, SessionId,
};

use crate::error::QrScannerError;
use crate::normalizer::PayloadNormalizer;
use crate::resolver::{EntityResolver, Resolution};
use crate::session::ScanSession;

/// 치명적 실패
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanFailure {
    /// 실패 분류
    pub kind: FailureKind,
    /// 사용자에게 보여줄 메시지
    pub message: String,
    /// 원인 (장치 에러 사유 등)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ScanFailure {
    /// 분류의 기본 메시지로 실패를 생성합니다.
    pub fn new(kind: FailureKind) -> Self {
        Self {
            kind,
            message: kind.user_message().to_owned(),
            detail: None,
        }
    }

    /// 원인 설명을 덧붙입니다.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// 스캐너 에러에서 실패를 생성합니다. 세션 실패가 아닌 에러는 `None`.
    pub fn from_error(err: &QrScannerError) -> Option<Self> {
        let kind = err.kind()?;
        let failure = Self::new(kind);
        Some(match err {
            QrScannerError::NoCodeInImage | QrScannerError::EmptyPayload => failure,
            other => failure.with_detail(other.to_string()),
        })
    }
}

/// 조회 실패 시 식별자 fallback 결과
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DegradedResult {
    /// 폼에 채울 수 있는 최선의 식별자
    pub fallback_id: String,
    /// `NoEntityFound` 또는 `LookupError`
    pub kind: FailureKind,
    /// 사용자에게 보여줄 메시지
    pub message: String,
    /// 조회 에러 설명
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// 세션 결과
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "result", rename_all = "snake_case")]
pub enum ScanOutcome {
    /// 엔티티 해석 성공
    Resolved(ResolvedEntity),
    /// 조회 실패, fallback 식별자 제공
    Degraded(DegradedResult),
    /// 치명적 실패
    Failed(ScanFailure),
    /// 취소됨
    Cancelled,
}

impl ScanOutcome {
    /// 종료 결과 분류
    pub fn result(&self) -> SessionResult {
        match self {
            Self::Resolved(_) => SessionResult::Resolved,
            Self::Degraded(_) => SessionResult::Degraded,
            Self::Failed(_) => SessionResult::Failed,
            Self::Cancelled => SessionResult::Cancelled,
        }
    }
}

/// 세션 최종 보고서
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    /// 세션 ID (stale 결과 판별용)
    pub session_id: SessionId,
    /// 획득 경로
    pub source: ScanSource,
    /// 세션 종료 상태
    pub state: ScanState,
    /// 원본 페이로드
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_payload: Option<String>,
    /// 정규화 결과
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalized: Option<NormalizedPayload>,
    /// 식별자 소비자에게 전달할 값
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_id: Option<String>,
    /// 결과
    pub outcome: ScanOutcome,
}

impl ScanReport {
    /// 정규화 이전 단계에서 끝난 세션의 보고서
    pub fn early(session: &ScanSession, outcome: ScanOutcome) -> Self {
        Self {
            session_id: session.id(),
            source: session.source(),
            state: session.state(),
            raw_payload: session.raw_payload().map(str::to_owned),
            normalized: None,
            display_id: None,
            outcome,
        }
    }

    /// 취소 보고서
    pub fn cancelled(session: &ScanSession) -> Self {
        Self::early(session, ScanOutcome::Cancelled)
    }
}

/// 식별자 소비자용 값
///
/// 구조화 데이터가 있으면 표시 ID, 없으면 canonical id를 사용합니다.
pub fn display_identifier(raw: &str, normalized: &NormalizedPayload) -> String {
    match &normalized.structured {
        Some(structured) => PayloadNormalizer::best_display_id(raw, Some(structured)),
        None => normalized.canonical_id.clone(),
    }
}

/// Detected → Resolving → 종료 상태 흐름
pub struct ResolutionPipeline<L: ScanLookup> {
    resolver: EntityResolver<L>,
    ctx: RequestContext,
}

impl<L: ScanLookup> ResolutionPipeline<L> {
    /// 조회 협력자와 요청 컨텍스트로 파이프라인을 생성합니다.
    pub fn new(lookup: Arc<L>, ctx: RequestContext) -> Self {
        Self {
            resolver: EntityResolver::new(lookup),
            ctx,
        }
    }

    /// 요청 컨텍스트
    pub fn context(&self) -> &RequestContext {
        &self.ctx
    }

    /// `Detected` 상태의 세션을 해석합니다.
    ///
    /// 세션은 항상 종료 상태로 끝나며 `Completed` 이벤트가 발행됩니다.
    pub async fn run(&self, session: &mut ScanSession, cancel: &CancellationToken) -> ScanReport {
        let report = self.resolve_session(session, cancel).await;
        session.complete(report.outcome.result());
        report
    }

    async fn resolve_session(
        &self,
        session: &mut ScanSession,
        cancel: &CancellationToken,
    ) -> ScanReport {
        if cancel.is_cancelled() {
            session.transition(ScanState::Cancelled);
            return ScanReport::cancelled(session);
        }

        let raw = session.raw_payload().unwrap_or_default().to_owned();
        let normalized = match PayloadNormalizer::normalize(&raw) {
            Ok(normalized) => normalized,
            Err(e) => {
                session.transition(ScanState::Failed);
                let failure = ScanFailure::from_error(&e)
                    .unwrap_or_else(|| ScanFailure::new(FailureKind::EmptyPayload));
                return ScanReport::early(session, ScanOutcome::Failed(failure));
            }
        };
        let display_id = display_identifier(&raw, &normalized);
        debug!(
            session_id = %session.id(),
            canonical_id = %normalized.canonical_id,
            structured = normalized.structured.is_some(),
            "payload normalized"
        );

        session.transition(ScanState::Resolving);
        let resolution = self.resolver.resolve(&normalized, &self.ctx).await;

        if cancel.is_cancelled() {
            info!(session_id = %session.id(), "session closed during lookup, discarding result");
            session.transition(ScanState::Cancelled);
            return ScanReport {
                normalized: Some(normalized),
                ..ScanReport::cancelled(session)
            };
        }

        let outcome = match resolution {
            Resolution::Resolved(entity) => {
                session.transition(ScanState::Resolved);
                ScanOutcome::Resolved(entity)
            }
            Resolution::NotFound => {
                session.transition(ScanState::Failed);
                ScanOutcome::Degraded(degraded(&display_id, FailureKind::NoEntityFound, None))
            }
            Resolution::Failed(e) => {
                session.transition(ScanState::Failed);
                ScanOutcome::Degraded(degraded(
                    &display_id,
                    FailureKind::LookupError,
                    Some(e.to_string()),
                ))
            }
        };

        ScanReport {
            session_id: session.id(),
            source: session.source(),
            state: session.state(),
            raw_payload: Some(raw),
            normalized: Some(normalized),
            display_id: Some(display_id),
            outcome,
        }
    }
}

fn degraded(fallback_id: &str, kind: FailureKind, detail: Option<String>) -> DegradedResult {
    DegradedResult {
        fallback_id: fallback_id.to_owned(),
        kind,
        message: kind.user_message().to_owned(),
        detail,
    }
}
