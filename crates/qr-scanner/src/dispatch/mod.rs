//! 결과 분배: 하나의 해석 결과를 여러 소비자 관점으로 투영
//!
//! 소비자는 [`Interest`]로 원하는 투영을 선언하고, [`ResultDispatcher`]는
//! [`ScanReport`] 하나를 각 소비자에게 맞는 [`Delivery`]로 변환해 전달합니다.
//!
//! | Interest | Resolved | Degraded | Failed |
//! |---|---|---|---|
//! | `Identifier` | 표시 ID | fallback ID | `Unavailable` |
//! | `StructuredFields` | 필드 | QR 구조화 데이터의 필드 | `Unavailable` |
//! | `FullDetail` | `TraceabilityView` | `Unavailable` | `Unavailable` |
//!
//! 취소된 세션과 다른 세션의 결과(stale)는 아무에게도 전달되지 않습니다.
//! 소비자는 수동적이며 스캔이나 해석을 다시 시작하지 않습니다.
//!
//! - [`autofill`]: 폼 자동 입력 프로필과 필드 추출
//! - [`detail`]: 엔티티 타입별 추적 정보 뷰
//! - [`adapters`]: 기본 제공 소비자 구현

pub mod adapters;
pub mod autofill;
pub mod detail;

use std::sync::Arc;

use tracing::{debug, info};

use tracelink_core::types::SessionId;

use crate::pipeline::{ScanFailure, ScanOutcome, ScanReport};

pub use adapters::{EntityIdField, ManufacturerForm, RecipientForm, TraceabilityPanel};
pub use autofill::{AutofillFields, AutofillProfile};
pub use detail::TraceabilityView;

/// 소비자가 원하는 결과 투영
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interest {
    /// 표시 ID 문자열만 (해석 실패 시에도 받음)
    Identifier,
    /// 프로필이 정의한 이름 있는 필드
    StructuredFields(AutofillProfile),
    /// 추적 정보를 포함한 전체 엔티티
    FullDetail,
}

/// 소비자에게 전달되는 값
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// 폼 필드에 넣을 식별자
    Identifier(String),
    /// 자동 입력 필드
    Fields(AutofillFields),
    /// 추적 정보 뷰
    Detail(TraceabilityView),
    /// 이 소비자에게 줄 값이 없음 (사용자 메시지 포함)
    Unavailable(ScanFailure),
}

/// 스캔 결과 소비자
pub trait ScanConsumer: Send + Sync {
    /// 로그용 소비자 이름
    fn name(&self) -> &str;

    /// 원하는 투영
    fn interest(&self) -> Interest;

    /// 투영된 값을 받습니다.
    fn deliver(&self, delivery: Delivery);
}

/// 분배 결과 요약
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// 값을 전달한 소비자 수 (`Unavailable` 포함)
    pub delivered: usize,
    /// stale 결과로 버려졌는지 여부
    pub stale: bool,
}

/// 결과 분배기
#[derive(Default)]
pub struct ResultDispatcher {
    consumers: Vec<Arc<dyn ScanConsumer>>,
    expected: Option<SessionId>,
}

impl ResultDispatcher {
    /// 빈 분배기를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 소비자를 등록합니다.
    pub fn register(&mut self, consumer: Arc<dyn ScanConsumer>) {
        debug!(consumer = consumer.name(), "scan consumer registered");
        self.consumers.push(consumer);
    }

    /// 등록된 소비자 수
    pub fn consumer_count(&self) -> usize {
        self.consumers.len()
    }

    /// 결과를 받을 세션을 지정합니다. 이전 기대값은 대체됩니다.
    pub fn expect(&mut self, session_id: SessionId) {
        self.expected = Some(session_id);
    }

    /// 현재 기대 중인 세션
    pub fn expected(&self) -> Option<SessionId> {
        self.expected
    }

    /// 보고서를 등록된 소비자에게 분배합니다.
    ///
    /// 기대한 세션의 보고서만 한 번 분배하며, 분배 후 기대값은 비워집니다.
    pub fn dispatch(&mut self, report: &ScanReport) -> DispatchSummary {
        if self.expected != Some(report.session_id) {
            debug!(
                session_id = %report.session_id,
                expected = ?self.expected,
                "stale scan report dropped"
            );
            return DispatchSummary {
                delivered: 0,
                stale: true,
            };
        }
        self.expected = None;

        if matches!(report.outcome, ScanOutcome::Cancelled) {
            debug!(session_id = %report.session_id, "cancelled session, nothing to dispatch");
            return DispatchSummary::default();
        }

        let mut delivered = 0;
        for consumer in &self.consumers {
            let Some(delivery) = project(consumer.interest(), report) else {
                continue;
            };
            debug!(consumer = consumer.name(), session_id = %report.session_id, "delivering scan result");
            consumer.deliver(delivery);
            delivered += 1;
        }

        info!(
            session_id = %report.session_id,
            result = %report.outcome.result(),
            delivered,
            "scan result dispatched"
        );
        DispatchSummary {
            delivered,
            stale: false,
        }
    }
}

/// 보고서를 관심사에 맞게 투영합니다. 취소된 보고서는 `None`.
pub fn project(interest: Interest, report: &ScanReport) -> Option<Delivery> {
    let delivery = match (&report.outcome, interest) {
        (ScanOutcome::Cancelled, _) => return None,
        (ScanOutcome::Failed(failure), _) => Delivery::Unavailable(failure.clone()),

        (ScanOutcome::Resolved(_), Interest::Identifier) => {
            Delivery::Identifier(report.display_id.clone().unwrap_or_default())
        }
        (ScanOutcome::Degraded(degraded), Interest::Identifier) => {
            Delivery::Identifier(degraded.fallback_id.clone())
        }

        (_, Interest::StructuredFields(profile)) => Delivery::Fields(profile.extract(report)),

        (ScanOutcome::Resolved(entity), Interest::FullDetail) => {
            Delivery::Detail(TraceabilityView::from_entity(entity))
        }
        (ScanOutcome::Degraded(degraded), Interest::FullDetail) => {
            Delivery::Unavailable(ScanFailure {
                kind: degraded.kind,
                message: degraded.message.clone(),
                detail: degraded.detail.clone(),
            })
        }
    };
    Some(delivery)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use tracelink_core::types::{
        EntityType, FailureKind, NormalizedPayload, ResolvedEntity, ScanSource, ScanState,
    };

    use crate::pipeline::DegradedResult;

    struct Panel {
        id: Arc<EntityIdField>,
        recipient: Arc<RecipientForm>,
        manufacturer: Arc<ManufacturerForm>,
        trace: Arc<TraceabilityPanel>,
        dispatcher: ResultDispatcher,
    }

    fn panel() -> Panel {
        let id = Arc::new(EntityIdField::new());
        let recipient = Arc::new(RecipientForm::new());
        let manufacturer = Arc::new(ManufacturerForm::new());
        let trace = Arc::new(TraceabilityPanel::new());

        let mut dispatcher = ResultDispatcher::new();
        dispatcher.register(id.clone());
        dispatcher.register(recipient.clone());
        dispatcher.register(manufacturer.clone());
        dispatcher.register(trace.clone());

        Panel {
            id,
            recipient,
            manufacturer,
            trace,
            dispatcher,
        }
    }

    fn report(outcome: ScanOutcome) -> ScanReport {
        ScanReport {
            session_id: SessionId::new(),
            source: ScanSource::Camera,
            state: ScanState::Resolved,
            raw_payload: Some("4e98a08e1809b7b3f4f068eb51d13399".to_owned()),
            normalized: Some(NormalizedPayload {
                canonical_id: "4e98a08e1809b7b3f4f068eb51d13399".to_owned(),
                structured: None,
            }),
            display_id: Some("4e98a08e1809b7b3f4f068eb51d13399".to_owned()),
            outcome,
        }
    }

    fn resolved() -> ScanReport {
        report(ScanOutcome::Resolved(ResolvedEntity {
            entity_type: EntityType::LabTest,
            entity_id: "lt-1".to_owned(),
            entity_data: json!({"labName": "Kerala Lab", "manufacturerName": "Veda Labs"}),
            traceability_data: None,
            scanned_data: None,
            extra: Default::default(),
        }))
    }

    #[test]
    fn resolved_report_reaches_every_consumer() {
        let mut p = panel();
        let report = resolved();
        p.dispatcher.expect(report.session_id);

        let summary = p.dispatcher.dispatch(&report);
        assert_eq!(summary, DispatchSummary { delivered: 4, stale: false });
        assert_eq!(p.id.value().as_deref(), Some("4e98a08e1809b7b3f4f068eb51d13399"));
        assert_eq!(p.manufacturer.manufacturer_name().as_deref(), Some("Veda Labs"));
        assert_eq!(p.trace.view().unwrap().field("Laboratory"), Some("Kerala Lab"));
        assert!(p.recipient.fields().is_some());
    }

    #[test]
    fn lookup_error_still_fills_identifier() {
        let mut p = panel();
        let mut report = report(ScanOutcome::Degraded(DegradedResult {
            fallback_id: "4e98a08e1809b7b3f4f068eb51d13399".to_owned(),
            kind: FailureKind::LookupError,
            message: FailureKind::LookupError.user_message().to_owned(),
            detail: Some("network error: connection refused".to_owned()),
        }));
        report.state = ScanState::Failed;
        p.dispatcher.expect(report.session_id);

        p.dispatcher.dispatch(&report);
        assert_eq!(p.id.value().as_deref(), Some("4e98a08e1809b7b3f4f068eb51d13399"));
        assert!(p.trace.view().is_none());
        assert_eq!(p.trace.notice().unwrap().kind, FailureKind::LookupError);
    }

    #[test]
    fn fatal_failure_keeps_previous_identifier() {
        let mut p = panel();
        let first = resolved();
        p.dispatcher.expect(first.session_id);
        p.dispatcher.dispatch(&first);

        let failed = report(ScanOutcome::Failed(ScanFailure::new(FailureKind::NoCodeInImage)));
        p.dispatcher.expect(failed.session_id);
        p.dispatcher.dispatch(&failed);

        assert_eq!(p.id.value().as_deref(), Some("4e98a08e1809b7b3f4f068eb51d13399"));
        assert_eq!(p.id.notice().unwrap().kind, FailureKind::NoCodeInImage);
        assert_eq!(p.manufacturer.notice().unwrap().kind, FailureKind::NoCodeInImage);
    }

    #[test]
    fn stale_report_is_dropped() {
        let mut p = panel();
        let old = resolved();
        let current = resolved();
        p.dispatcher.expect(current.session_id);

        let summary = p.dispatcher.dispatch(&old);
        assert!(summary.stale);
        assert!(p.id.value().is_none());
        assert_eq!(p.dispatcher.expected(), Some(current.session_id));
    }

    #[test]
    fn report_is_dispatched_once() {
        let mut p = panel();
        let report = resolved();
        p.dispatcher.expect(report.session_id);
        assert!(!p.dispatcher.dispatch(&report).stale);
        assert!(p.dispatcher.dispatch(&report).stale);
    }

    #[test]
    fn cancelled_report_delivers_nothing() {
        let mut p = panel();
        let report = report(ScanOutcome::Cancelled);
        p.dispatcher.expect(report.session_id);

        let summary = p.dispatcher.dispatch(&report);
        assert_eq!(summary, DispatchSummary::default());
        assert!(p.id.value().is_none());
        assert!(p.id.notice().is_none());
    }
}
