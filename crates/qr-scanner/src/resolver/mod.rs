//! 엔티티 해석: canonical id를 백엔드 엔티티로 변환
//!
//! [`EntityResolver`]는 [`ScanLookup`] 협력자를 호출하고 결과를 [`Resolution`]으로 분류합니다.
//! 조회 실패는 에러로 전파되지 않고 `NotFound`/`Failed`로 반환되어
//! 호출자가 식별자 fallback으로 degraded 처리할 수 있습니다.
//!
//! - [`http`]: reqwest 기반 `GET /api/qr-codes/scan/{hash}` 구현

pub mod http;

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tracing::{debug, info, warn};

use tracelink_core::error::LookupError;
use tracelink_core::metrics as m;
use tracelink_core::pipeline::{RequestContext, ScanLookup};
use tracelink_core::types::{
    FailureKind, NormalizedPayload, ResolvedEntity, ScanLookupData, ScanLookupResponse,
};

pub use http::HttpScanLookup;

/// 조회 결과 분류
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// 엔티티 해석 성공
    Resolved(ResolvedEntity),
    /// 백엔드는 응답했지만 매칭되는 엔티티 없음
    NotFound,
    /// 네트워크/HTTP/응답 형식 실패
    Failed(LookupError),
}

impl Resolution {
    /// 실패 분류 (성공이면 `None`)
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Resolved(_) => None,
            Self::NotFound => Some(FailureKind::NoEntityFound),
            Self::Failed(_) => Some(FailureKind::LookupError),
        }
    }

    /// 메트릭 레이블용 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resolved(_) => "found",
            Self::NotFound => "not_found",
            Self::Failed(_) => "error",
        }
    }
}

/// 엔티티 해석기
///
/// 세션 상태를 직접 변경하지 않으며, 네트워크 호출 외의 부수 효과가 없습니다.
pub struct EntityResolver<L: ScanLookup> {
    lookup: Arc<L>,
}

impl<L: ScanLookup> Clone for EntityResolver<L> {
    fn clone(&self) -> Self {
        Self {
            lookup: Arc::clone(&self.lookup),
        }
    }
}

impl<L: ScanLookup> EntityResolver<L> {
    /// 새 해석기를 생성합니다.
    pub fn new(lookup: Arc<L>) -> Self {
        Self { lookup }
    }

    /// 정규화된 페이로드를 해석합니다.
    ///
    /// 자격 증명은 `ctx`로 명시적으로 전달됩니다.
    /// `structured` 데이터는 백엔드 필드를 덮어쓰지 않고 `scanned_data`에만 붙습니다.
    pub async fn resolve(&self, payload: &NormalizedPayload, ctx: &RequestContext) -> Resolution {
        let started = Instant::now();
        let result = self
            .lookup
            .scan_by_hash(&payload.canonical_id, ctx)
            .await;
        histogram!(m::QR_SCANNER_LOOKUP_DURATION_SECONDS).record(started.elapsed().as_secs_f64());

        let resolution = match result {
            Ok(response) => classify(response, payload),
            Err(e) => Resolution::Failed(e),
        };

        counter!(m::QR_SCANNER_LOOKUPS_TOTAL, m::LABEL_RESULT => resolution.as_str()).increment(1);
        match &resolution {
            Resolution::Resolved(entity) => info!(
                canonical_id = %payload.canonical_id,
                entity_type = %entity.entity_type,
                entity_id = %entity.entity_id,
                "entity resolved"
            ),
            Resolution::NotFound => debug!(
                canonical_id = %payload.canonical_id,
                "no entity matched scanned code"
            ),
            Resolution::Failed(e) => warn!(
                canonical_id = %payload.canonical_id,
                error = %e,
                "entity lookup failed"
            ),
        }

        resolution
    }
}

const SCANNED_DATA_KEY: &str = "scannedData";

/// 응답 본문을 분류합니다.
fn classify(response: ScanLookupResponse, payload: &NormalizedPayload) -> Resolution {
    let Some(data) = response.truthy_data() else {
        return Resolution::NotFound;
    };

    match serde_json::from_value::<ScanLookupData>(data.clone()) {
        Ok(mut data) => {
            // 로컬 구조화 페이로드가 있으면 scannedData 키는 그쪽이 차지
            if payload.structured.is_some() {
                data.extra.remove(SCANNED_DATA_KEY);
            }
            Resolution::Resolved(ResolvedEntity {
                entity_type: data.entity_type,
                entity_id: data.entity_id,
                entity_data: data.entity_data,
                traceability_data: data.traceability_data.filter(|v| !v.is_null()),
                scanned_data: payload.structured.clone(),
                extra: data.extra,
            })
        }
        Err(e) => Resolution::Failed(LookupError::Decode(e.to_string())),
    }
}
