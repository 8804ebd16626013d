//! 페이로드 정규화: 원본 문자열에서 조회용 식별자 추출
//!
//! 모든 획득 경로(카메라, 업로드, 수동 입력)가 이 모듈 하나를 사용합니다.
//!
//! # 알고리즘 (먼저 일치하는 규칙 적용)
//!
//! 1. JSON 객체로 파싱되면 `structured`에 보관하고
//!    `qrHash` → `entityId` 순으로 식별자를 찾습니다. 없으면 2번으로.
//! 2. `/`가 있으면 마지막 `/` 뒤의 부분 문자열을 사용합니다 (딥 링크).
//!    없으면 앞뒤 공백을 제거한 원본을 사용합니다.
//! 3. 결과가 비어 있으면 `EmptyPayload`.

use metrics::counter;
use serde_json::{Map, Value};
use tracing::debug;

use tracelink_core::metrics as m;
use tracelink_core::types::NormalizedPayload;

use crate::error::QrScannerError;

/// 조회 키 후보 필드 (우선순위 순)
const CANONICAL_KEYS: [&str; 2] = ["qrHash", "entityId"];

/// 폼 입력용 표시 ID 후보 필드 (우선순위 순)
const DISPLAY_ID_KEYS: [&str; 3] = ["entityId", "id", "recipientId"];

/// 페이로드 정규화기
///
/// 상태가 없으며 모든 획득 경로가 공유합니다.
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadNormalizer;

impl PayloadNormalizer {
    /// 원본 페이로드를 정규화합니다.
    ///
    /// 입력을 변경하지 않으며 같은 입력에는 항상 같은 결과를 반환합니다.
    ///
    /// # Errors
    ///
    /// 식별자가 비어 있으면 `QrScannerError::EmptyPayload`
    pub fn normalize(raw: &str) -> Result<NormalizedPayload, QrScannerError> {
        let structured = parse_object(raw);

        let canonical_id = structured
            .as_ref()
            .and_then(|obj| first_text_field(obj, &CANONICAL_KEYS))
            .unwrap_or_else(|| fallback_id(raw).to_owned());

        if canonical_id.is_empty() {
            counter!(m::QR_SCANNER_NORMALIZE_FAILURES_TOTAL).increment(1);
            debug!(len = raw.len(), "payload normalized to empty identifier");
            return Err(QrScannerError::EmptyPayload);
        }

        Ok(NormalizedPayload {
            canonical_id,
            structured,
        })
    }

    /// 폼 필드에 넣을 표시 ID를 계산합니다.
    ///
    /// `structured`가 있으면 `entityId` → `id` → `recipientId` 순으로 찾고,
    /// 없으면 공백을 제거한 원본 문자열을 반환합니다.
    /// 조회에는 항상 `canonical_id`를 사용하며 이 값은 표시 전용입니다.
    pub fn best_display_id(raw: &str, structured: Option<&Map<String, Value>>) -> String {
        structured
            .and_then(|obj| first_text_field(obj, &DISPLAY_ID_KEYS))
            .unwrap_or_else(|| raw.trim().to_owned())
    }
}

/// JSON 객체일 때만 파싱 결과를 반환합니다.
fn parse_object(raw: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(obj)) => Some(obj),
        _ => None,
    }
}

/// JSON이 아니거나 키가 없는 경우의 식별자
///
/// `/`가 있으면 마지막 세그먼트를 공백 제거 없이 그대로 사용합니다.
fn fallback_id(raw: &str) -> &str {
    match raw.rfind('/') {
        Some(idx) => &raw[idx + 1..],
        None => raw.trim(),
    }
}

/// 후보 키 중 비어 있지 않은 첫 텍스트 값을 찾습니다.
///
/// 숫자는 텍스트 표현으로 받아들이고, 그 밖의 타입은 건너뜁니다.
fn first_text_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match obj.get(*key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}
