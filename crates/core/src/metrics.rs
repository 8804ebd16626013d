//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::histogram!()`
//! 매크로를 호출합니다. 레코더가 설치되지 않았다면 호출은 no-op입니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `tracelink_`
//! - 모듈명: `qr_scanner_`
//! - 접미어: `_total` (counter), `_seconds` (histogram)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(tracelink_core::metrics::QR_SCANNER_CODES_DETECTED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 획득 경로 레이블 키 (camera, uploaded_image, manual_entry)
pub const LABEL_SOURCE: &str = "source";

/// 결과 레이블 키 (resolved, degraded, failed, cancelled / found, not_found, error)
pub const LABEL_RESULT: &str = "result";

/// 실패 분류 레이블 키
pub const LABEL_KIND: &str = "kind";

// ─── QR Scanner 메트릭 ──────────────────────────────────────────────

/// QR Scanner: 프레임 디코드 시도 수 (counter)
pub const QR_SCANNER_DECODE_ATTEMPTS_TOTAL: &str = "tracelink_qr_scanner_decode_attempts_total";

/// QR Scanner: 검출된 코드 수 (counter, label: source)
pub const QR_SCANNER_CODES_DETECTED_TOTAL: &str = "tracelink_qr_scanner_codes_detected_total";

/// QR Scanner: 시작된 세션 수 (counter, label: source)
pub const QR_SCANNER_SESSIONS_STARTED_TOTAL: &str = "tracelink_qr_scanner_sessions_started_total";

/// QR Scanner: 종료된 세션 수 (counter, label: result)
pub const QR_SCANNER_SESSIONS_FINISHED_TOTAL: &str =
    "tracelink_qr_scanner_sessions_finished_total";

/// QR Scanner: 백엔드 조회 수 (counter, label: result)
pub const QR_SCANNER_LOOKUPS_TOTAL: &str = "tracelink_qr_scanner_lookups_total";

/// QR Scanner: 정규화 실패 수 (counter)
pub const QR_SCANNER_NORMALIZE_FAILURES_TOTAL: &str =
    "tracelink_qr_scanner_normalize_failures_total";

/// QR Scanner: 백엔드 조회 지연 시간 (histogram, 초)
pub const QR_SCANNER_LOOKUP_DURATION_SECONDS: &str =
    "tracelink_qr_scanner_lookup_duration_seconds";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 프로세스 시작 시 한 번 호출합니다. 전역 레코더가 없으면 아무 일도 하지 않습니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_histogram};

    describe_counter!(
        QR_SCANNER_DECODE_ATTEMPTS_TOTAL,
        "Total number of camera frames handed to the QR decoder"
    );
    describe_counter!(
        QR_SCANNER_CODES_DETECTED_TOTAL,
        "Total number of QR payloads detected, by source"
    );
    describe_counter!(
        QR_SCANNER_SESSIONS_STARTED_TOTAL,
        "Total number of scan sessions started, by source"
    );
    describe_counter!(
        QR_SCANNER_SESSIONS_FINISHED_TOTAL,
        "Total number of scan sessions finished, by result"
    );
    describe_counter!(
        QR_SCANNER_LOOKUPS_TOTAL,
        "Total number of backend scan lookups, by result"
    );
    describe_counter!(
        QR_SCANNER_NORMALIZE_FAILURES_TOTAL,
        "Total number of payloads that normalized to an empty identifier"
    );
    describe_histogram!(
        QR_SCANNER_LOOKUP_DURATION_SECONDS,
        "Backend scan lookup latency in seconds"
    );
}
