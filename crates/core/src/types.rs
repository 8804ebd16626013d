//! 도메인 타입: 스캔 세션, 정규화 결과, 해석된 엔티티
//!
//! QR 획득부터 엔티티 해석까지 모든 모듈이 공유하는 데이터 구조를 정의합니다.
//! 백엔드 응답의 wire 타입(`ScanLookupResponse`)도 여기에 둡니다.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 스캔 세션 상태
///
/// 초기 상태는 `Idle`, 종료 상태는 `Resolved`, `Failed`, `Cancelled`입니다.
///
/// ```text
/// Idle → AcquiringDevice → Scanning → Detected → Resolving → Resolved | Failed
///   (any non-terminal) → Cancelled
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    /// 시작 전
    #[default]
    Idle,
    /// 카메라 스트림 요청 중
    AcquiringDevice,
    /// 프레임 폴링 중
    Scanning,
    /// 페이로드 검출됨
    Detected,
    /// 백엔드 조회 중
    Resolving,
    /// 엔티티 해석 완료
    Resolved,
    /// 실패 (치명적 실패 또는 degraded 결과)
    Failed,
    /// 명시적 취소
    Cancelled,
}

impl ScanState {
    /// 종료 상태인지 여부
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Failed | Self::Cancelled)
    }

    /// `self → next` 전이가 허용되는지 검사합니다.
    ///
    /// 업로드 이미지는 `Idle → Detected`/`Idle → Failed`로,
    /// 수동 입력은 `Idle → Detected`로 바로 진입합니다.
    pub fn can_transition_to(self, next: ScanState) -> bool {
        use ScanState::*;

        if self.is_terminal() {
            return false;
        }
        if next == Cancelled {
            return true;
        }

        matches!(
            (self, next),
            (Idle, AcquiringDevice)
                | (Idle, Detected)
                | (Idle, Failed)
                | (AcquiringDevice, Scanning)
                | (AcquiringDevice, Failed)
                | (Scanning, Detected)
                | (Scanning, Failed)
                | (Detected, Resolving)
                | (Detected, Failed)
                | (Resolving, Resolved)
                | (Resolving, Failed)
        )
    }

    /// 로그/메트릭용 이름
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AcquiringDevice => "acquiring_device",
            Self::Scanning => "scanning",
            Self::Detected => "detected",
            Self::Resolving => "resolving",
            Self::Resolved => "resolved",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 페이로드 획득 경로
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanSource {
    /// 실시간 카메라 스트림
    Camera,
    /// 업로드된 정지 이미지
    UploadedImage,
    /// 사용자가 직접 입력한 문자열
    ManualEntry,
}

impl ScanSource {
    /// 로그/메트릭 레이블용 이름
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Camera => "camera",
            Self::UploadedImage => "uploaded_image",
            Self::ManualEntry => "manual_entry",
        }
    }
}

impl fmt::Display for ScanSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 스캔 세션 식별자 (UUID v4)
///
/// 소비자는 결과를 적용하기 전에 세션 ID를 비교하여 stale 결과를 걸러냅니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(uuid::Uuid);

impl SessionId {
    /// 새 세션 ID를 생성합니다.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// 내부 UUID
    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 디코더에 전달되는 프레임 (packed RGB8)
#[derive(Debug, Clone)]
pub struct Frame {
    /// 픽셀 데이터 (픽셀당 3바이트)
    pub data: Bytes,
    /// 너비 (픽셀)
    pub width: u32,
    /// 높이 (픽셀)
    pub height: u32,
}

impl Frame {
    /// RGB8 버퍼로 프레임을 생성합니다.
    pub fn rgb(data: impl Into<Bytes>, width: u32, height: u32) -> Self {
        Self {
            data: data.into(),
            width,
            height,
        }
    }

    /// 버퍼 길이가 `width * height * 3`과 일치하는지 여부
    pub fn is_well_formed(&self) -> bool {
        let expected = u64::from(self.width) * u64::from(self.height) * 3;
        u64::try_from(self.data.len()).is_ok_and(|len| len == expected)
    }
}

/// 정규화된 페이로드: 한 번 계산되면 변경되지 않습니다.
///
/// `canonical_id`는 정규화가 성공했다면 항상 비어있지 않습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedPayload {
    /// 백엔드 조회에 사용하는 식별자 (content hash 또는 opaque id)
    pub canonical_id: String,
    /// 원본이 JSON 객체였을 때만 존재
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured: Option<Map<String, Value>>,
}

/// 백엔드 엔티티 유형
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityType {
    /// 원재료 배치
    RawMaterialBatch,
    /// 완제품
    FinishedGood,
    /// 실험실 검사
    LabTest,
    /// 공급망 이벤트
    SupplyChainEvent,
    /// 알 수 없는 유형 (원본 문자열 보존)
    Unknown(String),
}

impl EntityType {
    /// 백엔드 문자열(`RAW_MATERIAL_BATCH` 등)을 파싱합니다.
    pub fn from_wire(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "RAW_MATERIAL_BATCH" => Self::RawMaterialBatch,
            "FINISHED_GOOD" => Self::FinishedGood,
            "LAB_TEST" => Self::LabTest,
            "SUPPLY_CHAIN_EVENT" => Self::SupplyChainEvent,
            _ => Self::Unknown(s.to_owned()),
        }
    }

    /// 백엔드 문자열 표현
    pub fn as_wire(&self) -> &str {
        match self {
            Self::RawMaterialBatch => "RAW_MATERIAL_BATCH",
            Self::FinishedGood => "FINISHED_GOOD",
            Self::LabTest => "LAB_TEST",
            Self::SupplyChainEvent => "SUPPLY_CHAIN_EVENT",
            Self::Unknown(s) => s,
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

impl Serialize for EntityType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_wire())
    }
}

impl<'de> Deserialize<'de> for EntityType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from_wire(&s))
    }
}

/// 해석된 엔티티: 백엔드 레코드 + 로컬에서 파싱한 스캔 데이터
///
/// 성공한 조회 이후에만 생성되며 이후 변경되지 않습니다.
/// `scanned_data`는 백엔드 필드를 덮어쓰지 않고 자기 키 아래에만 추가됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedEntity {
    /// 엔티티 유형
    pub entity_type: EntityType,
    /// 엔티티 ID
    pub entity_id: String,
    /// 백엔드 도메인 레코드 (유형별로 형태가 다름)
    pub entity_data: Value,
    /// 상류 추적 체인 (원산지 농가, 구성 등)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traceability_data: Option<Value>,
    /// QR에 포함된 구조화 페이로드
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scanned_data: Option<Map<String, Value>>,
    /// 위 필드 외에 응답 `data`에 있던 최상위 키 (그대로 보존)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `GET /api/qr-codes/scan/{hash}` 응답 본문
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanLookupResponse {
    /// 백엔드 처리 성공 여부
    #[serde(default)]
    pub success: bool,
    /// 매칭된 엔티티 (없거나 falsy일 수 있음)
    #[serde(default)]
    pub data: Option<Value>,
}

impl ScanLookupResponse {
    /// `success && data`가 truthy인 경우에만 데이터를 반환합니다.
    ///
    /// null, false, 0, 빈 문자열은 falsy로 취급합니다.
    pub fn truthy_data(&self) -> Option<&Value> {
        if !self.success {
            return None;
        }
        self.data.as_ref().filter(|v| is_truthy(v))
    }
}

/// 응답의 `data` 필드 형태
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanLookupData {
    /// 엔티티 유형
    pub entity_type: EntityType,
    /// 엔티티 ID
    #[serde(deserialize_with = "string_or_number")]
    pub entity_id: String,
    /// 도메인 레코드
    #[serde(default)]
    pub entity_data: Value,
    /// 추적 체인
    #[serde(default)]
    pub traceability_data: Option<Value>,
    /// 나머지 최상위 키
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn string_or_number<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

/// JSON 값의 truthiness
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// 실패 분류
///
/// `DeviceUnavailable`, `NoCodeInImage`, `EmptyPayload`, `InvalidImage`는 세션을 중단시킵니다.
/// `NoEntityFound`, `LookupError`는 식별자 fallback으로 degraded 처리됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// 카메라 권한 거부 또는 장치 없음
    DeviceUnavailable,
    /// 단일 이미지에서 코드를 찾지 못함
    NoCodeInImage,
    /// 정규화 결과 사용할 수 있는 식별자가 없음
    EmptyPayload,
    /// 백엔드에 매칭되는 엔티티 없음
    NoEntityFound,
    /// 네트워크/HTTP 실패
    LookupError,
    /// 업로드 이미지를 읽을 수 없음
    InvalidImage,
}

impl FailureKind {
    /// 세션을 중단시키는 실패인지 여부
    pub fn is_fatal(self) -> bool {
        !matches!(self, Self::NoEntityFound | Self::LookupError)
    }

    /// 사용자에게 보여줄 짧은 메시지
    pub fn user_message(self) -> &'static str {
        match self {
            Self::DeviceUnavailable => {
                "Camera is unavailable. Check camera permissions and try again."
            }
            Self::NoCodeInImage => "No QR code found in the image.",
            Self::EmptyPayload => "The QR code does not contain a usable identifier.",
            Self::NoEntityFound => "No matching record was found for this code.",
            Self::LookupError => "Could not reach the server to look up this code.",
            Self::InvalidImage => "The uploaded file could not be read as an image.",
        }
    }

    /// 로그/메트릭 레이블용 이름
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DeviceUnavailable => "device_unavailable",
            Self::NoCodeInImage => "no_code_in_image",
            Self::EmptyPayload => "empty_payload",
            Self::NoEntityFound => "no_entity_found",
            Self::LookupError => "lookup_error",
            Self::InvalidImage => "invalid_image",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 요청할 카메라 방향
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraFacing {
    /// 후면 카메라 (기본값)
    #[default]
    Environment,
    /// 전면 카메라
    User,
}

impl CameraFacing {
    /// 느슨한 문자열 파싱 (`"rear"`, `"back"`도 허용)
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "environment" | "rear" | "back" => Some(Self::Environment),
            "user" | "front" => Some(Self::User),
            _ => None,
        }
    }

    /// 설정 파일 표현
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Environment => "environment",
            Self::User => "user",
        }
    }
}
