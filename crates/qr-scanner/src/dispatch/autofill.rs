//! 폼 자동 입력 프로필
//!
//! 각 프로필은 이름 있는 필드마다 후보 키 목록을 가지며, 첫 번째로 비어 있지 않은 값이 채택됩니다.
//! 후보마다 백엔드 `entityData`를 먼저 보고, 그다음 QR의 구조화 데이터를 봅니다.
//! 해석에 실패한 세션(degraded)은 QR 구조화 데이터만 사용합니다.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::pipeline::{ScanOutcome, ScanReport};

/// 제조사명 후보 키 (우선순위 순). 마지막 단계는 첫 수집 이벤트의 농가명입니다.
const MANUFACTURER_NAME_KEYS: [&str; 6] = [
    "manufacturer",
    "manufacturerName",
    "company",
    "companyName",
    "organization",
    "organizationName",
];

const MANUFACTURER_ID_KEYS: [&str; 3] = ["manufacturerId", "entityId", "id"];

const RECIPIENT_ID_KEYS: [&str; 3] = ["entityId", "id", "recipientId"];
const RECIPIENT_NAME_KEYS: [&str; 4] = ["recipientName", "name", "organizationName", "companyName"];
const RECIPIENT_TYPE_KEYS: [&str; 3] = ["recipientType", "type", "role"];
const LOCATION_KEYS: [&str; 3] = ["location", "address", "city"];

/// 자동 입력 대상 폼
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AutofillProfile {
    /// 출하 수령자 폼
    ShipmentRecipient,
    /// 실험실 제조사 폼
    LabManufacturer,
}

/// 추출된 필드 (폼 필드 이름, 값) 목록. 값을 찾지 못한 필드는 생략됩니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AutofillFields {
    /// 대상 프로필
    #[serde(skip)]
    pub profile: Option<AutofillProfile>,
    /// 순서가 보존된 필드 목록
    pub fields: Vec<(String, String)>,
}

impl AutofillFields {
    /// 필드 값을 조회합니다.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    /// 채워진 필드가 없는지 여부
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn push(&mut self, name: &str, value: Option<String>) {
        if let Some(value) = value {
            self.fields.push((name.to_owned(), value));
        }
    }
}

impl AutofillProfile {
    /// 폼 필드 이름 목록
    pub fn field_names(self) -> &'static [&'static str] {
        match self {
            Self::ShipmentRecipient => &["recipient_id", "recipient_name", "recipient_type", "location"],
            Self::LabManufacturer => &["manufacturer_id", "manufacturer_name"],
        }
    }

    /// 보고서에서 필드를 추출합니다.
    pub fn extract(self, report: &ScanReport) -> AutofillFields {
        let sources = Sources::from_report(report);
        let mut out = AutofillFields {
            profile: Some(self),
            fields: Vec::new(),
        };

        match self {
            Self::ShipmentRecipient => {
                out.push(
                    "recipient_id",
                    sources.first(&RECIPIENT_ID_KEYS).or_else(|| report.display_id.clone()),
                );
                out.push("recipient_name", sources.first(&RECIPIENT_NAME_KEYS));
                out.push("recipient_type", sources.first(&RECIPIENT_TYPE_KEYS));
                out.push("location", sources.first(&LOCATION_KEYS));
            }
            Self::LabManufacturer => {
                out.push(
                    "manufacturer_id",
                    sources.first(&MANUFACTURER_ID_KEYS).or_else(|| report.display_id.clone()),
                );
                out.push("manufacturer_name", manufacturer_name(&sources));
            }
        }
        out
    }
}

/// 필드를 찾을 객체 목록 (우선순위 순)
struct Sources<'a> {
    objects: Vec<&'a Map<String, Value>>,
}

impl<'a> Sources<'a> {
    fn from_report(report: &'a ScanReport) -> Self {
        let mut objects = Vec::new();
        match &report.outcome {
            ScanOutcome::Resolved(entity) => {
                if let Some(data) = entity.entity_data.as_object() {
                    objects.push(data);
                }
                if let Some(scanned) = &entity.scanned_data {
                    objects.push(scanned);
                }
            }
            _ => {
                if let Some(structured) = report.normalized.as_ref().and_then(|n| n.structured.as_ref()) {
                    objects.push(structured);
                }
            }
        }
        Self { objects }
    }

    /// 후보 키 순서대로, 키마다 모든 객체를 확인합니다.
    fn first(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .find_map(|key| self.objects.iter().find_map(|obj| text_field(obj, key)))
    }
}

/// 제조사명: 명시 필드 → 회사/기관 별칭 → 첫 수집 이벤트의 농가명
fn manufacturer_name(sources: &Sources<'_>) -> Option<String> {
    sources.first(&MANUFACTURER_NAME_KEYS).or_else(|| {
        sources.objects.iter().find_map(|obj| {
            let first_event = obj.get("collectionEvents")?.as_array()?.first()?.as_object()?;
            text_field(first_event, "farmerName")
        })
    })
}

/// 비어 있지 않은 문자열 또는 숫자/불리언의 텍스트 표현
pub(crate) fn text_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
