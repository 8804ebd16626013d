//! 엔티티 타입별 추적 정보 뷰
//!
//! 고정된 타입 집합 {RAW_MATERIAL_BATCH, FINISHED_GOOD, LAB_TEST, SUPPLY_CHAIN_EVENT, unknown}에
//! 대해 제목, 레이블 필드, 상류 체인(원료 농가, 구성 원료)을 만듭니다.

use serde::Serialize;
use serde_json::{Map, Value};

use tracelink_core::types::{EntityType, ResolvedEntity};

use super::autofill::text_field;

/// 타입별 표시 필드 (entityData 키, 레이블)
const RAW_MATERIAL_FIELDS: &[(&str, &str)] = &[
    ("species", "Species"),
    ("quantity", "Quantity"),
    ("unit", "Unit"),
    ("harvestDate", "Harvest date"),
    ("status", "Status"),
];

const FINISHED_GOOD_FIELDS: &[(&str, &str)] = &[
    ("productName", "Product"),
    ("batchNumber", "Batch number"),
    ("manufactureDate", "Manufactured"),
    ("expiryDate", "Expires"),
];

const LAB_TEST_FIELDS: &[(&str, &str)] = &[
    ("testType", "Test type"),
    ("result", "Result"),
    ("testDate", "Tested"),
    ("labName", "Laboratory"),
];

const SUPPLY_CHAIN_EVENT_FIELDS: &[(&str, &str)] = &[
    ("eventType", "Event"),
    ("fromLocation", "From"),
    ("toLocation", "To"),
    ("timestamp", "Timestamp"),
];

/// 추적 정보 모달에 표시할 뷰
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceabilityView {
    /// 엔티티 타입 (wire 이름)
    pub entity_type: String,
    /// 엔티티 ID
    pub entity_id: String,
    /// 제목
    pub title: String,
    /// (레이블, 값) 목록
    pub fields: Vec<(String, String)>,
    /// 원료를 공급한 농가
    pub source_farmers: Vec<String>,
    /// 구성 원료 또는 상위 엔티티
    pub composition: Vec<String>,
}

impl TraceabilityView {
    /// 해석된 엔티티에서 뷰를 만듭니다.
    pub fn from_entity(entity: &ResolvedEntity) -> Self {
        let empty = Map::new();
        let data = entity.entity_data.as_object().unwrap_or(&empty);
        let trace = entity
            .traceability_data
            .as_ref()
            .and_then(Value::as_object)
            .unwrap_or(&empty);

        let (title, fields) = match &entity.entity_type {
            EntityType::RawMaterialBatch => ("Raw material batch".to_owned(), labelled(data, RAW_MATERIAL_FIELDS)),
            EntityType::FinishedGood => ("Finished good".to_owned(), labelled(data, FINISHED_GOOD_FIELDS)),
            EntityType::LabTest => ("Lab test".to_owned(), labelled(data, LAB_TEST_FIELDS)),
            EntityType::SupplyChainEvent => {
                ("Supply chain event".to_owned(), labelled(data, SUPPLY_CHAIN_EVENT_FIELDS))
            }
            EntityType::Unknown(name) => (format!("Entity ({name})"), scalar_fields(data)),
        };

        Self {
            entity_type: entity.entity_type.as_wire().to_owned(),
            entity_id: entity.entity_id.clone(),
            title,
            fields,
            source_farmers: source_farmers(trace, data),
            composition: composition(trace),
        }
    }

    /// 레이블로 필드 값을 조회합니다.
    pub fn field(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }
}

fn labelled(data: &Map<String, Value>, table: &[(&str, &str)]) -> Vec<(String, String)> {
    table.iter()
        .filter_map(|(key, label)| text_field(data, key).map(|v| ((*label).to_owned(), v)))
        .collect()
}

/// 알 수 없는 타입: 최상위 스칼라 필드를 키 순으로
fn scalar_fields(data: &Map<String, Value>) -> Vec<(String, String)> {
    let mut fields: Vec<(String, String)> = data
        .keys()
        .filter_map(|key| text_field(data, key).map(|v| (key.clone(), v)))
        .collect();
    fields.sort();
    fields
}

/// `farmers[].name` 또는 `collectionEvents[].farmerName`, 중복 제거
fn source_farmers(trace: &Map<String, Value>, data: &Map<String, Value>) -> Vec<String> {
    let mut names = Vec::new();
    for obj in [trace, data] {
        names.extend(names_in(obj, "farmers", &["name", "farmerName"]));
        names.extend(names_in(obj, "collectionEvents", &["farmerName"]));
    }
    let mut seen = std::collections::HashSet::new();
    names.retain(|name| seen.insert(name.clone()));
    names
}

/// `composition[]` 또는 `rawMaterials[]`의 표시 이름
fn composition(trace: &Map<String, Value>) -> Vec<String> {
    ["composition", "rawMaterials"]
        .iter()
        .flat_map(|key| names_in(trace, key, &["species", "name", "entityId"]))
        .collect()
}

fn names_in(obj: &Map<String, Value>, array_key: &str, name_keys: &[&str]) -> Vec<String> {
    let Some(items) = obj.get(array_key).and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::Object(o) => name_keys.iter().find_map(|k| text_field(o, k)),
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            _ => None,
        })
        .collect()
}
