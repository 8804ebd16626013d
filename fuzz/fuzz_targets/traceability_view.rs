#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use serde_json::{Map, Value, json};

use tracelink_core::types::{EntityType, ResolvedEntity};
use tracelink_qr_scanner::TraceabilityView;

/// 퍼저용 엔티티 입력
#[derive(Arbitrary, Debug)]
struct FuzzEntity {
    entity_type: FuzzEntityType,
    fields: Vec<(String, FuzzValue)>,
    farmers: Vec<String>,
    composition: Vec<FuzzValue>,
}

#[derive(Arbitrary, Debug)]
enum FuzzEntityType {
    RawMaterialBatch,
    FinishedGood,
    LabTest,
    SupplyChainEvent,
    Other(String),
}

#[derive(Arbitrary, Debug)]
enum FuzzValue {
    Null,
    Bool(bool),
    Number(i64),
    Text(String),
    Nested(String, String),
}

impl FuzzValue {
    fn to_json(&self) -> Value {
        match self {
            FuzzValue::Null => Value::Null,
            FuzzValue::Bool(b) => json!(b),
            FuzzValue::Number(n) => json!(n),
            FuzzValue::Text(s) => json!(s),
            FuzzValue::Nested(k, v) => {
                let mut obj = Map::new();
                obj.insert(k.clone(), json!(v));
                Value::Object(obj)
            }
        }
    }
}

fuzz_target!(|input: FuzzEntity| {
    let wire = match &input.entity_type {
        FuzzEntityType::RawMaterialBatch => "RAW_MATERIAL_BATCH".to_owned(),
        FuzzEntityType::FinishedGood => "FINISHED_GOOD".to_owned(),
        FuzzEntityType::LabTest => "LAB_TEST".to_owned(),
        FuzzEntityType::SupplyChainEvent => "SUPPLY_CHAIN_EVENT".to_owned(),
        FuzzEntityType::Other(name) => name.clone(),
    };

    let data: Map<String, Value> = input
        .fields
        .iter()
        .take(64)
        .map(|(k, v)| (k.clone(), v.to_json()))
        .collect();
    let farmers: Vec<Value> = input.farmers.iter().take(32).map(|n| json!({ "name": n })).collect();
    let composition: Vec<Value> = input.composition.iter().take(32).map(FuzzValue::to_json).collect();

    let entity = ResolvedEntity {
        entity_type: EntityType::from_wire(&wire),
        entity_id: "fuzz".to_owned(),
        entity_data: Value::Object(data),
        traceability_data: Some(json!({ "farmers": farmers, "composition": composition })),
        scanned_data: None,
        extra: Default::default(),
    };

    let view = TraceabilityView::from_entity(&entity);

    // 농가 이름은 중복 없이
    let mut seen = std::collections::HashSet::new();
    assert!(view.source_farmers.iter().all(|name| seen.insert(name)));
});
