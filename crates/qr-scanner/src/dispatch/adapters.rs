//! 기본 제공 소비자
//!
//! 각 어댑터는 마지막으로 받은 값을 보관하며, UI 계층은 getter로 읽어 폼에 반영합니다.

use std::sync::{Mutex, PoisonError};

use tracing::debug;

use super::{AutofillFields, AutofillProfile, Delivery, Interest, ScanConsumer, TraceabilityView};
use crate::pipeline::ScanFailure;

/// 마지막 전달값 보관소
#[derive(Debug, Default)]
struct Slot<T> {
    value: Mutex<Option<T>>,
    notice: Mutex<Option<ScanFailure>>,
}

impl<T: Clone> Slot<T> {
    fn set(&self, value: T) {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = Some(value);
        *self.notice.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn set_notice(&self, failure: ScanFailure) {
        *self.notice.lock().unwrap_or_else(PoisonError::into_inner) = Some(failure);
    }

    fn get(&self) -> Option<T> {
        self.value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn notice(&self) -> Option<ScanFailure> {
        self.notice
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// 재고 화면의 엔티티 ID 입력 필드
///
/// 해석 실패 시에도 fallback ID를 받습니다. 치명적 실패에서는 기존 값을 유지합니다.
#[derive(Debug, Default)]
pub struct EntityIdField {
    slot: Slot<String>,
}

impl EntityIdField {
    /// 빈 필드
    pub fn new() -> Self {
        Self::default()
    }

    /// 현재 값
    pub fn value(&self) -> Option<String> {
        self.slot.get()
    }

    /// 마지막 실패 메시지
    pub fn notice(&self) -> Option<ScanFailure> {
        self.slot.notice()
    }
}

impl ScanConsumer for EntityIdField {
    fn name(&self) -> &str {
        "entity-id-field"
    }

    fn interest(&self) -> Interest {
        Interest::Identifier
    }

    fn deliver(&self, delivery: Delivery) {
        match delivery {
            Delivery::Identifier(id) => self.slot.set(id),
            Delivery::Unavailable(failure) => self.slot.set_notice(failure),
            other => debug!(consumer = self.name(), delivery = ?other, "unexpected delivery ignored"),
        }
    }
}

/// 폼 자동 입력 어댑터 공통 구현
#[derive(Debug)]
struct FormSlot {
    profile: AutofillProfile,
    slot: Slot<AutofillFields>,
}

impl FormSlot {
    fn new(profile: AutofillProfile) -> Self {
        Self {
            profile,
            slot: Slot::default(),
        }
    }

    fn deliver(&self, name: &str, delivery: Delivery) {
        match delivery {
            Delivery::Fields(fields) => self.slot.set(fields),
            Delivery::Unavailable(failure) => self.slot.set_notice(failure),
            other => debug!(consumer = name, delivery = ?other, "unexpected delivery ignored"),
        }
    }

    fn field(&self, name: &str) -> Option<String> {
        self.slot.get()?.get(name).map(str::to_owned)
    }
}

/// 출하 수령자 폼
#[derive(Debug)]
pub struct RecipientForm {
    inner: FormSlot,
}

impl Default for RecipientForm {
    fn default() -> Self {
        Self::new()
    }
}

impl RecipientForm {
    /// 빈 폼
    pub fn new() -> Self {
        Self {
            inner: FormSlot::new(AutofillProfile::ShipmentRecipient),
        }
    }

    /// 수령자 ID
    pub fn recipient_id(&self) -> Option<String> {
        self.inner.field("recipient_id")
    }

    /// 수령자 이름
    pub fn recipient_name(&self) -> Option<String> {
        self.inner.field("recipient_name")
    }

    /// 수령자 유형
    pub fn recipient_type(&self) -> Option<String> {
        self.inner.field("recipient_type")
    }

    /// 위치
    pub fn location(&self) -> Option<String> {
        self.inner.field("location")
    }

    /// 채워진 전체 필드
    pub fn fields(&self) -> Option<AutofillFields> {
        self.inner.slot.get()
    }

    /// 마지막 실패 메시지
    pub fn notice(&self) -> Option<ScanFailure> {
        self.inner.slot.notice()
    }
}

impl ScanConsumer for RecipientForm {
    fn name(&self) -> &str {
        "recipient-form"
    }

    fn interest(&self) -> Interest {
        Interest::StructuredFields(self.inner.profile)
    }

    fn deliver(&self, delivery: Delivery) {
        self.inner.deliver(self.name(), delivery);
    }
}

/// 실험실 제조사 폼
#[derive(Debug)]
pub struct ManufacturerForm {
    inner: FormSlot,
}

impl Default for ManufacturerForm {
    fn default() -> Self {
        Self::new()
    }
}

impl ManufacturerForm {
    /// 빈 폼
    pub fn new() -> Self {
        Self {
            inner: FormSlot::new(AutofillProfile::LabManufacturer),
        }
    }

    /// 제조사 ID
    pub fn manufacturer_id(&self) -> Option<String> {
        self.inner.field("manufacturer_id")
    }

    /// 제조사명
    pub fn manufacturer_name(&self) -> Option<String> {
        self.inner.field("manufacturer_name")
    }

    /// 채워진 전체 필드
    pub fn fields(&self) -> Option<AutofillFields> {
        self.inner.slot.get()
    }

    /// 마지막 실패 메시지
    pub fn notice(&self) -> Option<ScanFailure> {
        self.inner.slot.notice()
    }
}

impl ScanConsumer for ManufacturerForm {
    fn name(&self) -> &str {
        "manufacturer-form"
    }

    fn interest(&self) -> Interest {
        Interest::StructuredFields(self.inner.profile)
    }

    fn deliver(&self, delivery: Delivery) {
        self.inner.deliver(self.name(), delivery);
    }
}

/// 추적 정보 모달
///
/// 치명적 실패나 degraded 결과에서는 이전 뷰를 지우고 메시지만 보관합니다.
#[derive(Debug, Default)]
pub struct TraceabilityPanel {
    view: Mutex<Option<TraceabilityView>>,
    notice: Mutex<Option<ScanFailure>>,
}

impl TraceabilityPanel {
    /// 빈 패널
    pub fn new() -> Self {
        Self::default()
    }

    /// 표시 중인 뷰
    pub fn view(&self) -> Option<TraceabilityView> {
        self.view
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 마지막 실패 메시지
    pub fn notice(&self) -> Option<ScanFailure> {
        self.notice
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ScanConsumer for TraceabilityPanel {
    fn name(&self) -> &str {
        "traceability-panel"
    }

    fn interest(&self) -> Interest {
        Interest::FullDetail
    }

    fn deliver(&self, delivery: Delivery) {
        let mut view = self.view.lock().unwrap_or_else(PoisonError::into_inner);
        let mut notice = self.notice.lock().unwrap_or_else(PoisonError::into_inner);
        match delivery {
            Delivery::Detail(detail) => {
                *view = Some(detail);
                *notice = None;
            }
            Delivery::Unavailable(failure) => {
                *view = None;
                *notice = Some(failure);
            }
            other => debug!(consumer = "traceability-panel", delivery = ?other, "unexpected delivery ignored"),
        }
    }
}
