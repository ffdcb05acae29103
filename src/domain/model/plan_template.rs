use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::domain::error::DomainError;
use crate::domain::event::{DomainEvent, PlanCheckedOut};
use crate::domain::model::{
    Currency, CustomerId, DeliveryAddress, MenuStatus, Money, OfferId, PhoneNumber,
    PlanSelection, PlannerState, Quote, QuoteLine, WeekStart,
};

/// 確定した計画の一意識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlanTemplateId(Uuid);

impl PlanTemplateId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl fmt::Display for PlanTemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for PlanTemplateId {
    fn default() -> Self {
        Self::new()
    }
}

/// 確定した計画の1週間
/// 選択内容と確定時点の見積もり明細を保持する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanTemplateWeek {
    pub index: usize,
    pub week_start: Option<WeekStart>,
    pub label: Option<String>,
    pub enabled: bool,
    pub menu_status: MenuStatus,
    pub subtotal: Money,
    pub selections: BTreeMap<OfferId, PlanSelection>,
    pub lines: Vec<QuoteLine>,
    pub warnings: Vec<String>,
}

impl PlanTemplateWeek {
    /// 週の受付ランチ数
    pub fn accepted_portions(&self) -> u32 {
        self.lines.iter().map(|line| line.accepted_portions).sum()
    }
}

/// 永続化層から読み出した計画の全項目
#[derive(Debug, Clone)]
pub struct PlanTemplateRecord {
    pub id: PlanTemplateId,
    pub customer_id: CustomerId,
    pub repeat: bool,
    pub address: DeliveryAddress,
    pub phone: PhoneNumber,
    pub promo_code: Option<String>,
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
    pub weeks: Vec<PlanTemplateWeek>,
    pub created_at: DateTime<Utc>,
}

/// PlanTemplate集約
///
/// 複数週の計画をチェックアウトした結果。金額は確定時点の見積もりで固定される。
/// 容量の予約は行わず、週ごとの注文は利用者が個別に作成する
#[derive(Debug, Clone)]
pub struct PlanTemplate {
    id: PlanTemplateId,
    customer_id: CustomerId,
    repeat: bool,
    address: DeliveryAddress,
    phone: PhoneNumber,
    promo_code: Option<String>,
    subtotal: Money,
    discount: Money,
    total: Money,
    weeks: Vec<PlanTemplateWeek>,
    created_at: DateTime<Utc>,
    domain_events: Vec<DomainEvent>,
}

impl PlanTemplate {
    /// 正規化済みの計画と、その計画から計算した見積もりで計画を確定する
    ///
    /// # Errors
    /// * `DomainError::Validation` - 受け付けられるランチが1件もない
    /// * `DomainError::InvariantViolation` - 計画と見積もりの週数が一致しない
    pub fn check_out(
        id: PlanTemplateId,
        customer_id: CustomerId,
        state: &PlannerState,
        quote: &Quote,
        address: DeliveryAddress,
        phone: PhoneNumber,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if state.weeks.len() != quote.weeks.len() {
            return Err(DomainError::InvariantViolation(format!(
                "plan has {} weeks but quote has {}",
                state.weeks.len(),
                quote.weeks.len()
            )));
        }
        if quote.lines().all(|line| line.accepted_portions == 0) {
            return Err(DomainError::validation(
                "selections",
                "受け付けられるランチがありません",
            ));
        }

        let weeks: Vec<PlanTemplateWeek> = state
            .weeks
            .iter()
            .zip(&quote.weeks)
            .enumerate()
            .map(|(index, (week, quoted))| PlanTemplateWeek {
                index,
                week_start: quoted.week_start,
                label: quoted.label.clone(),
                enabled: week.enabled,
                menu_status: quoted.menu_status,
                subtotal: quoted.subtotal,
                selections: week.selections.clone(),
                lines: quoted.lines.clone(),
                warnings: quoted.warnings.clone(),
            })
            .collect();

        // 適用されなかったコードは保存しない
        let promo_code = match &quote.promo_code_error {
            None => quote.promo_code.clone(),
            Some(_) => None,
        };

        let now = now.trunc_subsecs(6);
        let mut template = Self {
            id,
            customer_id,
            repeat: state.repeat,
            address,
            phone,
            promo_code,
            subtotal: quote.subtotal,
            discount: quote.discount,
            total: quote.total,
            weeks,
            created_at: now,
            domain_events: Vec::new(),
        };
        template
            .domain_events
            .push(DomainEvent::PlanCheckedOut(PlanCheckedOut {
                template_id: template.id,
                customer_id,
                weeks: template.billable_weeks(),
                portions: template.accepted_portions(),
                total: template.total,
                occurred_at: now,
            }));
        Ok(template)
    }

    /// データベースから取得したデータで計画を再構築
    pub fn reconstruct(record: PlanTemplateRecord) -> Result<Self, DomainError> {
        if record.weeks.is_empty() {
            return Err(DomainError::InvariantViolation(format!(
                "plan template {} has no weeks",
                record.id
            )));
        }
        if record.subtotal.saturating_sub(&record.discount)? != record.total {
            return Err(DomainError::InvariantViolation(format!(
                "plan template {} total does not match subtotal and discount",
                record.id
            )));
        }
        Ok(Self {
            id: record.id,
            customer_id: record.customer_id,
            repeat: record.repeat,
            address: record.address,
            phone: record.phone,
            promo_code: record.promo_code,
            subtotal: record.subtotal,
            discount: record.discount,
            total: record.total,
            weeks: record.weeks,
            created_at: record.created_at,
            domain_events: Vec::new(),
        })
    }

    pub fn id(&self) -> PlanTemplateId {
        self.id
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn repeat(&self) -> bool {
        self.repeat
    }

    pub fn address(&self) -> &DeliveryAddress {
        &self.address
    }

    pub fn phone(&self) -> &PhoneNumber {
        &self.phone
    }

    pub fn promo_code(&self) -> Option<&str> {
        self.promo_code.as_deref()
    }

    pub fn subtotal(&self) -> Money {
        self.subtotal
    }

    pub fn discount(&self) -> Money {
        self.discount
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn currency(&self) -> Currency {
        self.total.currency()
    }

    pub fn weeks(&self) -> &[PlanTemplateWeek] {
        &self.weeks
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// 受け付けられた明細がある有効な週の数
    pub fn billable_weeks(&self) -> usize {
        self.weeks
            .iter()
            .filter(|week| week.enabled && week.accepted_portions() > 0)
            .count()
    }

    /// 全週の受付ランチ数
    pub fn accepted_portions(&self) -> u32 {
        self.weeks
            .iter()
            .map(PlanTemplateWeek::accepted_portions)
            .sum()
    }

    /// 蓄積されたドメインイベントを取り出す
    pub fn take_domain_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.domain_events)
    }
}
