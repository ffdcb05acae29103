use crate::application::service::{
    CheckoutPlanCommand, CreateOrderCommand, DuplicatePolicy, PublishOfferCommand,
    UpdateOrderCommand,
};
use crate::domain::error::DomainError;
use crate::domain::model::{
    Actor, CustomerId, DayOfWeek, DeliveryAddress, OfferId, PhoneNumber, PlanEdit,
    PlanSelection, PlannerState, PortionCount, WeekStart,
};
use crate::domain::service::WeekSelections;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;
use uuid::Uuid;

fn week_start(date: Option<NaiveDate>) -> Result<Option<WeekStart>, DomainError> {
    date.map(WeekStart::new).transpose()
}

/// 注文作成用のリクエストDTO
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub customer_id: Uuid,
    /// 英語またはロシア語の曜日名
    pub day: String,
    pub week_start: Option<NaiveDate>,
    pub portions: u32,
    pub address: String,
    pub phone: String,
    #[serde(default)]
    pub accept_partial: bool,
    #[serde(default)]
    pub on_duplicate: DuplicatePolicy,
}

impl CreateOrderRequest {
    /// 入力値を検証してコマンドに変換する
    pub fn into_command(self) -> Result<CreateOrderCommand, DomainError> {
        Ok(CreateOrderCommand {
            customer_id: CustomerId::from_uuid(self.customer_id),
            day: DayOfWeek::parse(&self.day)?,
            week_start: week_start(self.week_start)?,
            portions: PortionCount::new(self.portions)?,
            address: DeliveryAddress::new(&self.address)?,
            phone: PhoneNumber::new(&self.phone)?,
            accept_partial: self.accept_partial,
            on_duplicate: self.on_duplicate,
        })
    }
}

/// 注文変更用のリクエストDTO
#[derive(Debug, Deserialize)]
pub struct UpdateOrderRequest {
    pub actor: Actor,
    pub portions: Option<u32>,
    pub address: Option<String>,
}

impl UpdateOrderRequest {
    pub fn into_command(self) -> Result<(Actor, UpdateOrderCommand), DomainError> {
        let command = UpdateOrderCommand {
            portions: self.portions.map(PortionCount::new).transpose()?,
            address: self
                .address
                .as_deref()
                .map(DeliveryAddress::new)
                .transpose()?,
        };
        Ok((self.actor, command))
    }
}

/// 注文キャンセル用のリクエストDTO
#[derive(Debug, Deserialize)]
pub struct CancelOrderRequest {
    pub actor: Actor,
}

/// 見積もりの1明細
#[derive(Debug, Deserialize)]
pub struct SelectionRequest {
    pub offer_id: Uuid,
    pub day: String,
    pub portions: u32,
}

/// 見積もりの1週間分
#[derive(Debug, Deserialize)]
pub struct WeekSelectionsRequest {
    pub week_start: Option<NaiveDate>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub selections: Vec<SelectionRequest>,
}

fn default_enabled() -> bool {
    true
}

/// 見積もり用のリクエストDTO
#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    pub weeks: Vec<WeekSelectionsRequest>,
    pub promo_code: Option<String>,
}

impl QuoteRequest {
    /// 同じオファーが複数回指定された場合は最後の指定を使う
    pub fn into_weeks(self) -> Result<Vec<WeekSelections>, DomainError> {
        self.weeks
            .into_iter()
            .map(|week| {
                let mut selections = BTreeMap::new();
                for selection in week.selections {
                    selections.insert(
                        OfferId::from_uuid(selection.offer_id),
                        PlanSelection {
                            day: DayOfWeek::parse(&selection.day)?,
                            portions: PortionCount::new(selection.portions)?,
                        },
                    );
                }
                Ok(WeekSelections {
                    week_start: week_start(week.week_start)?,
                    enabled: week.enabled,
                    selections,
                })
            })
            .collect()
    }
}

/// 計画の見積もり用のリクエストDTO
#[derive(Debug, Deserialize)]
pub struct PlanQuoteRequest {
    pub state: PlannerState,
    pub promo_code: Option<String>,
}

/// 計画チェックアウト用のリクエストDTO
#[derive(Debug, Deserialize)]
pub struct CheckoutPlanRequest {
    pub customer_id: Uuid,
    pub state: PlannerState,
    pub address: String,
    pub phone: String,
    pub promo_code: Option<String>,
}

impl CheckoutPlanRequest {
    pub fn into_command(self) -> Result<CheckoutPlanCommand, DomainError> {
        Ok(CheckoutPlanCommand {
            customer_id: CustomerId::from_uuid(self.customer_id),
            state: self.state,
            address: DeliveryAddress::new(&self.address)?,
            phone: PhoneNumber::new(&self.phone)?,
            promo_code: self.promo_code,
        })
    }
}

/// 計画編集用のリクエストDTO
#[derive(Debug, Deserialize)]
pub struct PlanEditRequest {
    #[serde(default)]
    pub state: PlannerState,
    pub edits: Vec<PlanEdit>,
}

/// 受付窓口設定用のリクエストDTO
#[derive(Debug, Deserialize)]
pub struct SetOrderWindowRequest {
    pub enabled: bool,
    pub week_start: Option<NaiveDate>,
}

impl SetOrderWindowRequest {
    pub fn week_start(&self) -> Result<Option<WeekStart>, DomainError> {
        week_start(self.week_start)
    }
}

/// 受付上限変更用のリクエストDTO
/// nullは上限なし
#[derive(Debug, Deserialize)]
pub struct SetCapacityRequest {
    pub capacity_limit: Option<u32>,
}

/// オファー公開用のリクエストDTO
#[derive(Debug, Deserialize)]
pub struct PublishOfferRequest {
    pub week_start: NaiveDate,
    pub day: String,
    pub dishes: Vec<String>,
    /// 補助単位
    pub unit_price: i64,
    pub capacity_limit: Option<u32>,
}

impl PublishOfferRequest {
    pub fn into_command(self) -> Result<PublishOfferCommand, DomainError> {
        Ok(PublishOfferCommand {
            week_start: WeekStart::new(self.week_start)?,
            day: DayOfWeek::parse(&self.day)?,
            dishes: self.dishes,
            unit_price: self.unit_price,
            capacity_limit: self.capacity_limit,
        })
    }
}

/// 注文可否取得用のクエリパラメータ
#[derive(Debug, Deserialize)]
pub struct OrderabilityQueryParams {
    pub day: String,
    pub week_start: Option<NaiveDate>,
}

/// 重複注文取得用のクエリパラメータ
#[derive(Debug, Deserialize)]
pub struct ActiveOrderQueryParams {
    pub day: String,
    pub week_start: NaiveDate,
}

/// 週の注文一覧取得用のクエリパラメータ
#[derive(Debug, Deserialize)]
pub struct WeekOrdersQueryParams {
    pub status: Option<String>,
}
