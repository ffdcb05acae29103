use crate::application::service::{CancelOrderOutcome, CreateOrderOutcome};
use crate::domain::model::{
    DayOffer, Money, OfferId, Order, OrderWindow, PlanSelection, PlanTemplate, PlanTemplateWeek,
    QuoteLine,
};
use chrono::SecondsFormat;
use serde::Serialize;
use std::collections::BTreeMap;

/// 金額のレスポンスDTO
#[derive(Debug, Serialize)]
pub struct MoneyResponse {
    /// 補助単位
    pub amount: i64,
    pub currency: String,
}

impl MoneyResponse {
    pub fn from_money(money: Money) -> Self {
        Self {
            amount: money.amount(),
            currency: money.currency().code().to_string(),
        }
    }
}

/// 注文用のレスポンスDTO
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub order_id: String,
    pub customer_id: String,
    pub offer_id: String,
    pub day: String,
    pub week_start: String,
    pub portions: u32,
    pub status: String,
    pub address: String,
    pub phone: String,
    pub menu: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
    pub cancelled_at: Option<String>,
}

impl OrderResponse {
    /// ドメインオブジェクトからOrderResponseを作成
    pub fn from_order(order: &Order) -> Self {
        Self {
            order_id: order.id().to_string(),
            customer_id: order.customer_id().to_string(),
            offer_id: order.offer_id().to_string(),
            day: order.day().to_string(),
            week_start: order.week_start().to_string(),
            portions: order.portions().get(),
            status: order.status().to_string(),
            address: order.address().as_str().to_string(),
            phone: order.phone().as_str().to_string(),
            menu: order.menu_snapshot().to_vec(),
            created_at: order.created_at().to_rfc3339_opts(SecondsFormat::Micros, true),
            updated_at: order.updated_at().to_rfc3339_opts(SecondsFormat::Micros, true),
            cancelled_at: order
                .cancelled_at()
                .map(|at| at.to_rfc3339_opts(SecondsFormat::Micros, true)),
        }
    }
}

/// 注文作成結果のレスポンスDTO
#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    pub order: OrderResponse,
    pub requested_portions: u32,
    pub accepted_portions: u32,
    pub merged: bool,
}

impl CreateOrderResponse {
    pub fn from_outcome(outcome: &CreateOrderOutcome) -> Self {
        Self {
            order: OrderResponse::from_order(&outcome.order),
            requested_portions: outcome.requested_portions,
            accepted_portions: outcome.accepted_portions,
            merged: outcome.merged,
        }
    }
}

/// 注文キャンセル結果のレスポンスDTO
#[derive(Debug, Serialize)]
pub struct CancelOrderResponse {
    pub order: OrderResponse,
    pub already_cancelled: bool,
}

impl CancelOrderResponse {
    pub fn from_outcome(outcome: &CancelOrderOutcome) -> Self {
        Self {
            order: OrderResponse::from_order(&outcome.order),
            already_cancelled: outcome.already_cancelled,
        }
    }
}

/// 日別オファー用のレスポンスDTO
#[derive(Debug, Serialize)]
pub struct OfferResponse {
    pub offer_id: String,
    pub week_start: String,
    pub day: String,
    pub dishes: Vec<String>,
    pub unit_price: MoneyResponse,
    pub capacity_limit: Option<u32>,
    pub portions_reserved: u32,
    /// 上限なしの場合はnull
    pub remaining: Option<u32>,
    pub sold_out: bool,
}

impl OfferResponse {
    pub fn from_offer(offer: &DayOffer) -> Self {
        Self {
            offer_id: offer.id().to_string(),
            week_start: offer.week_start().to_string(),
            day: offer.day().to_string(),
            dishes: offer.dishes().to_vec(),
            unit_price: MoneyResponse::from_money(offer.unit_price()),
            capacity_limit: offer.capacity_limit(),
            portions_reserved: offer.portions_reserved(),
            remaining: offer.remaining(),
            sold_out: offer.remaining() == Some(0),
        }
    }
}

/// 受付窓口用のレスポンスDTO
#[derive(Debug, Serialize)]
pub struct OrderWindowResponse {
    pub enabled: bool,
    pub week_start: Option<String>,
}

impl OrderWindowResponse {
    pub fn from_window(window: &OrderWindow) -> Self {
        Self {
            enabled: window.enabled(),
            week_start: window.week_start().map(|w| w.to_string()),
        }
    }
}

/// 確定した計画の1週間のレスポンスDTO
#[derive(Debug, Serialize)]
pub struct PlanTemplateWeekResponse {
    pub index: usize,
    pub week_start: Option<String>,
    pub label: Option<String>,
    pub enabled: bool,
    pub menu_status: String,
    pub subtotal: MoneyResponse,
    pub selections: BTreeMap<OfferId, PlanSelection>,
    pub lines: Vec<QuoteLine>,
    pub warnings: Vec<String>,
}

impl PlanTemplateWeekResponse {
    pub fn from_week(week: &PlanTemplateWeek) -> Self {
        Self {
            index: week.index,
            week_start: week.week_start.map(|w| w.to_string()),
            label: week.label.clone(),
            enabled: week.enabled,
            menu_status: week.menu_status.as_str().to_string(),
            subtotal: MoneyResponse::from_money(week.subtotal),
            selections: week.selections.clone(),
            lines: week.lines.clone(),
            warnings: week.warnings.clone(),
        }
    }
}

/// 確定した計画のレスポンスDTO
#[derive(Debug, Serialize)]
pub struct PlanTemplateResponse {
    pub template_id: String,
    pub customer_id: String,
    pub repeat: bool,
    pub address: String,
    pub phone: String,
    pub promo_code: Option<String>,
    pub subtotal: MoneyResponse,
    pub discount: MoneyResponse,
    pub total: MoneyResponse,
    pub weeks_count: usize,
    pub weeks: Vec<PlanTemplateWeekResponse>,
    pub created_at: String,
}

impl PlanTemplateResponse {
    pub fn from_template(template: &PlanTemplate) -> Self {
        Self {
            template_id: template.id().to_string(),
            customer_id: template.customer_id().to_string(),
            repeat: template.repeat(),
            address: template.address().as_str().to_string(),
            phone: template.phone().as_str().to_string(),
            promo_code: template.promo_code().map(str::to_string),
            subtotal: MoneyResponse::from_money(template.subtotal()),
            discount: MoneyResponse::from_money(template.discount()),
            total: MoneyResponse::from_money(template.total()),
            weeks_count: template.weeks().len(),
            weeks: template
                .weeks()
                .iter()
                .map(PlanTemplateWeekResponse::from_week)
                .collect(),
            created_at: template
                .created_at()
                .to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{
        Currency, CustomerId, DayOfWeek, DeliveryAddress, NewOrder, OfferId, OrderId,
        PhoneNumber, PortionCount, WeekStart,
    };
    use chrono::{NaiveDate, TimeZone, Utc};

    fn week() -> WeekStart {
        WeekStart::new(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()).unwrap()
    }

    #[test]
    fn test_order_response_from_order() {
        let order = Order::place(
            OrderId::new(),
            NewOrder {
                customer_id: CustomerId::new(),
                offer_id: OfferId::new(),
                day: DayOfWeek::Friday,
                week_start: week(),
                portions: PortionCount::new(3).unwrap(),
                address: DeliveryAddress::new("пр. Агмашенебели, 40").unwrap(),
                phone: PhoneNumber::new("+995 577 11 22 33").unwrap(),
                menu_snapshot: vec!["Шкмерули".to_string()],
            },
            Utc.with_ymd_and_hms(2026, 10, 18, 7, 30, 0).unwrap(),
        );

        let response = OrderResponse::from_order(&order);
        assert_eq!(response.day, "friday");
        assert_eq!(response.week_start, "2026-10-19");
        assert_eq!(response.portions, 3);
        assert_eq!(response.status, "new");
        assert_eq!(response.created_at, "2026-10-18T07:30:00.000000Z");
        assert!(response.cancelled_at.is_none());
    }

    #[test]
    fn test_offer_response_sold_out() {
        let offer = DayOffer::reconstruct(
            OfferId::new(),
            week(),
            DayOfWeek::Monday,
            vec!["Хачапури".to_string()],
            Money::new(1500, Currency::GEL),
            Some(4),
            4,
        )
        .unwrap();

        let response = OfferResponse::from_offer(&offer);
        assert_eq!(response.remaining, Some(0));
        assert!(response.sold_out);
        assert_eq!(response.unit_price.currency, "GEL");
    }

    #[test]
    fn test_window_response() {
        let response = OrderWindowResponse::from_window(&OrderWindow::open(week()));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["enabled"], true);
        assert_eq!(json["week_start"], "2026-10-19");
    }
}
