use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::model::{
    CustomerId, DayOfWeek, Money, OfferId, OrderId, OrderStatus, OrderWindow, PlanTemplateId,
    WeekStart,
};

/// ドメインイベント列挙型
/// ビジネス上の重要なイベントを表現する
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    /// 注文が受け付けられた
    OrderPlaced(OrderPlaced),
    /// 注文のランチ数または住所が変更された
    OrderUpdated(OrderUpdated),
    /// 注文がキャンセルされた
    OrderCancelled(OrderCancelled),
    /// 受付窓口が変更された
    OrderWindowChanged(OrderWindowChanged),
    /// オファーの受付上限が変更された
    CapacityChanged(CapacityChanged),
    /// 複数週の計画が確定された
    PlanCheckedOut(PlanCheckedOut),
}

impl DomainEvent {
    /// イベント名（ログ出力用）
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::OrderPlaced(_) => "order_placed",
            DomainEvent::OrderUpdated(_) => "order_updated",
            DomainEvent::OrderCancelled(_) => "order_cancelled",
            DomainEvent::OrderWindowChanged(_) => "order_window_changed",
            DomainEvent::CapacityChanged(_) => "capacity_changed",
            DomainEvent::PlanCheckedOut(_) => "plan_checked_out",
        }
    }

    /// イベント発生日時
    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DomainEvent::OrderPlaced(e) => e.occurred_at,
            DomainEvent::OrderUpdated(e) => e.occurred_at,
            DomainEvent::OrderCancelled(e) => e.occurred_at,
            DomainEvent::OrderWindowChanged(e) => e.occurred_at,
            DomainEvent::CapacityChanged(e) => e.occurred_at,
            DomainEvent::PlanCheckedOut(e) => e.occurred_at,
        }
    }
}

/// 注文受付イベント
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderPlaced {
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub offer_id: OfferId,
    pub day: DayOfWeek,
    pub week_start: WeekStart,
    pub portions: u32,
    /// イベント発生日時
    pub occurred_at: DateTime<Utc>,
}

/// 注文変更イベント
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderUpdated {
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    /// 変更前のランチ数
    pub previous_portions: u32,
    /// 変更後のランチ数
    pub portions: u32,
    /// 住所が変更されたか
    pub address_changed: bool,
    /// 重複注文の統合による変更か
    pub merged: bool,
    pub occurred_at: DateTime<Utc>,
}

/// 注文キャンセルイベント
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderCancelled {
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub offer_id: OfferId,
    /// 解放されるランチ数
    pub portions: u32,
    pub status: OrderStatus,
    pub occurred_at: DateTime<Utc>,
}

/// 受付窓口変更イベント
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderWindowChanged {
    pub window: OrderWindow,
    /// 期限切れによる自動リセットか
    pub expired: bool,
    pub occurred_at: DateTime<Utc>,
}

/// 受付上限変更イベント
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapacityChanged {
    pub offer_id: OfferId,
    pub capacity_limit: Option<u32>,
    pub portions_reserved: u32,
    pub occurred_at: DateTime<Utc>,
}

/// 計画確定イベント
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanCheckedOut {
    pub template_id: PlanTemplateId,
    pub customer_id: CustomerId,
    /// 受け付けられた明細がある有効な週の数
    pub weeks: usize,
    pub portions: u32,
    pub total: Money,
    pub occurred_at: DateTime<Utc>,
}
