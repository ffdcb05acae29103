use chrono::{DateTime, Duration, SubsecRound, Utc};

use crate::domain::error::DomainError;
use crate::domain::event::{DomainEvent, OrderCancelled, OrderPlaced, OrderUpdated};
use crate::domain::model::{
    Actor, CustomerId, DayOfWeek, DeliveryAddress, OfferId, OrderId, OrderStatus, PhoneNumber,
    PortionCount, WeekStart,
};

/// 新規注文の入力
/// 住所・電話番号・メニューは注文時点のスナップショットとして保持される
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_id: CustomerId,
    pub offer_id: OfferId,
    pub day: DayOfWeek,
    pub week_start: WeekStart,
    pub portions: PortionCount,
    pub address: DeliveryAddress,
    pub phone: PhoneNumber,
    pub menu_snapshot: Vec<String>,
}

/// 永続化層から読み出した注文の全項目
#[derive(Debug, Clone)]
pub struct OrderRecord {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub offer_id: OfferId,
    pub day: DayOfWeek,
    pub week_start: WeekStart,
    pub portions: PortionCount,
    pub status: OrderStatus,
    pub address: DeliveryAddress,
    pub phone: PhoneNumber,
    pub menu_snapshot: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

/// Order集約
/// 注文のライフサイクル（new → cancelled_by_customer / cancelled_by_operator）を管理する
#[derive(Debug, Clone)]
pub struct Order {
    id: OrderId,
    customer_id: CustomerId,
    offer_id: OfferId,
    day: DayOfWeek,
    week_start: WeekStart,
    portions: PortionCount,
    status: OrderStatus,
    address: DeliveryAddress,
    phone: PhoneNumber,
    menu_snapshot: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    cancelled_at: Option<DateTime<Utc>>,
    domain_events: Vec<DomainEvent>,
}

impl Order {
    /// 新しい注文を作成
    /// 初期ステータスはNew
    pub fn place(id: OrderId, new_order: NewOrder, now: DateTime<Utc>) -> Self {
        let now = now.trunc_subsecs(6);
        let mut order = Self {
            id,
            customer_id: new_order.customer_id,
            offer_id: new_order.offer_id,
            day: new_order.day,
            week_start: new_order.week_start,
            portions: new_order.portions,
            status: OrderStatus::New,
            address: new_order.address,
            phone: new_order.phone,
            menu_snapshot: new_order.menu_snapshot,
            created_at: now,
            updated_at: now,
            cancelled_at: None,
            domain_events: Vec::new(),
        };
        order.domain_events.push(DomainEvent::OrderPlaced(OrderPlaced {
            order_id: order.id,
            customer_id: order.customer_id,
            offer_id: order.offer_id,
            day: order.day,
            week_start: order.week_start,
            portions: order.portions.get(),
            occurred_at: now,
        }));
        order
    }

    /// データベースから取得したデータで注文を再構築
    /// リポジトリでの使用を想定
    pub fn reconstruct(record: OrderRecord) -> Result<Self, DomainError> {
        if record.status.is_active() && record.cancelled_at.is_some() {
            return Err(DomainError::InvariantViolation(format!(
                "active order {} has a cancellation timestamp",
                record.id
            )));
        }
        Ok(Self {
            id: record.id,
            customer_id: record.customer_id,
            offer_id: record.offer_id,
            day: record.day,
            week_start: record.week_start,
            portions: record.portions,
            status: record.status,
            address: record.address,
            phone: record.phone,
            menu_snapshot: record.menu_snapshot,
            created_at: record.created_at,
            updated_at: record.updated_at,
            cancelled_at: record.cancelled_at,
            domain_events: Vec::new(),
        })
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn offer_id(&self) -> OfferId {
        self.offer_id
    }

    pub fn day(&self) -> DayOfWeek {
        self.day
    }

    pub fn week_start(&self) -> WeekStart {
        self.week_start
    }

    pub fn portions(&self) -> PortionCount {
        self.portions
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn address(&self) -> &DeliveryAddress {
        &self.address
    }

    pub fn phone(&self) -> &PhoneNumber {
        &self.phone
    }

    pub fn menu_snapshot(&self) -> &[String] {
        &self.menu_snapshot
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    /// 有効な（キャンセルされていない）注文か
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// ドメインイベントを取得してクリア
    pub fn take_domain_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.domain_events)
    }

    /// ランチ数・住所を変更する
    /// 事前条件:
    /// - ステータスがNew
    /// - 操作者が注文者本人またはオペレーター
    /// - 少なくとも一方の項目が指定されている
    pub fn update(
        &mut self,
        actor: &Actor,
        portions: Option<PortionCount>,
        address: Option<DeliveryAddress>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.ensure_permitted(actor)?;
        self.ensure_mutable()?;
        if portions.is_none() && address.is_none() {
            return Err(DomainError::validation(
                "order",
                "変更する項目（ランチ数または住所）を指定してください",
            ));
        }

        let previous_portions = self.portions.get();
        if let Some(portions) = portions {
            self.portions = portions;
        }
        let address_changed = address.is_some();
        if let Some(address) = address {
            self.address = address;
        }
        self.touch(now);

        self.domain_events.push(DomainEvent::OrderUpdated(OrderUpdated {
            order_id: self.id,
            customer_id: self.customer_id,
            previous_portions,
            portions: self.portions.get(),
            address_changed,
            merged: false,
            occurred_at: self.updated_at,
        }));
        Ok(())
    }

    /// 重複注文を統合する（ランチ数を合算）
    /// 合算後も1〜4の範囲に収まる必要がある
    pub fn merge_portions(
        &mut self,
        additional: PortionCount,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.ensure_mutable()?;
        let previous_portions = self.portions.get();
        self.portions = self.portions.checked_add(additional)?;
        self.touch(now);

        self.domain_events.push(DomainEvent::OrderUpdated(OrderUpdated {
            order_id: self.id,
            customer_id: self.customer_id,
            previous_portions,
            portions: self.portions.get(),
            address_changed: false,
            merged: true,
            occurred_at: self.updated_at,
        }));
        Ok(())
    }

    /// 注文をキャンセル
    /// 既にキャンセル済みの場合は何もせず Ok(false) を返す
    pub fn cancel(&mut self, actor: &Actor, now: DateTime<Utc>) -> Result<bool, DomainError> {
        self.ensure_permitted(actor)?;
        if !self.is_active() {
            return Ok(false);
        }

        self.status = actor.cancelled_status();
        self.touch(now);
        self.cancelled_at = Some(self.updated_at);

        self.domain_events.push(DomainEvent::OrderCancelled(OrderCancelled {
            order_id: self.id,
            customer_id: self.customer_id,
            offer_id: self.offer_id,
            portions: self.portions.get(),
            status: self.status,
            occurred_at: self.updated_at,
        }));
        Ok(true)
    }

    fn ensure_permitted(&self, actor: &Actor) -> Result<(), DomainError> {
        if actor.may_act_for(self.customer_id) {
            Ok(())
        } else {
            Err(DomainError::Forbidden(
                "他の顧客の注文は操作できません".to_string(),
            ))
        }
    }

    fn ensure_mutable(&self) -> Result<(), DomainError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(DomainError::InvalidOrderState(format!(
                "キャンセル済みの注文は変更できません（{}）",
                self.status
            )))
        }
    }

    // updated_atは注文ごとに単調増加（保存先の精度に合わせてマイクロ秒単位）
    fn touch(&mut self, now: DateTime<Utc>) {
        let now = now.trunc_subsecs(6);
        let floor = self.updated_at + Duration::microseconds(1);
        self.updated_at = if now > self.updated_at { now } else { floor };
    }
}
