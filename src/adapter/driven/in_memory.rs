// インメモリのリポジトリ実装
// データベースなしで起動する場合とテストで使用する

use crate::domain::model::{
    CustomerId, DayOfWeek, DayOffer, OfferId, Order, OrderId, OrderStatus, OrderWindow,
    PlanTemplate, PlanTemplateId, ReleaseOutcome, WeekStart,
};
use crate::domain::port::{
    DayOfferRepository, OrderRepository, OrderWindowRepository, PlanTemplateRepository,
    RepositoryError,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::OperationFailed("lock poisoned".to_string()))
}

/// インメモリ注文リポジトリ
/// 有効な注文の一意性と楽観的排他をロック内で判定する
#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: Mutex<HashMap<OrderId, Order>>,
    fail_writes: AtomicBool,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 書き込みを失敗させる（障害時の補償処理の確認用）
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.orders.lock().map(|orders| orders.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ensure_writable(&self) -> Result<(), RepositoryError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::OperationFailed(
                "write rejected by test switch".to_string(),
            ));
        }
        Ok(())
    }

    fn conflicts(existing: &Order, order: &Order) -> bool {
        existing.id() != order.id()
            && existing.is_active()
            && existing.customer_id() == order.customer_id()
            && existing.day() == order.day()
            && existing.week_start() == order.week_start()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    fn next_identity(&self) -> OrderId {
        OrderId::new()
    }

    async fn insert(&self, order: &Order) -> Result<(), RepositoryError> {
        self.ensure_writable()?;
        let mut orders = lock(&self.orders)?;
        if orders.contains_key(&order.id()) {
            return Err(RepositoryError::UniqueViolation(format!(
                "order {} already exists",
                order.id()
            )));
        }
        if order.is_active() && orders.values().any(|o| Self::conflicts(o, order)) {
            return Err(RepositoryError::UniqueViolation(format!(
                "active order exists for customer {} on {} {}",
                order.customer_id(),
                order.week_start(),
                order.day()
            )));
        }
        orders.insert(order.id(), order.clone());
        Ok(())
    }

    async fn save(
        &self,
        order: &Order,
        expected_updated_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.ensure_writable()?;
        let mut orders = lock(&self.orders)?;
        let current = orders
            .get(&order.id())
            .ok_or_else(|| RepositoryError::NotFound(format!("order {}", order.id())))?;
        if current.updated_at() != expected_updated_at {
            return Err(RepositoryError::ConstraintViolated(format!(
                "order {} was modified concurrently",
                order.id()
            )));
        }
        if order.is_active() && orders.values().any(|o| Self::conflicts(o, order)) {
            return Err(RepositoryError::UniqueViolation(format!(
                "active order exists for customer {}",
                order.customer_id()
            )));
        }
        orders.insert(order.id(), order.clone());
        Ok(())
    }

    async fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(lock(&self.orders)?.get(&order_id).cloned())
    }

    async fn find_active(
        &self,
        customer_id: CustomerId,
        day: DayOfWeek,
        week_start: WeekStart,
    ) -> Result<Vec<Order>, RepositoryError> {
        let mut found: Vec<Order> = lock(&self.orders)?
            .values()
            .filter(|o| {
                o.is_active()
                    && o.customer_id() == customer_id
                    && o.day() == day
                    && o.week_start() == week_start
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| (b.created_at(), b.id()).cmp(&(a.created_at(), a.id())));
        Ok(found)
    }

    async fn find_by_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Order>, RepositoryError> {
        let mut found: Vec<Order> = lock(&self.orders)?
            .values()
            .filter(|o| o.customer_id() == customer_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| (b.created_at(), b.id()).cmp(&(a.created_at(), a.id())));
        Ok(found)
    }

    async fn find_by_week(
        &self,
        week_start: WeekStart,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, RepositoryError> {
        let mut found: Vec<Order> = lock(&self.orders)?
            .values()
            .filter(|o| o.week_start() == week_start)
            .filter(|o| status.map_or(true, |s| o.status() == s))
            .cloned()
            .collect();
        found.sort_by_key(|o| (o.day(), o.created_at(), o.id()));
        Ok(found)
    }
}

/// インメモリ日別オファーリポジトリ
/// 予約と解放は単一のロック内で判定と更新を行う
#[derive(Default)]
pub struct InMemoryDayOfferRepository {
    offers: Mutex<HashMap<OfferId, DayOffer>>,
}

impl InMemoryDayOfferRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DayOfferRepository for InMemoryDayOfferRepository {
    async fn upsert(&self, offer: &DayOffer) -> Result<DayOffer, RepositoryError> {
        let mut offers = lock(&self.offers)?;
        let existing = offers
            .values()
            .find(|o| o.week_start() == offer.week_start() && o.day() == offer.day())
            .cloned();

        let stored = match existing {
            Some(mut stored) => {
                stored.update_menu(offer.dishes().to_vec(), offer.unit_price());
                stored
                    .set_capacity_limit(offer.capacity_limit())
                    .map_err(|e| RepositoryError::ConstraintViolated(e.to_string()))?;
                stored
            }
            None => DayOffer::new(
                offer.id(),
                offer.week_start(),
                offer.day(),
                offer.dishes().to_vec(),
                offer.unit_price(),
                offer.capacity_limit(),
            ),
        };
        offers.insert(stored.id(), stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, offer_id: OfferId) -> Result<Option<DayOffer>, RepositoryError> {
        Ok(lock(&self.offers)?.get(&offer_id).cloned())
    }

    async fn find_by_week_and_day(
        &self,
        week_start: WeekStart,
        day: DayOfWeek,
    ) -> Result<Option<DayOffer>, RepositoryError> {
        Ok(lock(&self.offers)?
            .values()
            .find(|o| o.week_start() == week_start && o.day() == day)
            .cloned())
    }

    async fn find_by_week(&self, week_start: WeekStart) -> Result<Vec<DayOffer>, RepositoryError> {
        let mut found: Vec<DayOffer> = lock(&self.offers)?
            .values()
            .filter(|o| o.week_start() == week_start)
            .cloned()
            .collect();
        found.sort_by_key(|o| o.day());
        Ok(found)
    }

    async fn reserve(&self, offer_id: OfferId, requested: u32) -> Result<u32, RepositoryError> {
        let mut offers = lock(&self.offers)?;
        let offer = offers
            .get_mut(&offer_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("offer {}", offer_id)))?;
        Ok(offer.reserve(requested))
    }

    async fn release(
        &self,
        offer_id: OfferId,
        portions: u32,
    ) -> Result<ReleaseOutcome, RepositoryError> {
        let mut offers = lock(&self.offers)?;
        let offer = offers
            .get_mut(&offer_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("offer {}", offer_id)))?;
        Ok(offer.release(portions))
    }

    async fn set_capacity(
        &self,
        offer_id: OfferId,
        limit: Option<u32>,
    ) -> Result<DayOffer, RepositoryError> {
        let mut offers = lock(&self.offers)?;
        let offer = offers
            .get_mut(&offer_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("offer {}", offer_id)))?;
        offer
            .set_capacity_limit(limit)
            .map_err(|e| RepositoryError::ConstraintViolated(e.to_string()))?;
        Ok(offer.clone())
    }
}

/// インメモリ受付窓口リポジトリ
pub struct InMemoryOrderWindowRepository {
    window: Mutex<OrderWindow>,
}

impl InMemoryOrderWindowRepository {
    pub fn new() -> Self {
        Self::with_window(OrderWindow::closed())
    }

    pub fn with_window(window: OrderWindow) -> Self {
        Self {
            window: Mutex::new(window),
        }
    }
}

impl Default for InMemoryOrderWindowRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderWindowRepository for InMemoryOrderWindowRepository {
    async fn get(&self) -> Result<OrderWindow, RepositoryError> {
        Ok(*lock(&self.window)?)
    }

    async fn set(&self, window: &OrderWindow) -> Result<(), RepositoryError> {
        *lock(&self.window)? = *window;
        Ok(())
    }
}

/// インメモリ計画リポジトリ
#[derive(Default)]
pub struct InMemoryPlanTemplateRepository {
    templates: Mutex<HashMap<PlanTemplateId, PlanTemplate>>,
}

impl InMemoryPlanTemplateRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PlanTemplateRepository for InMemoryPlanTemplateRepository {
    fn next_identity(&self) -> PlanTemplateId {
        PlanTemplateId::new()
    }

    async fn insert(&self, template: &PlanTemplate) -> Result<(), RepositoryError> {
        let mut templates = lock(&self.templates)?;
        if templates.contains_key(&template.id()) {
            return Err(RepositoryError::UniqueViolation(format!(
                "plan template {} already exists",
                template.id()
            )));
        }
        templates.insert(template.id(), template.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        template_id: PlanTemplateId,
    ) -> Result<Option<PlanTemplate>, RepositoryError> {
        Ok(lock(&self.templates)?.get(&template_id).cloned())
    }

    async fn find_by_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<PlanTemplate>, RepositoryError> {
        let mut found: Vec<PlanTemplate> = lock(&self.templates)?
            .values()
            .filter(|t| t.customer_id() == customer_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| (b.created_at(), b.id()).cmp(&(a.created_at(), a.id())));
        Ok(found)
    }
}
