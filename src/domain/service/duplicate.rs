use std::sync::Arc;

use crate::domain::error::DomainError;
use crate::domain::model::{CustomerId, DayOfWeek, Order, WeekStart};
use crate::domain::port::OrderRepository;

/// 重複注文の検索結果
#[derive(Debug, Clone)]
pub struct ActiveDuplicate {
    /// 最も新しく作成された有効な注文
    pub order: Order,
    /// 有効な注文が複数存在した（本来は一意制約により起こらない）
    pub anomaly: bool,
}

impl ActiveDuplicate {
    /// 呼び出し側へ返す重複エラー
    pub fn to_error(&self) -> DomainError {
        DomainError::DuplicateOrder {
            order_id: self.order.id(),
            portions: self.order.portions().get(),
        }
    }
}

/// 重複注文の判定
/// 参照のみを行い、注文の変更はしない
pub struct DuplicateResolver {
    order_repository: Arc<dyn OrderRepository>,
}

impl DuplicateResolver {
    pub fn new(order_repository: Arc<dyn OrderRepository>) -> Self {
        Self { order_repository }
    }

    /// 顧客・曜日・週が一致する有効な注文を探す
    /// キャンセル済みの注文は対象外
    pub async fn find_active(
        &self,
        customer_id: CustomerId,
        day: DayOfWeek,
        week_start: WeekStart,
    ) -> Result<Option<ActiveDuplicate>, DomainError> {
        let orders = self
            .order_repository
            .find_active(customer_id, day, week_start)
            .await?;
        Ok(Self::pick_most_recent(orders))
    }

    /// 作成日時（同時刻なら注文ID）が最新のものを選ぶ
    fn pick_most_recent(orders: Vec<Order>) -> Option<ActiveDuplicate> {
        let mut active: Vec<Order> = orders.into_iter().filter(|o| o.is_active()).collect();
        let anomaly = active.len() > 1;
        active.sort_by_key(|o| (o.created_at(), o.id()));
        active.pop().map(|order| ActiveDuplicate { order, anomaly })
    }
}
