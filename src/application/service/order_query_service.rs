use crate::application::ApplicationError;
use crate::domain::model::{CustomerId, Order, OrderId, OrderStatus, WeekStart};
use crate::domain::port::OrderRepository;
use std::sync::Arc;

/// 注文クエリサービス
/// 読み取り専用の注文操作を提供する
pub struct OrderQueryService {
    order_repository: Arc<dyn OrderRepository>,
}

impl OrderQueryService {
    /// 新しい注文クエリサービスを作成
    ///
    /// # Arguments
    /// * `order_repository` - 注文リポジトリ
    pub fn new(order_repository: Arc<dyn OrderRepository>) -> Self {
        Self { order_repository }
    }

    /// 注文IDで注文を取得
    ///
    /// # Returns
    /// * `Ok(Some(Order))` - 注文が見つかった
    /// * `Ok(None)` - 注文が見つからなかった
    /// * `Err(ApplicationError)` - 取得失敗
    pub async fn get_order_by_id(&self, id: OrderId) -> Result<Option<Order>, ApplicationError> {
        self.order_repository
            .find_by_id(id)
            .await
            .map_err(ApplicationError::from)
    }

    /// 顧客の注文を作成日時の降順で取得
    pub async fn list_customer_orders(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Order>, ApplicationError> {
        self.order_repository
            .find_by_customer(customer_id)
            .await
            .map_err(ApplicationError::from)
    }

    /// 週の注文を取得（配達準備用）
    ///
    /// # Arguments
    /// * `week_start` - 対象週
    /// * `status` - 指定した場合はそのステータスの注文のみ
    pub async fn list_week_orders(
        &self,
        week_start: WeekStart,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, ApplicationError> {
        self.order_repository
            .find_by_week(week_start, status)
            .await
            .map_err(ApplicationError::from)
    }
}
