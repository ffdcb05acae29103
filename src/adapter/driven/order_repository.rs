use crate::adapter::database_error::DatabaseError;
use crate::domain::model::{
    CustomerId, DayOfWeek, DeliveryAddress, OfferId, Order, OrderId, OrderRecord, OrderStatus,
    PhoneNumber, PortionCount, WeekStart,
};
use crate::domain::port::{OrderRepository, RepositoryError};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, Pool, Row};

const ORDER_COLUMNS: &str = "id, customer_id, offer_id, day, week_start, portions, status, \
     address, phone, menu_snapshot, created_at, updated_at, cancelled_at";

/// 曜日順の並び替え
const DAY_ORDER: &str = "FIELD(day, 'monday', 'tuesday', 'wednesday', 'thursday', 'friday')";

/// MySQL注文リポジトリ
/// MySQLデータベースを使用して注文を永続化する
///
/// 同じ顧客・曜日・週の有効な注文の一意性は、ordersテーブルの
/// 生成列（有効な注文のみ値を持つ）を含む一意キーで保証する
pub struct MySqlOrderRepository {
    pool: Pool<MySql>,
}

impl MySqlOrderRepository {
    /// 新しいMySQL注文リポジトリを作成
    ///
    /// # Arguments
    /// * `pool` - MySQLコネクションプール
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    /// データベースの行から注文集約を再構築する
    fn order_from_row(row: &MySqlRow) -> Result<Order, DatabaseError> {
        let corrupted = |what: &str, e: &dyn std::fmt::Display| {
            DatabaseError::CorruptedRow(format!("{}の解析に失敗しました: {}", what, e))
        };

        let id: String = row.try_get("id").map_err(|e| corrupted("注文ID", &e))?;
        let customer_id: String = row
            .try_get("customer_id")
            .map_err(|e| corrupted("顧客ID", &e))?;
        let offer_id: String = row
            .try_get("offer_id")
            .map_err(|e| corrupted("オファーID", &e))?;
        let day: String = row.try_get("day").map_err(|e| corrupted("曜日", &e))?;
        let week_start: NaiveDate = row
            .try_get("week_start")
            .map_err(|e| corrupted("週", &e))?;
        let portions: u8 = row
            .try_get("portions")
            .map_err(|e| corrupted("ランチ数", &e))?;
        let status: String = row
            .try_get("status")
            .map_err(|e| corrupted("注文ステータス", &e))?;
        let address: String = row.try_get("address").map_err(|e| corrupted("住所", &e))?;
        let phone: String = row.try_get("phone").map_err(|e| corrupted("電話番号", &e))?;
        let menu_snapshot: String = row
            .try_get("menu_snapshot")
            .map_err(|e| corrupted("メニュー", &e))?;
        let created_at: DateTime<Utc> = row
            .try_get("created_at")
            .map_err(|e| corrupted("作成日時", &e))?;
        let updated_at: DateTime<Utc> = row
            .try_get("updated_at")
            .map_err(|e| corrupted("更新日時", &e))?;
        let cancelled_at: Option<DateTime<Utc>> = row
            .try_get("cancelled_at")
            .map_err(|e| corrupted("キャンセル日時", &e))?;

        let record = OrderRecord {
            id: OrderId::from_string(&id).map_err(|e| corrupted("注文ID", &e))?,
            customer_id: CustomerId::from_string(&customer_id)
                .map_err(|e| corrupted("顧客ID", &e))?,
            offer_id: OfferId::from_string(&offer_id).map_err(|e| corrupted("オファーID", &e))?,
            day: DayOfWeek::parse(&day).map_err(|e| corrupted("曜日", &e))?,
            week_start: WeekStart::new(week_start).map_err(|e| corrupted("週", &e))?,
            portions: PortionCount::new(u32::from(portions))
                .map_err(|e| corrupted("ランチ数", &e))?,
            status: OrderStatus::from_string(&status)
                .map_err(|e| corrupted("注文ステータス", &e))?,
            address: DeliveryAddress::new(&address).map_err(|e| corrupted("住所", &e))?,
            phone: PhoneNumber::new(&phone).map_err(|e| corrupted("電話番号", &e))?,
            menu_snapshot: serde_json::from_str(&menu_snapshot)
                .map_err(|e| corrupted("メニュー", &e))?,
            created_at,
            updated_at,
            cancelled_at,
        };

        Order::reconstruct(record).map_err(|e| corrupted("注文集約", &e))
    }

    fn orders_from_rows(rows: Vec<MySqlRow>) -> Result<Vec<Order>, RepositoryError> {
        rows.iter()
            .map(|row| Self::order_from_row(row).map_err(RepositoryError::from))
            .collect()
    }
}

#[async_trait]
impl OrderRepository for MySqlOrderRepository {
    fn next_identity(&self) -> OrderId {
        OrderId::new()
    }

    async fn insert(&self, order: &Order) -> Result<(), RepositoryError> {
        let menu_snapshot = serde_json::to_string(order.menu_snapshot()).map_err(|e| {
            RepositoryError::OperationFailed(format!("メニューの変換に失敗しました: {}", e))
        })?;

        sqlx::query(
            r#"
            INSERT INTO orders
                (id, customer_id, offer_id, day, week_start, portions, status,
                 address, phone, menu_snapshot, created_at, updated_at, cancelled_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(order.id().to_string())
        .bind(order.customer_id().to_string())
        .bind(order.offer_id().to_string())
        .bind(order.day().as_str())
        .bind(order.week_start().date())
        .bind(order.portions().get())
        .bind(order.status().to_string())
        .bind(order.address().as_str())
        .bind(order.phone().as_str())
        .bind(menu_snapshot)
        .bind(order.created_at())
        .bind(order.updated_at())
        .bind(order.cancelled_at())
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_sqlx("注文の登録に失敗しました", e))
        .map_err(RepositoryError::from)?;

        Ok(())
    }

    async fn save(
        &self,
        order: &Order,
        expected_updated_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET portions = ?, status = ?, address = ?, updated_at = ?, cancelled_at = ?
            WHERE id = ? AND updated_at = ?
            "#,
        )
        .bind(order.portions().get())
        .bind(order.status().to_string())
        .bind(order.address().as_str())
        .bind(order.updated_at())
        .bind(order.cancelled_at())
        .bind(order.id().to_string())
        .bind(expected_updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_sqlx("注文の更新に失敗しました", e))
        .map_err(RepositoryError::from)?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        // 更新対象がない: 存在しないか、読み込み後に更新された
        let exists = sqlx::query("SELECT id FROM orders WHERE id = ?")
            .bind(order.id().to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::from_sqlx("注文の確認に失敗しました", e))
            .map_err(RepositoryError::from)?;

        match exists {
            Some(_) => Err(RepositoryError::ConstraintViolated(format!(
                "注文 {} は読み込み後に更新されています",
                order.id()
            ))),
            None => Err(RepositoryError::NotFound(format!(
                "注文が見つかりません: {}",
                order.id()
            ))),
        }
    }

    async fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {} FROM orders WHERE id = ?", ORDER_COLUMNS))
            .bind(order_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::from_sqlx("注文の取得に失敗しました", e))
            .map_err(RepositoryError::from)?;

        row.as_ref()
            .map(Self::order_from_row)
            .transpose()
            .map_err(RepositoryError::from)
    }

    async fn find_active(
        &self,
        customer_id: CustomerId,
        day: DayOfWeek,
        week_start: WeekStart,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM orders \
             WHERE customer_id = ? AND day = ? AND week_start = ? AND status = 'new' \
             ORDER BY created_at DESC, id DESC",
            ORDER_COLUMNS
        ))
        .bind(customer_id.to_string())
        .bind(day.as_str())
        .bind(week_start.date())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_sqlx("有効な注文の取得に失敗しました", e))
        .map_err(RepositoryError::from)?;

        Self::orders_from_rows(rows)
    }

    async fn find_by_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM orders WHERE customer_id = ? ORDER BY created_at DESC, id DESC",
            ORDER_COLUMNS
        ))
        .bind(customer_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_sqlx("顧客の注文の取得に失敗しました", e))
        .map_err(RepositoryError::from)?;

        Self::orders_from_rows(rows)
    }

    async fn find_by_week(
        &self,
        week_start: WeekStart,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = match status {
            Some(status) => {
                sqlx::query(&format!(
                    "SELECT {} FROM orders WHERE week_start = ? AND status = ? \
                     ORDER BY {}, created_at, id",
                    ORDER_COLUMNS, DAY_ORDER
                ))
                .bind(week_start.date())
                .bind(status.to_string())
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {} FROM orders WHERE week_start = ? ORDER BY {}, created_at, id",
                    ORDER_COLUMNS, DAY_ORDER
                ))
                .bind(week_start.date())
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| DatabaseError::from_sqlx("週の注文の取得に失敗しました", e))
        .map_err(RepositoryError::from)?;

        Self::orders_from_rows(rows)
    }
}
