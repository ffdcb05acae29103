use crate::adapter::database_error::DatabaseError;
use crate::domain::model::{OrderWindow, WeekStart};
use crate::domain::port::{OrderWindowRepository, RepositoryError};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{MySql, Pool, Row};

/// MySQL受付窓口リポジトリ
/// order_windowテーブルの1行（id = 1）に保存する
pub struct MySqlOrderWindowRepository {
    pool: Pool<MySql>,
}

impl MySqlOrderWindowRepository {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderWindowRepository for MySqlOrderWindowRepository {
    async fn get(&self) -> Result<OrderWindow, RepositoryError> {
        let row = sqlx::query("SELECT enabled, week_start FROM order_window WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::from_sqlx("受付窓口の取得に失敗しました", e))
            .map_err(RepositoryError::from)?;

        let Some(row) = row else {
            return Ok(OrderWindow::closed());
        };

        let enabled: bool = row
            .try_get("enabled")
            .map_err(|e| RepositoryError::FetchFailed(format!("受付窓口の解析に失敗しました: {}", e)))?;
        let week_start: Option<NaiveDate> = row
            .try_get("week_start")
            .map_err(|e| RepositoryError::FetchFailed(format!("受付窓口の解析に失敗しました: {}", e)))?;
        let week_start = week_start
            .map(WeekStart::new)
            .transpose()
            .map_err(|e| RepositoryError::FetchFailed(format!("受付窓口の週が不正です: {}", e)))?;

        OrderWindow::new(enabled, week_start)
            .map_err(|e| RepositoryError::FetchFailed(format!("受付窓口が不正です: {}", e)))
    }

    async fn set(&self, window: &OrderWindow) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO order_window (id, enabled, week_start)
            VALUES (1, ?, ?)
            ON DUPLICATE KEY UPDATE
                enabled = VALUES(enabled),
                week_start = VALUES(week_start)
            "#,
        )
        .bind(window.enabled())
        .bind(window.week_start().map(|w| w.date()))
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_sqlx("受付窓口の保存に失敗しました", e))
        .map_err(RepositoryError::from)?;

        Ok(())
    }
}
