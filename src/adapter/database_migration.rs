use crate::adapter::database_error::DatabaseError;
use sqlx::{MySql, Pool};

/// マイグレーション（名前とSQL）
const MIGRATIONS: [(&str, &str); 5] = [
    (
        "001_create_day_offers_table",
        include_str!("../../migrations/001_create_day_offers_table.sql"),
    ),
    (
        "002_create_orders_table",
        include_str!("../../migrations/002_create_orders_table.sql"),
    ),
    (
        "003_create_order_window_table",
        include_str!("../../migrations/003_create_order_window_table.sql"),
    ),
    (
        "004_create_plan_templates_table",
        include_str!("../../migrations/004_create_plan_templates_table.sql"),
    ),
    (
        "005_create_plan_template_weeks_table",
        include_str!("../../migrations/005_create_plan_template_weeks_table.sql"),
    ),
];

/// データベースマイグレーションを管理する構造体
pub struct DatabaseMigration {
    pool: Pool<MySql>,
}

impl DatabaseMigration {
    /// 新しいDatabaseMigrationインスタンスを作成
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    /// マイグレーションを実行
    /// べき等性を保証（CREATE TABLE IF NOT EXISTS）
    pub async fn run(&self) -> Result<(), DatabaseError> {
        for (name, migration_sql) in MIGRATIONS {
            tracing::debug!(migration = name, "Running migration");
            sqlx::query(migration_sql)
                .execute(&self.pool)
                .await
                .map_err(|e| DatabaseError::MigrationError(format!("{} failed: {}", name, e)))?;
        }

        // 受付窓口は常に1行だけ存在する
        sqlx::query("INSERT IGNORE INTO order_window (id, enabled, week_start) VALUES (1, FALSE, NULL)")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                DatabaseError::MigrationError(format!("order_window seed failed: {}", e))
            })?;

        tracing::info!(count = MIGRATIONS.len(), "All migrations completed successfully");
        Ok(())
    }
}
