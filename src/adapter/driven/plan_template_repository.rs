use crate::adapter::database_error::DatabaseError;
use crate::domain::model::{
    Currency, CustomerId, DeliveryAddress, MenuStatus, Money, PhoneNumber, PlanTemplate,
    PlanTemplateId, PlanTemplateRecord, PlanTemplateWeek, WeekStart,
};
use crate::domain::port::{PlanTemplateRepository, RepositoryError};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, Pool, Row};

const TEMPLATE_COLUMNS: &str = "id, customer_id, repeat_weeks, address, phone, promo_code, \
     subtotal, discount, total, currency, created_at";

const WEEK_COLUMNS: &str = "week_index, week_start, label, enabled, menu_status, subtotal, \
     selections, quote_lines, warnings";

fn corrupted(what: &str, e: &dyn std::fmt::Display) -> DatabaseError {
    DatabaseError::CorruptedRow(format!("{}の解析に失敗しました: {}", what, e))
}

fn encode<T: Serialize + ?Sized>(what: &str, value: &T) -> Result<String, RepositoryError> {
    serde_json::to_string(value).map_err(|e| {
        RepositoryError::OperationFailed(format!("{}の変換に失敗しました: {}", what, e))
    })
}

/// MySQL計画リポジトリ
/// 計画本体（plan_templates）と週（plan_template_weeks）を同じトランザクションで書き込む
pub struct MySqlPlanTemplateRepository {
    pool: Pool<MySql>,
}

impl MySqlPlanTemplateRepository {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    fn week_from_row(row: &MySqlRow, currency: Currency) -> Result<PlanTemplateWeek, DatabaseError> {
        let index: u8 = row
            .try_get("week_index")
            .map_err(|e| corrupted("週番号", &e))?;
        let week_start: Option<NaiveDate> = row
            .try_get("week_start")
            .map_err(|e| corrupted("週", &e))?;
        let label: Option<String> = row.try_get("label").map_err(|e| corrupted("期間", &e))?;
        let enabled: bool = row.try_get("enabled").map_err(|e| corrupted("有効", &e))?;
        let menu_status: String = row
            .try_get("menu_status")
            .map_err(|e| corrupted("メニュー状態", &e))?;
        let subtotal: i64 = row.try_get("subtotal").map_err(|e| corrupted("小計", &e))?;
        let selections: String = row
            .try_get("selections")
            .map_err(|e| corrupted("選択", &e))?;
        let lines: String = row
            .try_get("quote_lines")
            .map_err(|e| corrupted("明細", &e))?;
        let warnings: String = row
            .try_get("warnings")
            .map_err(|e| corrupted("警告", &e))?;

        Ok(PlanTemplateWeek {
            index: usize::from(index),
            week_start: week_start
                .map(WeekStart::new)
                .transpose()
                .map_err(|e| corrupted("週", &e))?,
            label,
            enabled,
            menu_status: MenuStatus::from_string(&menu_status)
                .map_err(|e| corrupted("メニュー状態", &e))?,
            subtotal: Money::new(subtotal, currency),
            selections: serde_json::from_str(&selections).map_err(|e| corrupted("選択", &e))?,
            lines: serde_json::from_str(&lines).map_err(|e| corrupted("明細", &e))?,
            warnings: serde_json::from_str(&warnings).map_err(|e| corrupted("警告", &e))?,
        })
    }

    /// 計画の行と週の行から集約を再構築する
    async fn load(&self, row: &MySqlRow) -> Result<PlanTemplate, RepositoryError> {
        let id: String = row.try_get("id").map_err(|e| corrupted("計画ID", &e))?;
        let customer_id: String = row
            .try_get("customer_id")
            .map_err(|e| corrupted("顧客ID", &e))?;
        let repeat: bool = row
            .try_get("repeat_weeks")
            .map_err(|e| corrupted("繰り返し", &e))?;
        let address: String = row.try_get("address").map_err(|e| corrupted("住所", &e))?;
        let phone: String = row.try_get("phone").map_err(|e| corrupted("電話番号", &e))?;
        let promo_code: Option<String> = row
            .try_get("promo_code")
            .map_err(|e| corrupted("プロモーションコード", &e))?;
        let subtotal: i64 = row.try_get("subtotal").map_err(|e| corrupted("小計", &e))?;
        let discount: i64 = row.try_get("discount").map_err(|e| corrupted("割引", &e))?;
        let total: i64 = row.try_get("total").map_err(|e| corrupted("合計", &e))?;
        let currency: String = row.try_get("currency").map_err(|e| corrupted("通貨", &e))?;
        let created_at: DateTime<Utc> = row
            .try_get("created_at")
            .map_err(|e| corrupted("作成日時", &e))?;

        let id = PlanTemplateId::from_string(&id).map_err(|e| corrupted("計画ID", &e))?;
        let currency = Currency::from_code(&currency).map_err(|e| corrupted("通貨", &e))?;

        let week_rows = sqlx::query(&format!(
            "SELECT {} FROM plan_template_weeks WHERE template_id = ? ORDER BY week_index",
            WEEK_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_sqlx("計画の週の取得に失敗しました", e))?;

        let weeks = week_rows
            .iter()
            .map(|row| Self::week_from_row(row, currency))
            .collect::<Result<Vec<_>, _>>()?;

        let record = PlanTemplateRecord {
            id,
            customer_id: CustomerId::from_string(&customer_id)
                .map_err(|e| corrupted("顧客ID", &e))?,
            repeat,
            address: DeliveryAddress::new(&address).map_err(|e| corrupted("住所", &e))?,
            phone: PhoneNumber::new(&phone).map_err(|e| corrupted("電話番号", &e))?,
            promo_code,
            subtotal: Money::new(subtotal, currency),
            discount: Money::new(discount, currency),
            total: Money::new(total, currency),
            weeks,
            created_at,
        };

        PlanTemplate::reconstruct(record)
            .map_err(|e| corrupted("計画", &e))
            .map_err(RepositoryError::from)
    }
}

#[async_trait]
impl PlanTemplateRepository for MySqlPlanTemplateRepository {
    fn next_identity(&self) -> PlanTemplateId {
        PlanTemplateId::new()
    }

    async fn insert(&self, template: &PlanTemplate) -> Result<(), RepositoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| {
                DatabaseError::ConnectionError(format!("トランザクション開始に失敗しました: {}", e))
            })?;

        sqlx::query(
            r#"
            INSERT INTO plan_templates
                (id, customer_id, repeat_weeks, address, phone, promo_code,
                 subtotal, discount, total, currency, weeks_count, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(template.id().to_string())
        .bind(template.customer_id().to_string())
        .bind(template.repeat())
        .bind(template.address().as_str())
        .bind(template.phone().as_str())
        .bind(template.promo_code())
        .bind(template.subtotal().amount())
        .bind(template.discount().amount())
        .bind(template.total().amount())
        .bind(template.currency().code())
        .bind(template.weeks().len() as u8)
        .bind(template.created_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| DatabaseError::from_sqlx("計画の登録に失敗しました", e))?;

        for week in template.weeks() {
            sqlx::query(
                r#"
                INSERT INTO plan_template_weeks
                    (template_id, week_index, week_start, label, enabled, menu_status,
                     subtotal, selections, quote_lines, warnings)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(template.id().to_string())
            .bind(week.index as u8)
            .bind(week.week_start.map(|w| w.date()))
            .bind(week.label.as_deref())
            .bind(week.enabled)
            .bind(week.menu_status.as_str())
            .bind(week.subtotal.amount())
            .bind(encode("選択", &week.selections)?)
            .bind(encode("明細", &week.lines)?)
            .bind(encode("警告", &week.warnings)?)
            .execute(&mut *tx)
            .await
            .map_err(|e| DatabaseError::from_sqlx("計画の週の登録に失敗しました", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| DatabaseError::from_sqlx("トランザクションのコミットに失敗しました", e))?;
        Ok(())
    }

    async fn find_by_id(
        &self,
        template_id: PlanTemplateId,
    ) -> Result<Option<PlanTemplate>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM plan_templates WHERE id = ?",
            TEMPLATE_COLUMNS
        ))
        .bind(template_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_sqlx("計画の取得に失敗しました", e))?;

        match row {
            Some(row) => Ok(Some(self.load(&row).await?)),
            None => Ok(None),
        }
    }

    async fn find_by_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<PlanTemplate>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM plan_templates WHERE customer_id = ? \
             ORDER BY created_at DESC, id DESC",
            TEMPLATE_COLUMNS
        ))
        .bind(customer_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_sqlx("顧客の計画の取得に失敗しました", e))?;

        let mut templates = Vec::with_capacity(rows.len());
        for row in &rows {
            templates.push(self.load(row).await?);
        }
        Ok(templates)
    }
}
