use crate::adapter::database_error::DatabaseError;
use crate::domain::model::{
    Currency, DayOfWeek, DayOffer, Money, OfferId, ReleaseOutcome, WeekStart,
};
use crate::domain::port::{DayOfferRepository, RepositoryError};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, Pool, Row, Transaction};

const OFFER_COLUMNS: &str = "id, week_start, day, dishes, unit_price_amount, \
     unit_price_currency, capacity_limit, portions_reserved";

/// MySQL日別オファーリポジトリ
///
/// 受付済みランチ数の変更は行ロック（SELECT ... FOR UPDATE）の中で
/// ドメインモデルの計算を使って行う
pub struct MySqlDayOfferRepository {
    pool: Pool<MySql>,
}

impl MySqlDayOfferRepository {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    fn offer_from_row(row: &MySqlRow) -> Result<DayOffer, DatabaseError> {
        let corrupted = |what: &str, e: &dyn std::fmt::Display| {
            DatabaseError::CorruptedRow(format!("{}の解析に失敗しました: {}", what, e))
        };

        let id: String = row.try_get("id").map_err(|e| corrupted("オファーID", &e))?;
        let week_start: NaiveDate = row
            .try_get("week_start")
            .map_err(|e| corrupted("週", &e))?;
        let day: String = row.try_get("day").map_err(|e| corrupted("曜日", &e))?;
        let dishes: String = row.try_get("dishes").map_err(|e| corrupted("料理", &e))?;
        let amount: i64 = row
            .try_get("unit_price_amount")
            .map_err(|e| corrupted("単価", &e))?;
        let currency: String = row
            .try_get("unit_price_currency")
            .map_err(|e| corrupted("通貨", &e))?;
        let capacity_limit: Option<u32> = row
            .try_get("capacity_limit")
            .map_err(|e| corrupted("受付上限", &e))?;
        let portions_reserved: u32 = row
            .try_get("portions_reserved")
            .map_err(|e| corrupted("受付済み数", &e))?;

        let currency = Currency::from_code(&currency).map_err(|e| corrupted("通貨", &e))?;
        DayOffer::reconstruct(
            OfferId::from_string(&id).map_err(|e| corrupted("オファーID", &e))?,
            WeekStart::new(week_start).map_err(|e| corrupted("週", &e))?,
            DayOfWeek::parse(&day).map_err(|e| corrupted("曜日", &e))?,
            serde_json::from_str(&dishes).map_err(|e| corrupted("料理", &e))?,
            Money::new(amount, currency),
            capacity_limit,
            portions_reserved,
        )
        .map_err(|e| corrupted("オファー", &e))
    }

    async fn begin(&self) -> Result<Transaction<'_, MySql>, RepositoryError> {
        self.pool
            .begin()
            .await
            .map_err(|e| {
                DatabaseError::ConnectionError(format!("トランザクション開始に失敗しました: {}", e))
            })
            .map_err(RepositoryError::from)
    }

    async fn commit(tx: Transaction<'_, MySql>) -> Result<(), RepositoryError> {
        tx.commit()
            .await
            .map_err(|e| DatabaseError::from_sqlx("トランザクションのコミットに失敗しました", e))
            .map_err(RepositoryError::from)
    }

    /// オファー行をロックして読み込む
    async fn lock_offer(
        tx: &mut Transaction<'_, MySql>,
        offer_id: OfferId,
    ) -> Result<DayOffer, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM day_offers WHERE id = ? FOR UPDATE",
            OFFER_COLUMNS
        ))
        .bind(offer_id.to_string())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| DatabaseError::from_sqlx("オファーのロックに失敗しました", e))
        .map_err(RepositoryError::from)?
        .ok_or_else(|| {
            RepositoryError::NotFound(format!("オファーが見つかりません: {}", offer_id))
        })?;

        Self::offer_from_row(&row).map_err(RepositoryError::from)
    }

    async fn write_reserved(
        tx: &mut Transaction<'_, MySql>,
        offer: &DayOffer,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE day_offers SET portions_reserved = ? WHERE id = ?")
            .bind(offer.portions_reserved())
            .bind(offer.id().to_string())
            .execute(&mut **tx)
            .await
            .map_err(|e| DatabaseError::from_sqlx("受付済み数の更新に失敗しました", e))
            .map_err(RepositoryError::from)?;
        Ok(())
    }

    fn encode_dishes(offer: &DayOffer) -> Result<String, RepositoryError> {
        serde_json::to_string(offer.dishes()).map_err(|e| {
            RepositoryError::OperationFailed(format!("料理の変換に失敗しました: {}", e))
        })
    }
}

#[async_trait]
impl DayOfferRepository for MySqlDayOfferRepository {
    async fn upsert(&self, offer: &DayOffer) -> Result<DayOffer, RepositoryError> {
        let mut tx = self.begin().await?;

        let existing = sqlx::query(&format!(
            "SELECT {} FROM day_offers WHERE week_start = ? AND day = ? FOR UPDATE",
            OFFER_COLUMNS
        ))
        .bind(offer.week_start().date())
        .bind(offer.day().as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| DatabaseError::from_sqlx("オファーの取得に失敗しました", e))
        .map_err(RepositoryError::from)?;

        let stored = match existing {
            Some(row) => {
                let mut stored = Self::offer_from_row(&row).map_err(RepositoryError::from)?;
                stored.update_menu(offer.dishes().to_vec(), offer.unit_price());
                stored
                    .set_capacity_limit(offer.capacity_limit())
                    .map_err(|e| RepositoryError::ConstraintViolated(e.to_string()))?;

                sqlx::query(
                    r#"
                    UPDATE day_offers
                    SET dishes = ?, unit_price_amount = ?, unit_price_currency = ?, capacity_limit = ?
                    WHERE id = ?
                    "#,
                )
                .bind(Self::encode_dishes(&stored)?)
                .bind(stored.unit_price().amount())
                .bind(stored.unit_price().currency().code())
                .bind(stored.capacity_limit())
                .bind(stored.id().to_string())
                .execute(&mut *tx)
                .await
                .map_err(|e| DatabaseError::from_sqlx("オファーの更新に失敗しました", e))
                .map_err(RepositoryError::from)?;
                stored
            }
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO day_offers
                        (id, week_start, day, dishes, unit_price_amount, unit_price_currency,
                         capacity_limit, portions_reserved)
                    VALUES (?, ?, ?, ?, ?, ?, ?, 0)
                    "#,
                )
                .bind(offer.id().to_string())
                .bind(offer.week_start().date())
                .bind(offer.day().as_str())
                .bind(Self::encode_dishes(offer)?)
                .bind(offer.unit_price().amount())
                .bind(offer.unit_price().currency().code())
                .bind(offer.capacity_limit())
                .execute(&mut *tx)
                .await
                .map_err(|e| DatabaseError::from_sqlx("オファーの登録に失敗しました", e))
                .map_err(RepositoryError::from)?;

                DayOffer::new(
                    offer.id(),
                    offer.week_start(),
                    offer.day(),
                    offer.dishes().to_vec(),
                    offer.unit_price(),
                    offer.capacity_limit(),
                )
            }
        };

        Self::commit(tx).await?;
        Ok(stored)
    }

    async fn find_by_id(&self, offer_id: OfferId) -> Result<Option<DayOffer>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM day_offers WHERE id = ?",
            OFFER_COLUMNS
        ))
        .bind(offer_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_sqlx("オファーの取得に失敗しました", e))
        .map_err(RepositoryError::from)?;

        row.as_ref()
            .map(Self::offer_from_row)
            .transpose()
            .map_err(RepositoryError::from)
    }

    async fn find_by_week_and_day(
        &self,
        week_start: WeekStart,
        day: DayOfWeek,
    ) -> Result<Option<DayOffer>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM day_offers WHERE week_start = ? AND day = ?",
            OFFER_COLUMNS
        ))
        .bind(week_start.date())
        .bind(day.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_sqlx("オファーの取得に失敗しました", e))
        .map_err(RepositoryError::from)?;

        row.as_ref()
            .map(Self::offer_from_row)
            .transpose()
            .map_err(RepositoryError::from)
    }

    async fn find_by_week(&self, week_start: WeekStart) -> Result<Vec<DayOffer>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM day_offers WHERE week_start = ? \
             ORDER BY FIELD(day, 'monday', 'tuesday', 'wednesday', 'thursday', 'friday')",
            OFFER_COLUMNS
        ))
        .bind(week_start.date())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_sqlx("週のオファーの取得に失敗しました", e))
        .map_err(RepositoryError::from)?;

        rows.iter()
            .map(|row| Self::offer_from_row(row).map_err(RepositoryError::from))
            .collect()
    }

    async fn reserve(&self, offer_id: OfferId, requested: u32) -> Result<u32, RepositoryError> {
        let mut tx = self.begin().await?;
        let mut offer = Self::lock_offer(&mut tx, offer_id).await?;

        let accepted = offer.reserve(requested);
        if accepted > 0 {
            Self::write_reserved(&mut tx, &offer).await?;
        }

        Self::commit(tx).await?;
        Ok(accepted)
    }

    async fn release(
        &self,
        offer_id: OfferId,
        portions: u32,
    ) -> Result<ReleaseOutcome, RepositoryError> {
        let mut tx = self.begin().await?;
        let mut offer = Self::lock_offer(&mut tx, offer_id).await?;

        let outcome = offer.release(portions);
        if outcome.released > 0 {
            Self::write_reserved(&mut tx, &offer).await?;
        }

        Self::commit(tx).await?;
        Ok(outcome)
    }

    async fn set_capacity(
        &self,
        offer_id: OfferId,
        limit: Option<u32>,
    ) -> Result<DayOffer, RepositoryError> {
        let mut tx = self.begin().await?;
        let mut offer = Self::lock_offer(&mut tx, offer_id).await?;

        offer
            .set_capacity_limit(limit)
            .map_err(|e| RepositoryError::ConstraintViolated(e.to_string()))?;

        sqlx::query("UPDATE day_offers SET capacity_limit = ? WHERE id = ?")
            .bind(limit)
            .bind(offer_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| DatabaseError::from_sqlx("受付上限の更新に失敗しました", e))
            .map_err(RepositoryError::from)?;

        Self::commit(tx).await?;
        Ok(offer)
    }
}
