use std::sync::Arc;

use crate::domain::error::DomainError;
use crate::domain::model::{CapacityCheck, DayOffer, OfferId, ReleaseOutcome};
use crate::domain::port::{DayOfferRepository, RepositoryError};

/// 容量台帳
/// 受付済みランチ数の変更はすべてこのサービスを経由する
pub struct CapacityLedger {
    offer_repository: Arc<dyn DayOfferRepository>,
}

impl CapacityLedger {
    /// 新しい容量台帳を作成
    ///
    /// # Arguments
    /// * `offer_repository` - 日別オファーリポジトリ
    pub fn new(offer_repository: Arc<dyn DayOfferRepository>) -> Self {
        Self { offer_repository }
    }

    /// 受付可能な分だけ予約し、受け付けた数を返す（0の場合もある）
    /// 要求との差分の扱いは呼び出し側が決める
    pub async fn reserve(&self, offer_id: OfferId, requested: u32) -> Result<u32, DomainError> {
        if requested == 0 {
            return Ok(0);
        }
        let accepted = self.offer_repository.reserve(offer_id, requested).await?;
        if accepted > requested {
            return Err(DomainError::InvariantViolation(format!(
                "offer {} accepted {} portions for a request of {}",
                offer_id, accepted, requested
            )));
        }
        Ok(accepted)
    }

    /// 予約を解放する
    /// 超過分はエラーにせず、結果として呼び出し側に報告する
    pub async fn release(
        &self,
        offer_id: OfferId,
        portions: u32,
    ) -> Result<ReleaseOutcome, DomainError> {
        if portions == 0 {
            return Ok(ReleaseOutcome {
                released: 0,
                overshoot: 0,
            });
        }
        Ok(self.offer_repository.release(offer_id, portions).await?)
    }

    /// 予約せずに受付可能数を照会する（見積もり用）
    pub fn check(&self, offer: &DayOffer, requested: u32) -> CapacityCheck {
        offer.check(requested)
    }

    /// 受付上限を変更する
    /// 受付済み数を下回る上限は入力エラー
    pub async fn set_capacity(
        &self,
        offer_id: OfferId,
        limit: Option<u32>,
    ) -> Result<DayOffer, DomainError> {
        match self.offer_repository.set_capacity(offer_id, limit).await {
            Ok(offer) => Ok(offer),
            Err(RepositoryError::ConstraintViolated(message)) => {
                Err(DomainError::validation("capacity_limit", message))
            }
            Err(e) => Err(e.into()),
        }
    }
}
