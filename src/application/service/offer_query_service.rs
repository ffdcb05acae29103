use crate::application::ApplicationError;
use crate::domain::model::{DayOffer, OfferId, PlannerPreset, WeekStart};
use crate::domain::port::{DayOfferRepository, PresetSource};
use std::sync::Arc;

/// 日別オファークエリサービス
/// メニュー・残り受付数・計画の定型パターンの参照
pub struct OfferQueryService {
    offer_repository: Arc<dyn DayOfferRepository>,
    preset_source: Arc<dyn PresetSource>,
}

impl OfferQueryService {
    pub fn new(
        offer_repository: Arc<dyn DayOfferRepository>,
        preset_source: Arc<dyn PresetSource>,
    ) -> Self {
        Self {
            offer_repository,
            preset_source,
        }
    }

    /// 週のオファーを曜日順で取得
    pub async fn list_week_offers(
        &self,
        week_start: WeekStart,
    ) -> Result<Vec<DayOffer>, ApplicationError> {
        self.offer_repository
            .find_by_week(week_start)
            .await
            .map_err(ApplicationError::from)
    }

    /// 有効な計画の定型パターンを表示順で取得
    pub async fn list_presets(&self) -> Result<Vec<PlannerPreset>, ApplicationError> {
        self.preset_source
            .list_active()
            .await
            .map_err(ApplicationError::from)
    }

    /// オファーIDでオファーを取得
    pub async fn get_offer(&self, offer_id: OfferId) -> Result<Option<DayOffer>, ApplicationError> {
        self.offer_repository
            .find_by_id(offer_id)
            .await
            .map_err(ApplicationError::from)
    }
}
