use crate::domain::error::DomainError;
use crate::domain::model::{DayOfWeek, Money, OfferId, WeekStart};
use serde::Serialize;

/// 日別オファー集約
/// 週×曜日のメニュー枠と、その受付上限・受付済みランチ数を管理する
#[derive(Debug, Clone, PartialEq)]
pub struct DayOffer {
    id: OfferId,
    week_start: WeekStart,
    day: DayOfWeek,
    dishes: Vec<String>,
    unit_price: Money,
    capacity_limit: Option<u32>,
    portions_reserved: u32,
}

/// 容量の照会結果（予約は行わない）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CapacityCheck {
    pub requested: u32,
    pub accepted: u32,
    /// 残り枠。上限なしの場合はNone
    pub remaining: Option<u32>,
}

/// 解放処理の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseOutcome {
    /// 実際に解放された数
    pub released: u32,
    /// 受付済み数を超えて解放しようとした分（0でなければ論理エラー）
    pub overshoot: u32,
}

impl DayOffer {
    /// 1食あたりの単価の上限（補助単位）
    pub const MAX_UNIT_PRICE: i64 = 100_000_000;

    /// 新しいオファーを作成（受付済み0）
    pub fn new(
        id: OfferId,
        week_start: WeekStart,
        day: DayOfWeek,
        dishes: Vec<String>,
        unit_price: Money,
        capacity_limit: Option<u32>,
    ) -> Self {
        Self {
            id,
            week_start,
            day,
            dishes,
            unit_price,
            capacity_limit,
            portions_reserved: 0,
        }
    }

    /// 永続化されたデータからオファーを再構築
    /// 受付済み数が上限を超えていれば不変条件違反
    pub fn reconstruct(
        id: OfferId,
        week_start: WeekStart,
        day: DayOfWeek,
        dishes: Vec<String>,
        unit_price: Money,
        capacity_limit: Option<u32>,
        portions_reserved: u32,
    ) -> Result<Self, DomainError> {
        if let Some(limit) = capacity_limit {
            if portions_reserved > limit {
                return Err(DomainError::InvariantViolation(format!(
                    "offer {} has {} portions reserved over a limit of {}",
                    id, portions_reserved, limit
                )));
            }
        }
        Ok(Self {
            id,
            week_start,
            day,
            dishes,
            unit_price,
            capacity_limit,
            portions_reserved,
        })
    }

    pub fn id(&self) -> OfferId {
        self.id
    }

    pub fn week_start(&self) -> WeekStart {
        self.week_start
    }

    pub fn day(&self) -> DayOfWeek {
        self.day
    }

    pub fn dishes(&self) -> &[String] {
        &self.dishes
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn capacity_limit(&self) -> Option<u32> {
        self.capacity_limit
    }

    pub fn portions_reserved(&self) -> u32 {
        self.portions_reserved
    }

    /// 残り枠。上限なしの場合はNone
    pub fn remaining(&self) -> Option<u32> {
        self.capacity_limit
            .map(|limit| limit.saturating_sub(self.portions_reserved))
    }

    /// 予約せずに受付可能数を照会する
    pub fn check(&self, requested: u32) -> CapacityCheck {
        let accepted = match self.remaining() {
            Some(remaining) => requested.min(remaining),
            None => requested,
        };
        CapacityCheck {
            requested,
            accepted,
            remaining: self.remaining(),
        }
    }

    /// 受付可能な分だけ予約し、受け付けた数を返す
    /// 上限を超えて受け付けることはない
    pub fn reserve(&mut self, requested: u32) -> u32 {
        let accepted = self.check(requested).accepted;
        self.portions_reserved += accepted;
        accepted
    }

    /// 予約を解放する（キャンセル時など）
    /// 受付済み数は0未満にならない
    pub fn release(&mut self, portions: u32) -> ReleaseOutcome {
        let released = portions.min(self.portions_reserved);
        self.portions_reserved -= released;
        ReleaseOutcome {
            released,
            overshoot: portions - released,
        }
    }

    /// 受付上限を変更する
    /// 既に受け付けた数を下回る上限は設定できない
    pub fn set_capacity_limit(&mut self, limit: Option<u32>) -> Result<(), DomainError> {
        if let Some(limit) = limit {
            if limit < self.portions_reserved {
                return Err(DomainError::validation(
                    "capacity_limit",
                    format!(
                        "受付済みのランチ数（{}）を下回る上限は設定できません",
                        self.portions_reserved
                    ),
                ));
            }
        }
        self.capacity_limit = limit;
        Ok(())
    }

    /// メニュー内容と単価を更新する
    pub fn update_menu(&mut self, dishes: Vec<String>, unit_price: Money) {
        self.dishes = dishes;
        self.unit_price = unit_price;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Currency;
    use chrono::NaiveDate;

    fn offer(limit: Option<u32>) -> DayOffer {
        DayOffer::new(
            OfferId::new(),
            WeekStart::new(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()).unwrap(),
            DayOfWeek::Monday,
            vec!["Суп дня".to_string()],
            Money::new(1500, Currency::GEL),
            limit,
        )
    }

    #[test]
    fn test_reserve_unlimited_accepts_everything() {
        let mut offer = offer(None);
        assert_eq!(offer.reserve(40), 40);
        assert_eq!(offer.portions_reserved(), 40);
        assert_eq!(offer.remaining(), None);
    }

    #[test]
    fn test_reserve_clamps_to_remaining() {
        let mut offer = offer(Some(5));
        assert_eq!(offer.reserve(3), 3);
        assert_eq!(offer.reserve(3), 2);
        assert_eq!(offer.reserve(1), 0);
        assert_eq!(offer.portions_reserved(), 5);
    }

    #[test]
    fn test_check_does_not_reserve() {
        let offer = offer(Some(2));
        let check = offer.check(4);
        assert_eq!(check.accepted, 2);
        assert_eq!(check.remaining, Some(2));
        assert_eq!(offer.portions_reserved(), 0);
    }

    #[test]
    fn test_check_sold_out() {
        let mut offer = offer(Some(1));
        offer.reserve(1);
        let check = offer.check(2);
        assert_eq!(check.accepted, 0);
        assert_eq!(check.remaining, Some(0));
    }

    #[test]
    fn test_release_clamps_at_zero() {
        let mut offer = offer(Some(5));
        offer.reserve(2);
        let outcome = offer.release(3);
        assert_eq!(outcome.released, 2);
        assert_eq!(outcome.overshoot, 1);
        assert_eq!(offer.portions_reserved(), 0);
    }

    #[test]
    fn test_set_capacity_below_reserved_fails() {
        let mut offer = offer(Some(5));
        offer.reserve(4);
        assert!(offer.set_capacity_limit(Some(3)).is_err());
        assert_eq!(offer.capacity_limit(), Some(5));
        assert!(offer.set_capacity_limit(Some(4)).is_ok());
        assert!(offer.set_capacity_limit(None).is_ok());
    }

    #[test]
    fn test_reconstruct_rejects_overbooked_state() {
        let base = offer(Some(5));
        let result = DayOffer::reconstruct(
            base.id(),
            base.week_start(),
            base.day(),
            base.dishes().to_vec(),
            base.unit_price(),
            Some(2),
            3,
        );
        assert!(matches!(result, Err(DomainError::InvariantViolation(_))));
    }
}
