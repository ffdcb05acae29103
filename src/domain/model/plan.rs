use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::model::{DayOfWeek, OfferId, PortionCount, WeekStart};

/// 計画中の1オファー分の選択
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSelection {
    pub day: DayOfWeek,
    pub portions: PortionCount,
}

/// 計画中の1週間
/// 無効化された週も選択内容は保持する（再度有効にすると復元される）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanWeek {
    pub week_start: Option<WeekStart>,
    /// 公開済みの週を明示的に選んだ場合はtrue（週0からの自動算出を行わない）
    #[serde(default)]
    pub pinned: bool,
    pub enabled: bool,
    #[serde(default)]
    pub selections: BTreeMap<OfferId, PlanSelection>,
}

impl PlanWeek {
    /// 選択なしの有効な週
    pub fn empty(week_start: Option<WeekStart>) -> Self {
        Self {
            week_start,
            pinned: false,
            enabled: true,
            selections: BTreeMap::new(),
        }
    }
}

/// 複数週の注文計画
/// weeks[0] が基準週で、常に有効
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerState {
    pub weeks: Vec<PlanWeek>,
    /// 「毎週同じ内容を繰り返す」モード
    pub repeat: bool,
}

impl PlannerState {
    /// 計画できる最大週数
    pub const MAX_WEEKS: usize = 8;

    /// 1週間だけの空の計画
    pub fn new(base_week_start: Option<WeekStart>) -> Self {
        Self {
            weeks: vec![PlanWeek::empty(base_week_start)],
            repeat: false,
        }
    }

    /// 計画の週数
    pub fn weeks_count(&self) -> usize {
        self.weeks.len()
    }

    /// 基準週
    pub fn base_week(&self) -> Option<&PlanWeek> {
        self.weeks.first()
    }
}

impl Default for PlannerState {
    fn default() -> Self {
        Self::new(None)
    }
}

/// 計画への編集操作
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PlanEdit {
    /// 指定週のオファーのランチ数を設定する
    SetSelection {
        week: usize,
        offer_id: OfferId,
        day: DayOfWeek,
        portions: PortionCount,
    },
    /// 指定週からオファーの選択を外す
    RemoveSelection { week: usize, offer_id: OfferId },
    /// 指定週の選択をすべて外す
    ClearWeek { week: usize },
    /// 繰り返しモードを切り替える
    SetRepeat { repeat: bool },
    /// 計画の週数を変更する（1〜8）
    SetWeeksCount { count: usize },
    /// 週の有効・無効を切り替える（週0は常に有効）
    SetWeekEnabled { week: usize, enabled: bool },
    /// 基準週の開始日を設定する
    SetBaseWeekStart { week_start: Option<WeekStart> },
    /// 指定週に公開済みの週を明示的に割り当てる。Noneで自動算出に戻す
    OverrideWeekStart {
        week: usize,
        week_start: Option<WeekStart>,
    },
    /// メニュー変更で存在しなくなったオファーを取り除く
    PruneOffers {
        week: usize,
        available: Vec<OfferId>,
    },
}
