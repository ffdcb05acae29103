use crate::domain::error::DomainError;
use crate::domain::model::{PlanEdit, PlanSelection, PlanWeek, PlannerState};

/// 計画編集のエラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("week {week} is out of range (weeks: {weeks_count})")]
    WeekOutOfRange { week: usize, weeks_count: usize },
    #[error("week {week} mirrors the base week while repeat is on")]
    WeekNotEditable { week: usize },
    #[error("weeks count must be between 1 and {max}: {count}")]
    InvalidWeeksCount { count: usize, max: usize },
    #[error("the base week cannot be disabled")]
    BaseWeekAlwaysEnabled,
}

impl From<PlanError> for DomainError {
    fn from(error: PlanError) -> Self {
        let field = match error {
            PlanError::WeekOutOfRange { .. } | PlanError::WeekNotEditable { .. } => "week",
            PlanError::InvalidWeeksCount { .. } => "weeks_count",
            PlanError::BaseWeekAlwaysEnabled => "enabled",
        };
        DomainError::validation(field, error.to_string())
    }
}

/// 複数週の注文計画の同期
/// 状態と編集を受け取り、新しい状態を返す（入力は変更しない）
pub struct PlanSynchronizer;

impl PlanSynchronizer {
    /// 指定週を直接編集できるか
    /// 繰り返しモード中は基準週のみ編集できる
    pub fn is_week_editable(state: &PlannerState, week: usize) -> bool {
        week < state.weeks.len() && (week == 0 || !state.repeat)
    }

    /// 編集を適用した新しい状態を返す
    pub fn apply(state: &PlannerState, edit: &PlanEdit) -> Result<PlannerState, PlanError> {
        let mut next = Self::normalize(state);

        match edit {
            PlanEdit::SetSelection {
                week,
                offer_id,
                day,
                portions,
            } => {
                Self::ensure_editable(&next, *week)?;
                next.weeks[*week].selections.insert(
                    *offer_id,
                    PlanSelection {
                        day: *day,
                        portions: *portions,
                    },
                );
            }
            PlanEdit::RemoveSelection { week, offer_id } => {
                Self::ensure_editable(&next, *week)?;
                next.weeks[*week].selections.remove(offer_id);
            }
            PlanEdit::ClearWeek { week } => {
                Self::ensure_editable(&next, *week)?;
                next.weeks[*week].selections.clear();
            }
            PlanEdit::SetRepeat { repeat } => {
                // ONにした時点で基準週の内容が他の週へコピーされる
                next.repeat = *repeat;
            }
            PlanEdit::SetWeeksCount { count } => {
                if *count == 0 || *count > PlannerState::MAX_WEEKS {
                    return Err(PlanError::InvalidWeeksCount {
                        count: *count,
                        max: PlannerState::MAX_WEEKS,
                    });
                }
                next.weeks.truncate(*count);
                while next.weeks.len() < *count {
                    next.weeks.push(PlanWeek::empty(None));
                }
            }
            PlanEdit::SetWeekEnabled { week, enabled } => {
                Self::ensure_in_range(&next, *week)?;
                if *week == 0 && !*enabled {
                    return Err(PlanError::BaseWeekAlwaysEnabled);
                }
                next.weeks[*week].enabled = *enabled;
            }
            PlanEdit::SetBaseWeekStart { week_start } => {
                next.weeks[0].week_start = *week_start;
            }
            PlanEdit::OverrideWeekStart { week, week_start } => {
                Self::ensure_in_range(&next, *week)?;
                if *week == 0 {
                    next.weeks[0].week_start = *week_start;
                } else {
                    let target = &mut next.weeks[*week];
                    target.pinned = week_start.is_some();
                    target.week_start = *week_start;
                }
            }
            PlanEdit::PruneOffers { week, available } => {
                Self::ensure_in_range(&next, *week)?;
                // 繰り返しモード中の週1以降は基準週の写しなので触らない
                if Self::is_week_editable(&next, *week) {
                    next.weeks[*week]
                        .selections
                        .retain(|offer_id, _| available.contains(offer_id));
                }
            }
        }

        Ok(Self::normalize(&next))
    }

    /// 複数の編集を順に適用する
    pub fn apply_all(state: &PlannerState, edits: &[PlanEdit]) -> Result<PlannerState, PlanError> {
        edits
            .iter()
            .try_fold(Self::normalize(state), |current, edit| Self::apply(&current, edit))
    }

    /// 計画を正規化する（2回適用しても結果は変わらない）
    /// - 週数を1〜8に収める
    /// - 基準週は常に有効
    /// - 明示指定のない週の開始日は基準週 + 7日×週番号
    /// - 繰り返しモード中は基準週の選択を他の週へコピー
    pub fn normalize(state: &PlannerState) -> PlannerState {
        let mut weeks = state.weeks.clone();
        if weeks.is_empty() {
            weeks.push(PlanWeek::empty(None));
        }
        weeks.truncate(PlannerState::MAX_WEEKS);

        weeks[0].enabled = true;
        weeks[0].pinned = false;
        let base_start = weeks[0].week_start;
        let base_selections = weeks[0].selections.clone();

        for (index, week) in weeks.iter_mut().enumerate().skip(1) {
            if !week.pinned {
                week.week_start = base_start.and_then(|start| start.plus_weeks(index as i64));
            }
            if state.repeat {
                week.selections = base_selections.clone();
            }
        }

        PlannerState {
            weeks,
            repeat: state.repeat,
        }
    }

    fn ensure_in_range(state: &PlannerState, week: usize) -> Result<(), PlanError> {
        if week < state.weeks.len() {
            Ok(())
        } else {
            Err(PlanError::WeekOutOfRange {
                week,
                weeks_count: state.weeks.len(),
            })
        }
    }

    fn ensure_editable(state: &PlannerState, week: usize) -> Result<(), PlanError> {
        Self::ensure_in_range(state, week)?;
        if Self::is_week_editable(state, week) {
            Ok(())
        } else {
            Err(PlanError::WeekNotEditable { week })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{DayOfWeek, OfferId, PortionCount, WeekStart};
    use chrono::NaiveDate;

    fn base_week() -> WeekStart {
        WeekStart::new(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()).unwrap()
    }

    fn select(week: usize, offer_id: OfferId, portions: u32) -> PlanEdit {
        PlanEdit::SetSelection {
            week,
            offer_id,
            day: DayOfWeek::Monday,
            portions: PortionCount::new(portions).unwrap(),
        }
    }

    fn portions_of(state: &PlannerState, week: usize, offer_id: OfferId) -> Option<u32> {
        state.weeks[week]
            .selections
            .get(&offer_id)
            .map(|s| s.portions.get())
    }

    #[test]
    fn test_repeat_propagates_then_stops_when_turned_off() {
        let monday = OfferId::new();
        let state = PlanSynchronizer::apply_all(
            &PlannerState::new(Some(base_week())),
            &[
                PlanEdit::SetWeeksCount { count: 3 },
                PlanEdit::SetRepeat { repeat: true },
                select(0, monday, 2),
            ],
        )
        .unwrap();
        assert_eq!(portions_of(&state, 1, monday), Some(2));
        assert_eq!(portions_of(&state, 2, monday), Some(2));

        let state = PlanSynchronizer::apply_all(
            &state,
            &[PlanEdit::SetRepeat { repeat: false }, select(0, monday, 3)],
        )
        .unwrap();
        assert_eq!(portions_of(&state, 0, monday), Some(3));
        assert_eq!(portions_of(&state, 1, monday), Some(2));
        assert_eq!(portions_of(&state, 2, monday), Some(2));
    }

    #[test]
    fn test_turning_repeat_on_overwrites_later_weeks() {
        let a = OfferId::new();
        let b = OfferId::new();
        let state = PlanSynchronizer::apply_all(
            &PlannerState::new(Some(base_week())),
            &[
                PlanEdit::SetWeeksCount { count: 2 },
                select(0, a, 1),
                select(1, b, 4),
                PlanEdit::SetRepeat { repeat: true },
            ],
        )
        .unwrap();
        assert_eq!(state.weeks[1].selections, state.weeks[0].selections);
        assert_eq!(portions_of(&state, 1, b), None);
    }

    #[test]
    fn test_later_week_not_editable_in_repeat_mode() {
        let state = PlanSynchronizer::apply_all(
            &PlannerState::new(Some(base_week())),
            &[
                PlanEdit::SetWeeksCount { count: 2 },
                PlanEdit::SetRepeat { repeat: true },
            ],
        )
        .unwrap();
        assert!(!PlanSynchronizer::is_week_editable(&state, 1));
        assert!(PlanSynchronizer::is_week_editable(&state, 0));
        assert_eq!(
            PlanSynchronizer::apply(&state, &select(1, OfferId::new(), 1)),
            Err(PlanError::WeekNotEditable { week: 1 })
        );
    }

    #[test]
    fn test_week_disable_keeps_selections() {
        let offer = OfferId::new();
        let state = PlanSynchronizer::apply_all(
            &PlannerState::new(Some(base_week())),
            &[
                PlanEdit::SetWeeksCount { count: 2 },
                select(1, offer, 2),
                PlanEdit::SetWeekEnabled {
                    week: 1,
                    enabled: false,
                },
            ],
        )
        .unwrap();
        assert!(!state.weeks[1].enabled);
        assert_eq!(portions_of(&state, 1, offer), Some(2));

        assert_eq!(
            PlanSynchronizer::apply(
                &state,
                &PlanEdit::SetWeekEnabled {
                    week: 0,
                    enabled: false
                }
            ),
            Err(PlanError::BaseWeekAlwaysEnabled)
        );
    }

    #[test]
    fn test_weeks_count_bounds_and_growth() {
        let state = PlannerState::new(Some(base_week()));
        assert!(PlanSynchronizer::apply(&state, &PlanEdit::SetWeeksCount { count: 0 }).is_err());
        assert!(PlanSynchronizer::apply(&state, &PlanEdit::SetWeeksCount { count: 9 }).is_err());

        let grown = PlanSynchronizer::apply(&state, &PlanEdit::SetWeeksCount { count: 3 }).unwrap();
        assert_eq!(grown.weeks_count(), 3);
        assert_eq!(grown.weeks[2].week_start, base_week().plus_weeks(2));
        assert!(grown.weeks[2].selections.is_empty());

        let shrunk = PlanSynchronizer::apply(&grown, &PlanEdit::SetWeeksCount { count: 1 }).unwrap();
        assert_eq!(shrunk.weeks_count(), 1);
    }

    #[test]
    fn test_override_week_start_pins_week() {
        let published = base_week().plus_weeks(3).unwrap();
        let state = PlanSynchronizer::apply_all(
            &PlannerState::new(Some(base_week())),
            &[
                PlanEdit::SetWeeksCount { count: 2 },
                PlanEdit::OverrideWeekStart {
                    week: 1,
                    week_start: Some(published),
                },
                PlanEdit::SetBaseWeekStart {
                    week_start: base_week().plus_weeks(1),
                },
            ],
        )
        .unwrap();
        assert_eq!(state.weeks[1].week_start, Some(published));

        let released = PlanSynchronizer::apply(
            &state,
            &PlanEdit::OverrideWeekStart {
                week: 1,
                week_start: None,
            },
        )
        .unwrap();
        assert_eq!(released.weeks[1].week_start, base_week().plus_weeks(2));
    }

    #[test]
    fn test_prune_base_week_repropagates() {
        let kept = OfferId::new();
        let gone = OfferId::new();
        let state = PlanSynchronizer::apply_all(
            &PlannerState::new(Some(base_week())),
            &[
                PlanEdit::SetWeeksCount { count: 2 },
                PlanEdit::SetRepeat { repeat: true },
                select(0, kept, 1),
                select(0, gone, 1),
                PlanEdit::PruneOffers {
                    week: 1,
                    available: vec![kept],
                },
            ],
        )
        .unwrap();
        // 繰り返しモード中の週1は基準週の写しのまま
        assert_eq!(portions_of(&state, 1, gone), Some(1));

        let state = PlanSynchronizer::apply(
            &state,
            &PlanEdit::PruneOffers {
                week: 0,
                available: vec![kept],
            },
        )
        .unwrap();
        assert_eq!(portions_of(&state, 0, gone), None);
        assert_eq!(portions_of(&state, 1, gone), None);
        assert_eq!(portions_of(&state, 1, kept), Some(1));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let state = PlannerState {
            weeks: vec![
                PlanWeek {
                    week_start: Some(base_week()),
                    pinned: true,
                    enabled: false,
                    selections: Default::default(),
                },
                PlanWeek::empty(None),
            ],
            repeat: true,
        };
        let once = PlanSynchronizer::normalize(&state);
        let twice = PlanSynchronizer::normalize(&once);
        assert_eq!(once, twice);
        assert!(once.weeks[0].enabled);
    }
}
