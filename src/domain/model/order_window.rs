use crate::domain::error::DomainError;
use crate::domain::model::{DayOfWeek, WeekStart};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 翌週以降の事前注文の受付窓口
/// 常に一つだけ存在し、管理操作でのみ変更される
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderWindow {
    enabled: bool,
    week_start: Option<WeekStart>,
}

impl OrderWindow {
    /// 閉じた窓口
    pub fn closed() -> Self {
        Self {
            enabled: false,
            week_start: None,
        }
    }

    /// 指定週に向けて開いた窓口
    pub fn open(week_start: WeekStart) -> Self {
        Self {
            enabled: true,
            week_start: Some(week_start),
        }
    }

    /// 管理操作の入力から作成
    /// 開く場合は週の指定が必須。閉じる場合の週は意味を持たないため破棄する
    pub fn new(enabled: bool, week_start: Option<WeekStart>) -> Result<Self, DomainError> {
        match (enabled, week_start) {
            (true, Some(week)) => Ok(Self::open(week)),
            (true, None) => Err(DomainError::validation(
                "week_start",
                "受付を開く場合は対象週の指定が必要です",
            )),
            (false, _) => Ok(Self::closed()),
        }
    }

    /// 保存された有効フラグ
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// 保存された対象週
    pub fn week_start(&self) -> Option<WeekStart> {
        self.week_start
    }

    /// 対象週が完全に過ぎたか
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        match self.week_start {
            Some(week) => week.last_day().is_some_and(|last| last < today),
            None => false,
        }
    }

    /// 実際に開いている週
    /// 期限切れの窓口は保存フラグに関係なく閉じているとみなす
    pub fn effective_week(&self, today: NaiveDate) -> Option<WeekStart> {
        if !self.enabled || self.is_expired(today) {
            return None;
        }
        self.week_start
    }

    /// 期限切れにより保存状態をリセットする必要があるか
    pub fn needs_expiry_reset(&self, today: NaiveDate) -> bool {
        self.enabled && self.is_expired(today)
    }
}

impl Default for OrderWindow {
    fn default() -> Self {
        Self::closed()
    }
}

/// 注文を受け付けない理由
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum ClosedReason {
    /// 過去の週
    PastWeek,
    /// 今週の過ぎた曜日
    PastDay,
    /// 当日の締め切り時刻を過ぎた
    AfterCutoff { cutoff_hour: u32 },
    /// 翌週以降で受付窓口が開いていない（または別の週を指している）
    WindowClosed,
    /// 受付窓口の対象週が既に過ぎている
    WindowExpired,
    /// 分類できない日付
    Unclassified,
}

impl fmt::Display for ClosedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClosedReason::PastWeek => write!(f, "過去の週の注文は受け付けていません"),
            ClosedReason::PastDay => write!(f, "今週のこの曜日の注文は締め切られました"),
            ClosedReason::AfterCutoff { cutoff_hour } => {
                write!(f, "当日の注文は{:02}:00まで受け付けています", cutoff_hour)
            }
            ClosedReason::WindowClosed => write!(f, "この週の注文受付は開始されていません"),
            ClosedReason::WindowExpired => write!(f, "注文受付の対象週は終了しました"),
            ClosedReason::Unclassified => write!(f, "指定された日付は注文を受け付けていません"),
        }
    }
}

/// ある曜日・週の注文可否の判定結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Orderability {
    pub day: DayOfWeek,
    pub week_start: WeekStart,
    pub orderable: bool,
    pub reason: Option<ClosedReason>,
    pub evaluated_at: DateTime<Utc>,
}

impl Orderability {
    /// 受付可能
    pub fn open(day: DayOfWeek, week_start: WeekStart, evaluated_at: DateTime<Utc>) -> Self {
        Self {
            day,
            week_start,
            orderable: true,
            reason: None,
            evaluated_at,
        }
    }

    /// 受付不可
    pub fn closed(
        day: DayOfWeek,
        week_start: WeekStart,
        reason: ClosedReason,
        evaluated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            day,
            week_start,
            orderable: false,
            reason: Some(reason),
            evaluated_at,
        }
    }

    /// 受付不可ならWindowClosedエラーに変換する
    pub fn ensure_open(&self) -> Result<(), DomainError> {
        match self.reason {
            Some(reason) if !self.orderable => Err(DomainError::WindowClosed {
                day: self.day,
                week_start: self.week_start,
                reason,
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monday(y: i32, m: u32, d: u32) -> WeekStart {
        WeekStart::new(NaiveDate::from_ymd_opt(y, m, d).unwrap()).unwrap()
    }

    #[test]
    fn test_new_requires_week_when_enabled() {
        assert!(OrderWindow::new(true, None).is_err());
        let window = OrderWindow::new(false, Some(monday(2026, 10, 19))).unwrap();
        assert_eq!(window, OrderWindow::closed());
    }

    #[test]
    fn test_window_expires_after_its_week_has_elapsed() {
        let window = OrderWindow::open(monday(2026, 10, 19));
        let sunday = NaiveDate::from_ymd_opt(2026, 10, 25).unwrap();
        let next_monday = NaiveDate::from_ymd_opt(2026, 10, 26).unwrap();

        assert!(!window.is_expired(sunday));
        assert_eq!(window.effective_week(sunday), Some(monday(2026, 10, 19)));
        assert!(window.is_expired(next_monday));
        assert_eq!(window.effective_week(next_monday), None);
        assert!(window.needs_expiry_reset(next_monday));
        assert!(window.enabled(), "stored flag is untouched");
    }

    #[test]
    fn test_closed_window_has_no_effective_week() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        assert_eq!(OrderWindow::closed().effective_week(today), None);
        assert!(!OrderWindow::closed().needs_expiry_reset(today));
    }
}
