use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, Utc};

use crate::domain::error::DomainError;
use crate::domain::model::{ClosedReason, DayOfWeek, OrderWindow, Orderability, WeekStart};

/// 注文可否の判定ポリシー
/// 現在時刻と受付窓口から、曜日×週が注文可能かを判定する純粋なロジック
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderabilityPolicy {
    cutoff_hour: u32,
    utc_offset: FixedOffset,
}

impl OrderabilityPolicy {
    /// 当日注文の締め切り時刻（時）の既定値
    pub const DEFAULT_CUTOFF_HOUR: u32 = 10;

    /// 新しいポリシーを作成
    ///
    /// # Arguments
    /// * `cutoff_hour` - 当日注文の締め切り時刻（0〜23時、現地時間）
    /// * `utc_offset` - 現地時間のUTCからのオフセット
    pub fn new(cutoff_hour: u32, utc_offset: FixedOffset) -> Result<Self, DomainError> {
        if cutoff_hour > 23 {
            return Err(DomainError::validation(
                "cutoff_hour",
                format!("締め切り時刻は0〜23で指定してください: {}", cutoff_hour),
            ));
        }
        Ok(Self {
            cutoff_hour,
            utc_offset,
        })
    }

    pub fn cutoff_hour(&self) -> u32 {
        self.cutoff_hour
    }

    pub fn utc_offset(&self) -> FixedOffset {
        self.utc_offset
    }

    /// 現地時間
    pub fn local_now(&self, now: DateTime<Utc>) -> NaiveDateTime {
        now.with_timezone(&self.utc_offset).naive_local()
    }

    /// 現地の日付
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        self.local_now(now).date()
    }

    /// 現在の週
    pub fn current_week(&self, now: DateTime<Utc>) -> WeekStart {
        WeekStart::containing(self.today(now))
    }

    /// 指定した曜日・週の注文可否を判定する
    /// 判定できない組み合わせは閉じているとみなし、エラーにはしない
    pub fn evaluate(
        &self,
        day: DayOfWeek,
        week_start: WeekStart,
        now: DateTime<Utc>,
        window: &OrderWindow,
    ) -> Orderability {
        let local_now = self.local_now(now);
        let today = local_now.date();
        let current_week = WeekStart::containing(today);
        let closed = |reason| Orderability::closed(day, week_start, reason, now);

        if week_start < current_week {
            return closed(ClosedReason::PastWeek);
        }

        if week_start == current_week {
            let Some(day_date) = week_start.day_date(day) else {
                return closed(ClosedReason::Unclassified);
            };
            if day_date < today {
                return closed(ClosedReason::PastDay);
            }
            if day_date == today {
                let Some(cutoff) = NaiveTime::from_hms_opt(self.cutoff_hour, 0, 0) else {
                    return closed(ClosedReason::Unclassified);
                };
                if local_now.time() >= cutoff {
                    return closed(ClosedReason::AfterCutoff {
                        cutoff_hour: self.cutoff_hour,
                    });
                }
            }
            return Orderability::open(day, week_start, now);
        }

        // 翌週以降は受付窓口が開いている週のみ
        match window.effective_week(today) {
            Some(open_week) if open_week == week_start => Orderability::open(day, week_start, now),
            _ if window.needs_expiry_reset(today) => closed(ClosedReason::WindowExpired),
            _ => closed(ClosedReason::WindowClosed),
        }
    }

    pub fn is_orderable(
        &self,
        day: DayOfWeek,
        week_start: WeekStart,
        now: DateTime<Utc>,
        window: &OrderWindow,
    ) -> bool {
        self.evaluate(day, week_start, now, window).orderable
    }

    /// 週の指定がない注文の対象週を決める
    /// 今週のその曜日が注文可能なら今週、そうでなければ受付窓口の週
    /// どちらも不可なら今週の判定結果（閉じている理由つき）を返す
    pub fn resolve_target_week(
        &self,
        day: DayOfWeek,
        now: DateTime<Utc>,
        window: &OrderWindow,
    ) -> Orderability {
        let current = self.evaluate(day, self.current_week(now), now, window);
        if current.orderable {
            return current;
        }
        match window.effective_week(self.today(now)) {
            Some(open_week) => {
                let upcoming = self.evaluate(day, open_week, now, window);
                if upcoming.orderable {
                    upcoming
                } else {
                    current
                }
            }
            None => current,
        }
    }

    /// 週の全営業日の注文可否
    pub fn week_summary(
        &self,
        week_start: WeekStart,
        now: DateTime<Utc>,
        window: &OrderWindow,
    ) -> Vec<Orderability> {
        DayOfWeek::ALL
            .iter()
            .map(|day| self.evaluate(*day, week_start, now, window))
            .collect()
    }
}

impl Default for OrderabilityPolicy {
    fn default() -> Self {
        Self {
            cutoff_hour: Self::DEFAULT_CUTOFF_HOUR,
            utc_offset: Utc.fix(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn tbilisi() -> FixedOffset {
        FixedOffset::east_opt(4 * 3600).unwrap()
    }

    fn policy() -> OrderabilityPolicy {
        OrderabilityPolicy::new(10, tbilisi()).unwrap()
    }

    fn week(y: i32, m: u32, d: u32) -> WeekStart {
        WeekStart::new(NaiveDate::from_ymd_opt(y, m, d).unwrap()).unwrap()
    }

    // 現地時間で指定した時刻
    fn local(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        tbilisi()
            .with_ymd_and_hms(y, m, d, h, min, s)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_cutoff_hour_out_of_range() {
        assert!(OrderabilityPolicy::new(24, tbilisi()).is_err());
    }

    #[test]
    fn test_same_day_cutoff_boundary() {
        // 2026-10-19 は月曜日
        let monday = week(2026, 10, 19);
        let window = OrderWindow::closed();

        let before = policy().evaluate(DayOfWeek::Monday, monday, local(2026, 10, 19, 9, 59, 59), &window);
        assert!(before.orderable);

        let at = policy().evaluate(DayOfWeek::Monday, monday, local(2026, 10, 19, 10, 0, 0), &window);
        assert!(!at.orderable);
        assert_eq!(at.reason, Some(ClosedReason::AfterCutoff { cutoff_hour: 10 }));
    }

    #[test]
    fn test_cutoff_uses_local_time() {
        // UTC 06:30 は現地 10:30
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 6, 30, 0).unwrap();
        let result = policy().evaluate(DayOfWeek::Monday, week(2026, 10, 19), now, &OrderWindow::closed());
        assert!(!result.orderable);
    }

    #[test]
    fn test_past_day_and_later_day_in_current_week() {
        let now = local(2026, 10, 21, 8, 0, 0); // 水曜日
        let current = week(2026, 10, 19);
        let window = OrderWindow::closed();

        let tuesday = policy().evaluate(DayOfWeek::Tuesday, current, now, &window);
        assert_eq!(tuesday.reason, Some(ClosedReason::PastDay));
        assert!(policy().is_orderable(DayOfWeek::Friday, current, now, &window));
    }

    #[test]
    fn test_past_week_is_closed_even_with_window() {
        let now = local(2026, 10, 21, 8, 0, 0);
        let last_week = week(2026, 10, 12);
        let window = OrderWindow::open(last_week);
        let result = policy().evaluate(DayOfWeek::Friday, last_week, now, &window);
        assert_eq!(result.reason, Some(ClosedReason::PastWeek));
    }

    #[test]
    fn test_future_week_requires_matching_window() {
        let now = local(2026, 10, 21, 8, 0, 0);
        let next = week(2026, 10, 26);
        let after_next = week(2026, 11, 2);

        let closed = policy().evaluate(DayOfWeek::Monday, next, now, &OrderWindow::closed());
        assert_eq!(closed.reason, Some(ClosedReason::WindowClosed));

        let window = OrderWindow::open(next);
        assert!(policy().is_orderable(DayOfWeek::Monday, next, now, &window));
        assert!(!policy().is_orderable(DayOfWeek::Monday, after_next, now, &window));
    }

    #[test]
    fn test_expired_window_is_treated_as_closed() {
        let stale = week(2026, 10, 12);
        let window = OrderWindow::open(stale);
        let now = local(2026, 10, 21, 8, 0, 0);

        for day in DayOfWeek::ALL {
            assert!(!policy().is_orderable(day, stale, now, &window));
        }
        let next = policy().evaluate(DayOfWeek::Monday, week(2026, 10, 26), now, &window);
        assert_eq!(next.reason, Some(ClosedReason::WindowExpired));
    }

    #[test]
    fn test_resolve_target_week_falls_back_to_window() {
        let now = local(2026, 10, 21, 8, 0, 0); // 水曜日
        let next = week(2026, 10, 26);
        let window = OrderWindow::open(next);

        let thursday = policy().resolve_target_week(DayOfWeek::Thursday, now, &window);
        assert_eq!(thursday.week_start, week(2026, 10, 19));

        let monday = policy().resolve_target_week(DayOfWeek::Monday, now, &window);
        assert!(monday.orderable);
        assert_eq!(monday.week_start, next);

        let closed = policy().resolve_target_week(DayOfWeek::Monday, now, &OrderWindow::closed());
        assert!(!closed.orderable);
        assert_eq!(closed.reason, Some(ClosedReason::PastDay));
    }

    #[test]
    fn test_week_summary_covers_all_days() {
        let now = local(2026, 10, 21, 11, 0, 0);
        let summary = policy().week_summary(week(2026, 10, 19), now, &OrderWindow::closed());
        let open: Vec<bool> = summary.iter().map(|o| o.orderable).collect();
        assert_eq!(open, vec![false, false, false, true, true]);
    }
}
