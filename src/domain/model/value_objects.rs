use crate::domain::error::DomainError;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;

/// 注文の一意識別子
/// UUIDv7を使用するため、作成時刻順に並べ替えられる
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(Uuid);

impl OrderId {
    /// 新しい一意のOrderIdを生成
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// UUIDから OrderId を作成
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// 文字列からOrderIdを作成
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        let uuid = Uuid::parse_str(s)?;
        Ok(Self(uuid))
    }

    /// 内部のUUIDを取得
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

/// 顧客の一意識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(Uuid);

impl CustomerId {
    /// 新しい一意のCustomerIdを生成
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// UUIDから CustomerId を作成
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// 文字列からCustomerIdを作成
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        let uuid = Uuid::parse_str(s)?;
        Ok(Self(uuid))
    }

    /// 内部のUUIDを取得
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for CustomerId {
    fn default() -> Self {
        Self::new()
    }
}

/// 日別オファー（週×曜日のメニュー枠）の一意識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OfferId(Uuid);

impl OfferId {
    /// 新しい一意のOfferIdを生成
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// UUIDから OfferId を作成
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// 文字列からOfferIdを作成
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        let uuid = Uuid::parse_str(s)?;
        Ok(Self(uuid))
    }

    /// 内部のUUIDを取得
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for OfferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for OfferId {
    fn default() -> Self {
        Self::new()
    }
}

/// 通貨
/// デプロイごとに一つの通貨に固定される（換算は行わない）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(clippy::upper_case_acronyms)]
pub enum Currency {
    /// ジョージア・ラリ
    GEL,
    /// 米ドル
    USD,
    /// ユーロ
    EUR,
}

impl Currency {
    /// 通貨コードから作成
    pub fn from_code(code: &str) -> Result<Self, DomainError> {
        match code.trim().to_ascii_uppercase().as_str() {
            "GEL" => Ok(Currency::GEL),
            "USD" => Ok(Currency::USD),
            "EUR" => Ok(Currency::EUR),
            _ => Err(DomainError::validation(
                "currency",
                format!("サポートされていない通貨: {}", code),
            )),
        }
    }

    /// 通貨コードを取得
    pub fn code(&self) -> &'static str {
        match self {
            Currency::GEL => "GEL",
            Currency::USD => "USD",
            Currency::EUR => "EUR",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// 金額を表す値オブジェクト
/// 金額は補助単位（テトリ、セント）の整数で保持する
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: i64,
    currency: Currency,
}

impl Money {
    /// 金額と通貨から作成
    pub fn new(amount: i64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// 0円相当の金額を作成
    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: 0,
            currency,
        }
    }

    /// 金額を取得
    pub fn amount(&self) -> i64 {
        self.amount
    }

    /// 通貨を取得
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// 金額を加算
    /// 表現できない金額になる場合は入力エラー
    pub fn add(&self, other: &Money) -> Result<Money, DomainError> {
        if self.currency != other.currency {
            return Err(DomainError::CurrencyMismatch);
        }
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or_else(Self::overflow)?;
        Ok(Money {
            amount,
            currency: self.currency,
        })
    }

    /// 金額を減算する。結果は0未満にならない
    pub fn saturating_sub(&self, other: &Money) -> Result<Money, DomainError> {
        if self.currency != other.currency {
            return Err(DomainError::CurrencyMismatch);
        }
        Ok(Money {
            amount: self.amount.saturating_sub(other.amount).max(0),
            currency: self.currency,
        })
    }

    /// 金額を乗算
    pub fn multiply(&self, factor: u32) -> Result<Money, DomainError> {
        let amount = self
            .amount
            .checked_mul(i64::from(factor))
            .ok_or_else(Self::overflow)?;
        Ok(Money {
            amount,
            currency: self.currency,
        })
    }

    /// 指定パーセントの金額（端数切り捨て）
    /// 100%以下なら元の金額を超えないため桁あふれしない
    pub fn percentage(&self, percent: u8) -> Money {
        let amount = i128::from(self.amount) * i128::from(percent.min(100)) / 100;
        Money {
            amount: amount as i64,
            currency: self.currency,
        }
    }

    fn overflow() -> DomainError {
        DomainError::validation("amount", "金額が扱える範囲を超えています")
    }

    /// 小さい方の金額を返す
    pub fn min(self, other: Money) -> Result<Money, DomainError> {
        if self.currency != other.currency {
            return Err(DomainError::CurrencyMismatch);
        }
        Ok(if self.amount <= other.amount { self } else { other })
    }
}

/// 配達曜日（月曜〜金曜）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl DayOfWeek {
    /// 営業日のすべて（週の順）
    pub const ALL: [DayOfWeek; 5] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
    ];

    /// 週の開始（月曜）からのオフセット日数
    pub fn index(&self) -> u32 {
        match self {
            DayOfWeek::Monday => 0,
            DayOfWeek::Tuesday => 1,
            DayOfWeek::Wednesday => 2,
            DayOfWeek::Thursday => 3,
            DayOfWeek::Friday => 4,
        }
    }

    /// 文字列から曜日を解析する
    /// 英語名とロシア語名を大文字小文字を区別せずに受け付ける
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s.trim().to_lowercase().as_str() {
            "monday" | "mon" | "понедельник" => Ok(DayOfWeek::Monday),
            "tuesday" | "tue" | "вторник" => Ok(DayOfWeek::Tuesday),
            "wednesday" | "wed" | "среда" => Ok(DayOfWeek::Wednesday),
            "thursday" | "thu" | "четверг" => Ok(DayOfWeek::Thursday),
            "friday" | "fri" | "пятница" => Ok(DayOfWeek::Friday),
            _ => Err(DomainError::validation(
                "day",
                format!("営業日（月曜〜金曜）のみ指定できます: {}", s),
            )),
        }
    }

    /// 正規化された曜日名
    pub fn as_str(&self) -> &'static str {
        match self {
            DayOfWeek::Monday => "monday",
            DayOfWeek::Tuesday => "tuesday",
            DayOfWeek::Wednesday => "wednesday",
            DayOfWeek::Thursday => "thursday",
            DayOfWeek::Friday => "friday",
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 週の開始日（必ず月曜日）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "NaiveDate", into = "NaiveDate")]
pub struct WeekStart(NaiveDate);

impl WeekStart {
    /// 月曜日の日付から作成
    /// 週の最終日が表現できない日付は受け付けない
    pub fn new(date: NaiveDate) -> Result<Self, DomainError> {
        if date.weekday() != Weekday::Mon {
            return Err(DomainError::validation(
                "week_start",
                format!("週の開始日は月曜日である必要があります: {}", date),
            ));
        }
        let week = Self(date);
        if week.last_day().is_none() {
            return Err(DomainError::validation(
                "week_start",
                format!("扱える範囲外の週です: {}", date),
            ));
        }
        Ok(week)
    }

    /// 指定日を含む週の開始日
    pub fn containing(date: NaiveDate) -> Self {
        let offset = date.weekday().num_days_from_monday() as i64;
        // 暦の下限付近では下限日で飽和する
        Self(
            date.checked_sub_signed(Duration::days(offset))
                .unwrap_or(NaiveDate::MIN),
        )
    }

    /// 開始日（月曜日）
    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// 週の最終日（日曜日）。範囲外ならNone
    pub fn last_day(&self) -> Option<NaiveDate> {
        self.0.checked_add_signed(Duration::days(6))
    }

    /// 指定した曜日の日付。範囲外ならNone
    pub fn day_date(&self, day: DayOfWeek) -> Option<NaiveDate> {
        self.0
            .checked_add_signed(Duration::days(i64::from(day.index())))
    }

    /// n週後（負なら前）の開始日。範囲外ならNone
    pub fn plus_weeks(&self, weeks: i64) -> Option<Self> {
        self.0
            .checked_add_signed(Duration::try_weeks(weeks)?)
            .map(Self)
    }
}

impl TryFrom<NaiveDate> for WeekStart {
    type Error = DomainError;

    fn try_from(date: NaiveDate) -> Result<Self, Self::Error> {
        WeekStart::new(date)
    }
}

impl From<WeekStart> for NaiveDate {
    fn from(week: WeekStart) -> Self {
        week.0
    }
}

impl fmt::Display for WeekStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// 1注文あたりのランチ数（1〜4）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct PortionCount(u8);

impl PortionCount {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 4;

    /// 数量から作成
    pub fn new(portions: u32) -> Result<Self, DomainError> {
        if !(Self::MIN..=Self::MAX).contains(&portions) {
            return Err(DomainError::validation(
                "portions",
                format!(
                    "ランチ数は{}〜{}の範囲で指定してください: {}",
                    Self::MIN,
                    Self::MAX,
                    portions
                ),
            ));
        }
        Ok(Self(portions as u8))
    }

    /// 数量を取得
    pub fn get(&self) -> u32 {
        self.0 as u32
    }

    /// 加算する。上限を超える場合はエラー
    pub fn checked_add(&self, additional: PortionCount) -> Result<Self, DomainError> {
        Self::new(self.get() + additional.get())
    }
}

impl TryFrom<u32> for PortionCount {
    type Error = DomainError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        PortionCount::new(value)
    }
}

impl From<PortionCount> for u32 {
    fn from(portions: PortionCount) -> Self {
        portions.get()
    }
}

impl fmt::Display for PortionCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 配達先住所を表す値オブジェクト
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryAddress(String);

impl DeliveryAddress {
    const MAX_LENGTH: usize = 500;

    /// 新しい配達先住所を作成
    /// 前後の空白を除去し、空でないことを確認する
    pub fn new(address: &str) -> Result<Self, DomainError> {
        let trimmed = address.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("address", "配達先住所は必須です"));
        }
        if trimmed.chars().count() > Self::MAX_LENGTH {
            return Err(DomainError::validation(
                "address",
                format!("配達先住所は{}文字以内で入力してください", Self::MAX_LENGTH),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// 電話番号を表す値オブジェクト
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    const MAX_LENGTH: usize = 32;

    /// 新しい電話番号を作成
    /// 数字と `+ - ( )` と空白のみ許可する
    pub fn new(phone: &str) -> Result<Self, DomainError> {
        let trimmed = phone.trim();
        let valid_chars = trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')' | ' '));
        if trimmed.is_empty()
            || trimmed.len() > Self::MAX_LENGTH
            || !valid_chars
            || !trimmed.chars().any(|c| c.is_ascii_digit())
        {
            return Err(DomainError::validation(
                "phone",
                format!("無効な電話番号です: {}", phone),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// 注文のステータス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// 受付済み（有効）
    New,
    /// 顧客によるキャンセル
    CancelledByCustomer,
    /// オペレーターによるキャンセル
    CancelledByOperator,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status_str = match self {
            OrderStatus::New => "new",
            OrderStatus::CancelledByCustomer => "cancelled_by_customer",
            OrderStatus::CancelledByOperator => "cancelled_by_operator",
        };
        write!(f, "{}", status_str)
    }
}

impl OrderStatus {
    /// 文字列からOrderStatusを作成
    pub fn from_string(s: &str) -> Result<Self, DomainError> {
        match s {
            "new" => Ok(OrderStatus::New),
            "cancelled_by_customer" => Ok(OrderStatus::CancelledByCustomer),
            "cancelled_by_operator" => Ok(OrderStatus::CancelledByOperator),
            _ => Err(DomainError::validation(
                "status",
                format!("無効な注文ステータス: {}", s),
            )),
        }
    }

    /// 有効（キャンセルされていない）かどうか
    pub fn is_active(&self) -> bool {
        matches!(self, OrderStatus::New)
    }
}

/// キャンセル操作の実行者
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Actor {
    /// 顧客本人
    Customer { customer_id: CustomerId },
    /// オペレーター（管理者）
    Operator,
}

impl Actor {
    /// 注文を操作する権限があるか
    pub fn may_act_for(&self, owner: CustomerId) -> bool {
        match self {
            Actor::Customer { customer_id } => *customer_id == owner,
            Actor::Operator => true,
        }
    }

    /// この実行者によるキャンセル後のステータス
    pub fn cancelled_status(&self) -> OrderStatus {
        match self {
            Actor::Customer { .. } => OrderStatus::CancelledByCustomer,
            Actor::Operator => OrderStatus::CancelledByOperator,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_order_id_creation() {
        let id1 = OrderId::new();
        let id2 = OrderId::new();
        assert_ne!(id1, id2, "Each OrderId should be unique");
        assert_eq!(id1.as_uuid().get_version_num(), 7);
    }

    #[test]
    fn test_money_addition() {
        let money1 = Money::new(1000, Currency::GEL);
        let money2 = Money::new(500, Currency::GEL);
        let result = money1.add(&money2).unwrap();
        assert_eq!(result.amount(), 1500);
    }

    #[test]
    fn test_money_currency_mismatch() {
        let gel = Money::new(1000, Currency::GEL);
        let usd = Money::new(500, Currency::USD);
        assert_eq!(gel.add(&usd), Err(DomainError::CurrencyMismatch));
    }

    #[test]
    fn test_money_saturating_sub_floors_at_zero() {
        let small = Money::new(300, Currency::GEL);
        let big = Money::new(500, Currency::GEL);
        assert_eq!(small.saturating_sub(&big).unwrap().amount(), 0);
        assert_eq!(big.saturating_sub(&small).unwrap().amount(), 200);
    }

    #[test]
    fn test_money_percentage_rounds_down() {
        let money = Money::new(1999, Currency::GEL);
        assert_eq!(money.percentage(10).amount(), 199);
    }

    #[test]
    fn test_money_overflow_is_rejected() {
        let huge = Money::new(i64::MAX / 2 + 1, Currency::GEL);
        assert!(matches!(huge.multiply(2), Err(DomainError::Validation { .. })));
        assert!(matches!(huge.add(&huge), Err(DomainError::Validation { .. })));
        assert_eq!(huge.multiply(1).unwrap(), huge);
        assert_eq!(huge.percentage(100), huge);
        assert_eq!(
            Money::new(i64::MAX, Currency::GEL).percentage(50).amount(),
            i64::MAX / 2
        );
    }

    #[test]
    fn test_currency_from_code() {
        assert_eq!(Currency::from_code("gel").unwrap(), Currency::GEL);
        assert!(Currency::from_code("JPY").is_err());
    }

    #[test]
    fn test_day_parse_accepts_english_and_russian() {
        assert_eq!(DayOfWeek::parse("Monday").unwrap(), DayOfWeek::Monday);
        assert_eq!(DayOfWeek::parse(" пятница ").unwrap(), DayOfWeek::Friday);
        assert_eq!(DayOfWeek::parse("СРЕДА").unwrap(), DayOfWeek::Wednesday);
        assert!(DayOfWeek::parse("saturday").is_err());
        assert!(DayOfWeek::parse("").is_err());
    }

    #[test]
    fn test_week_start_requires_monday() {
        assert!(WeekStart::new(date(2026, 10, 19)).is_ok());
        assert!(WeekStart::new(date(2026, 10, 20)).is_err());
    }

    #[test]
    fn test_week_start_containing_and_day_dates() {
        let week = WeekStart::containing(date(2026, 10, 18));
        assert_eq!(week.date(), date(2026, 10, 12));
        assert_eq!(week.day_date(DayOfWeek::Friday), Some(date(2026, 10, 16)));
        assert_eq!(week.last_day(), Some(date(2026, 10, 18)));
        assert_eq!(week.plus_weeks(1).unwrap().date(), date(2026, 10, 19));
    }

    #[test]
    fn test_week_start_near_calendar_end() {
        // NaiveDate::MAX の週は日曜日まで表現できない
        let last_week = WeekStart::containing(NaiveDate::MAX);
        assert!(last_week.day_date(DayOfWeek::Monday).is_some());
        if NaiveDate::MAX.weekday() != Weekday::Sun {
            assert_eq!(last_week.last_day(), None);
            assert!(WeekStart::new(last_week.date()).is_err());
        }
        assert_eq!(last_week.plus_weeks(1), None);
    }

    #[test]
    fn test_week_start_deserialization_rejects_non_monday() {
        let ok: Result<WeekStart, _> = serde_json::from_str("\"2026-10-19\"");
        assert!(ok.is_ok());
        let bad: Result<WeekStart, _> = serde_json::from_str("\"2026-10-21\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_portion_count_bounds() {
        assert!(PortionCount::new(0).is_err());
        assert!(PortionCount::new(1).is_ok());
        assert!(PortionCount::new(4).is_ok());
        assert!(PortionCount::new(5).is_err());
    }

    #[test]
    fn test_portion_count_checked_add() {
        let two = PortionCount::new(2).unwrap();
        assert_eq!(two.checked_add(two).unwrap().get(), 4);
        let three = PortionCount::new(3).unwrap();
        assert!(three.checked_add(two).is_err());
    }

    #[test]
    fn test_delivery_address_is_trimmed() {
        let address = DeliveryAddress::new("  ул. Руставели, 10 ").unwrap();
        assert_eq!(address.as_str(), "ул. Руставели, 10");
        assert!(DeliveryAddress::new("   ").is_err());
    }

    #[test]
    fn test_phone_number_validation() {
        assert!(PhoneNumber::new("+995 (555) 12-34-56").is_ok());
        assert!(PhoneNumber::new("call me").is_err());
        assert!(PhoneNumber::new("").is_err());
    }

    #[test]
    fn test_order_status_round_trip_strings() {
        for status in [
            OrderStatus::New,
            OrderStatus::CancelledByCustomer,
            OrderStatus::CancelledByOperator,
        ] {
            assert_eq!(OrderStatus::from_string(&status.to_string()).unwrap(), status);
        }
        assert!(OrderStatus::from_string("Pending").is_err());
    }

    #[test]
    fn test_actor_permissions() {
        let owner = CustomerId::new();
        let other = CustomerId::new();
        assert!(Actor::Customer { customer_id: owner }.may_act_for(owner));
        assert!(!Actor::Customer { customer_id: other }.may_act_for(owner));
        assert!(Actor::Operator.may_act_for(owner));
    }
}
