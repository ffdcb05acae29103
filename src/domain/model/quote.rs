use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;
use crate::domain::model::{Currency, DayOfWeek, Money, OfferId, WeekStart};

/// 見積もり明細の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStatus {
    /// 要求どおり受付可能
    Ok,
    /// 容量不足（一部または全部）
    SoldOut,
    /// 受付期間外、またはオファーが存在しない
    Closed,
}

/// 週のメニューの公開状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuStatus {
    /// オファーが1件以上公開されている
    Published,
    /// まだ公開されていない
    Pending,
}

impl MenuStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MenuStatus::Published => "published",
            MenuStatus::Pending => "pending",
        }
    }

    pub fn from_string(s: &str) -> Result<Self, DomainError> {
        match s {
            "published" => Ok(MenuStatus::Published),
            "pending" => Ok(MenuStatus::Pending),
            other => Err(DomainError::validation(
                "menu_status",
                format!("不明なメニュー状態です: {}", other),
            )),
        }
    }
}

/// 見積もりの1明細（オファー単位）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteLine {
    pub offer_id: OfferId,
    pub day: DayOfWeek,
    pub status: LineStatus,
    pub requested_portions: u32,
    pub accepted_portions: u32,
    pub unit_price: Option<Money>,
    pub subtotal: Money,
    pub message: Option<String>,
}

/// 1週間分の見積もり
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekQuote {
    pub week_start: Option<WeekStart>,
    /// 表示用の期間（例: "19.10 - 23.10"）
    pub label: Option<String>,
    pub enabled: bool,
    pub menu_status: MenuStatus,
    pub lines: Vec<QuoteLine>,
    pub subtotal: Money,
    pub warnings: Vec<String>,
}

/// 見積もり
/// リクエストごとに再計算され、永続化されない
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub weeks: Vec<WeekQuote>,
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
    pub currency: Currency,
    pub warnings: Vec<String>,
    /// 正規化されたプロモーションコード（適用の成否にかかわらず）
    pub promo_code: Option<String>,
    pub promo_code_error: Option<String>,
}

impl Quote {
    /// すべての明細
    pub fn lines(&self) -> impl Iterator<Item = &QuoteLine> {
        self.weeks.iter().flat_map(|week| week.lines.iter())
    }
}
