use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;
use crate::domain::model::Money;

/// 割引の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PromoDiscount {
    /// 小計に対する割合（1〜100%）
    Percentage(u8),
    /// 固定額（補助単位）
    Flat(i64),
}

/// プロモーションコードのルール
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromoRule {
    pub code: String,
    pub discount: PromoDiscount,
    /// 適用に必要な最低小計（補助単位）
    #[serde(default)]
    pub min_subtotal: Option<i64>,
    /// 適用に必要な最低週数（受け付けられた明細がある有効な週のみ数える）
    #[serde(default)]
    pub min_weeks: Option<u32>,
    #[serde(default)]
    pub valid_from: Option<NaiveDate>,
    #[serde(default)]
    pub valid_until: Option<NaiveDate>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// プロモーションコードが適用されない理由
/// 見積もりの promo_code_error として利用者に表示される
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PromoRejection {
    #[error("プロモーションコードが見つかりません")]
    NotFound,
    #[error("このプロモーションコードは現在利用できません")]
    Inactive,
    #[error("このプロモーションコードは{0}から利用できます")]
    NotYetValid(NaiveDate),
    #[error("このプロモーションコードの有効期限は{0}に終了しました")]
    Expired(NaiveDate),
    #[error("小計が{minimum}以上の場合に利用できます")]
    BelowMinimumSubtotal { minimum: i64 },
    #[error("{required}週以上の注文で利用できます")]
    NotEnoughWeeks { required: u32 },
    #[error("プロモーションコードを確認できませんでした")]
    Unavailable,
}

impl PromoRule {
    /// コードを正規化する（前後の空白除去・大文字化）。空ならNone
    pub fn normalize_code(code: &str) -> Option<String> {
        let normalized = code.trim().to_uppercase();
        if normalized.is_empty() {
            None
        } else {
            Some(normalized)
        }
    }

    /// 設定値として妥当か検証する
    pub fn validate(&self) -> Result<(), DomainError> {
        if Self::normalize_code(&self.code).is_none() {
            return Err(DomainError::validation("promo.code", "コードが空です"));
        }
        match self.discount {
            PromoDiscount::Percentage(p) if p == 0 || p > 100 => Err(DomainError::validation(
                "promo.discount",
                format!("割引率は1〜100%で指定してください: {}", p),
            )),
            PromoDiscount::Flat(amount) if amount <= 0 => Err(DomainError::validation(
                "promo.discount",
                format!("割引額は正の値で指定してください: {}", amount),
            )),
            _ => Ok(()),
        }
    }

    /// 小計と有効週数に対して割引額を計算する
    /// 割引額は小計を超えない
    pub fn evaluate(
        &self,
        subtotal: Money,
        enabled_weeks: u32,
        today: NaiveDate,
    ) -> Result<Money, PromoRejection> {
        if !self.active {
            return Err(PromoRejection::Inactive);
        }
        if let Some(from) = self.valid_from {
            if today < from {
                return Err(PromoRejection::NotYetValid(from));
            }
        }
        if let Some(until) = self.valid_until {
            if today > until {
                return Err(PromoRejection::Expired(until));
            }
        }
        if let Some(minimum) = self.min_subtotal {
            if subtotal.amount() < minimum {
                return Err(PromoRejection::BelowMinimumSubtotal { minimum });
            }
        }
        if let Some(required) = self.min_weeks {
            if enabled_weeks < required {
                return Err(PromoRejection::NotEnoughWeeks { required });
            }
        }

        let discount = match self.discount {
            PromoDiscount::Percentage(percent) => subtotal.percentage(percent.min(100)),
            PromoDiscount::Flat(amount) => Money::new(amount.max(0), subtotal.currency()),
        };
        discount
            .min(subtotal)
            .map_err(|_| PromoRejection::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Currency;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn rule(discount: PromoDiscount) -> PromoRule {
        PromoRule {
            code: "LUNCH10".to_string(),
            discount,
            min_subtotal: None,
            min_weeks: None,
            valid_from: None,
            valid_until: None,
            active: true,
        }
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(PromoRule::normalize_code(" lunch10 "), Some("LUNCH10".to_string()));
        assert_eq!(PromoRule::normalize_code("   "), None);
    }

    #[test]
    fn test_percentage_discount() {
        let subtotal = Money::new(4500, Currency::GEL);
        let discount = rule(PromoDiscount::Percentage(10))
            .evaluate(subtotal, 1, today())
            .unwrap();
        assert_eq!(discount.amount(), 450);
    }

    #[test]
    fn test_flat_discount_is_clamped_to_subtotal() {
        let subtotal = Money::new(1000, Currency::GEL);
        let discount = rule(PromoDiscount::Flat(5000))
            .evaluate(subtotal, 1, today())
            .unwrap();
        assert_eq!(discount.amount(), 1000);
    }

    #[test]
    fn test_constraints_reject() {
        let subtotal = Money::new(1000, Currency::GEL);

        let mut min_subtotal = rule(PromoDiscount::Percentage(10));
        min_subtotal.min_subtotal = Some(2000);
        assert_eq!(
            min_subtotal.evaluate(subtotal, 1, today()),
            Err(PromoRejection::BelowMinimumSubtotal { minimum: 2000 })
        );

        let mut min_weeks = rule(PromoDiscount::Percentage(10));
        min_weeks.min_weeks = Some(2);
        assert_eq!(
            min_weeks.evaluate(subtotal, 1, today()),
            Err(PromoRejection::NotEnoughWeeks { required: 2 })
        );
        assert!(min_weeks.evaluate(subtotal, 2, today()).is_ok());

        let mut expired = rule(PromoDiscount::Percentage(10));
        expired.valid_until = NaiveDate::from_ymd_opt(2026, 10, 1);
        assert!(matches!(
            expired.evaluate(subtotal, 1, today()),
            Err(PromoRejection::Expired(_))
        ));

        let mut inactive = rule(PromoDiscount::Percentage(10));
        inactive.active = false;
        assert_eq!(
            inactive.evaluate(subtotal, 1, today()),
            Err(PromoRejection::Inactive)
        );
    }

    #[test]
    fn test_validate_rejects_bad_percentage() {
        assert!(rule(PromoDiscount::Percentage(0)).validate().is_err());
        assert!(rule(PromoDiscount::Percentage(101)).validate().is_err());
        assert!(rule(PromoDiscount::Flat(0)).validate().is_err());
        assert!(rule(PromoDiscount::Percentage(100)).validate().is_ok());
    }

    #[test]
    fn test_deserialize_from_config_json() {
        let json = r#"{"code":"TEAM","discount":{"kind":"flat","value":500},"min_weeks":2}"#;
        let rule: PromoRule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.discount, PromoDiscount::Flat(500));
        assert_eq!(rule.min_weeks, Some(2));
        assert!(rule.active);
    }
}
