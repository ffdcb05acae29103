use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;
use crate::domain::model::{DayOfWeek, PortionCount};

/// 計画の定型パターン（例: 平日毎日2食）
/// 選択画面で一括選択の候補として表示される
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerPreset {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub days: Vec<DayOfWeek>,
    pub portions: PortionCount,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub sort_order: i32,
}

fn default_active() -> bool {
    true
}

impl PlannerPreset {
    /// 設定値として妥当かを確認する
    pub fn validate(&self) -> Result<(), DomainError> {
        let slug = self.slug.trim();
        if slug.is_empty()
            || !slug
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(DomainError::validation(
                "slug",
                "スラッグは英小文字・数字・ハイフンで指定してください",
            ));
        }
        if self.title.trim().is_empty() {
            return Err(DomainError::validation("title", "タイトルは必須です"));
        }
        if self.days.is_empty() {
            return Err(DomainError::validation("days", "曜日を1つ以上指定してください"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preset(slug: &str, days: Vec<DayOfWeek>) -> PlannerPreset {
        PlannerPreset {
            slug: slug.to_string(),
            title: "Каждый день".to_string(),
            description: None,
            days,
            portions: PortionCount::new(1).unwrap(),
            active: true,
            sort_order: 0,
        }
    }

    #[test]
    fn test_validate() {
        assert!(preset("every-day", DayOfWeek::ALL.to_vec()).validate().is_ok());
        assert!(preset("Every Day", DayOfWeek::ALL.to_vec()).validate().is_err());
        assert!(preset("every-day", Vec::new()).validate().is_err());
    }

    #[test]
    fn test_deserialize_defaults() {
        let preset: PlannerPreset = serde_json::from_str(
            r#"{"slug":"mon-wed","title":"Пн и Ср","days":["monday","wednesday"],"portions":2}"#,
        )
        .unwrap();
        assert!(preset.active);
        assert_eq!(preset.sort_order, 0);
        assert_eq!(preset.portions.get(), 2);
        assert_eq!(preset.days, vec![DayOfWeek::Monday, DayOfWeek::Wednesday]);
    }
}
