use crate::domain::model::PlannerPreset;
use crate::domain::port::{PresetSource, RepositoryError};
use async_trait::async_trait;

/// 設定で与えられた計画の定型パターン
pub struct StaticPresetSource {
    presets: Vec<PlannerPreset>,
}

impl StaticPresetSource {
    /// 表示順（sort_order、同順ならスラッグ順）に並べて保持する
    pub fn new(mut presets: Vec<PlannerPreset>) -> Self {
        presets.sort_by(|a, b| (a.sort_order, &a.slug).cmp(&(b.sort_order, &b.slug)));
        Self { presets }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl PresetSource for StaticPresetSource {
    async fn list_active(&self) -> Result<Vec<PlannerPreset>, RepositoryError> {
        Ok(self.presets.iter().filter(|p| p.active).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{DayOfWeek, PortionCount};

    fn preset(slug: &str, sort_order: i32, active: bool) -> PlannerPreset {
        PlannerPreset {
            slug: slug.to_string(),
            title: slug.to_uppercase(),
            description: None,
            days: vec![DayOfWeek::Monday],
            portions: PortionCount::new(1).unwrap(),
            active,
            sort_order,
        }
    }

    #[tokio::test]
    async fn test_list_active_in_sort_order() {
        let source = StaticPresetSource::new(vec![
            preset("weekdays", 2, true),
            preset("hidden", 0, false),
            preset("mon-wed-fri", 1, true),
            preset("all-in", 1, true),
        ]);

        let slugs: Vec<String> = source
            .list_active()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.slug)
            .collect();
        assert_eq!(slugs, vec!["all-in", "mon-wed-fri", "weekdays"]);
        assert!(StaticPresetSource::empty().list_active().await.unwrap().is_empty());
    }
}
