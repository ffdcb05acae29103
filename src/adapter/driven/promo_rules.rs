use crate::domain::model::PromoRule;
use crate::domain::port::{PromoRuleSource, RepositoryError};
use async_trait::async_trait;
use std::collections::HashMap;

/// 設定で与えられたプロモーションルール
/// コードは正規化して保持する
pub struct StaticPromoRuleSource {
    rules: HashMap<String, PromoRule>,
}

impl StaticPromoRuleSource {
    pub fn new(rules: Vec<PromoRule>) -> Self {
        let rules = rules
            .into_iter()
            .filter_map(|rule| PromoRule::normalize_code(&rule.code).map(|code| (code, rule)))
            .collect();
        Self { rules }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl PromoRuleSource for StaticPromoRuleSource {
    async fn resolve(&self, code: &str) -> Result<Option<PromoRule>, RepositoryError> {
        Ok(PromoRule::normalize_code(code).and_then(|code| self.rules.get(&code).cloned()))
    }
}
