use crate::adapter::database_config::{env_or, ConfigError};
use crate::application::service::EngineSettings;
use crate::domain::model::{Currency, PlannerPreset, PromoRule};
use crate::domain::service::{CreateThrottle, OrderabilityPolicy};
use chrono::{Duration, FixedOffset};
use std::env;

/// 永続化の方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    MySql,
    /// プロセス内のみ（再起動で消える）
    InMemory,
}

impl StorageBackend {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "mysql" => Ok(StorageBackend::MySql),
            "memory" => Ok(StorageBackend::InMemory),
            other => Err(ConfigError::InvalidValue(format!(
                "Invalid STORAGE_BACKEND: {} (expected mysql or memory)",
                other
            ))),
        }
    }
}

/// 注文エンジンの設定
/// 締め切り時刻・タイムゾーン・連続注文の待機時間・通貨・プロモーションルールなど
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub cutoff_hour: u32,
    /// UTCからの差（分）
    pub utc_offset_minutes: i32,
    pub create_cooldown_seconds: i64,
    pub currency: Currency,
    pub promo_rules: Vec<PromoRule>,
    pub planner_presets: Vec<PlannerPreset>,
    pub server_addr: String,
    pub storage: StorageBackend,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cutoff_hour: OrderabilityPolicy::DEFAULT_CUTOFF_HOUR,
            utc_offset_minutes: 240,
            create_cooldown_seconds: CreateThrottle::DEFAULT_COOLDOWN_SECONDS,
            currency: Currency::GEL,
            promo_rules: Vec::new(),
            planner_presets: Vec::new(),
            server_addr: "0.0.0.0:3000".to_string(),
            storage: StorageBackend::MySql,
        }
    }
}

impl EngineConfig {
    /// 環境変数から設定を読み取る
    /// 不正な値はどの変数かを示すエラーになる
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let currency = match env::var("ORDER_CURRENCY") {
            Ok(code) if !code.trim().is_empty() => Currency::from_code(&code)
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid ORDER_CURRENCY: {}", e)))?,
            _ => defaults.currency,
        };

        let promo_rules = match env::var("PROMO_RULES") {
            Ok(raw) if !raw.trim().is_empty() => Self::parse_promo_rules(&raw)?,
            _ => Vec::new(),
        };

        let planner_presets = match env::var("PLANNER_PRESETS") {
            Ok(raw) if !raw.trim().is_empty() => Self::parse_planner_presets(&raw)?,
            _ => Vec::new(),
        };

        let config = Self {
            cutoff_hour: env_or("ORDER_CUTOFF_HOUR", defaults.cutoff_hour)?,
            utc_offset_minutes: env_or("ORDER_UTC_OFFSET_MINUTES", defaults.utc_offset_minutes)?,
            create_cooldown_seconds: env_or(
                "ORDER_CREATE_COOLDOWN_SECONDS",
                defaults.create_cooldown_seconds,
            )?,
            currency,
            promo_rules,
            planner_presets,
            server_addr: env::var("SERVER_ADDR").unwrap_or(defaults.server_addr),
            storage: match env::var("STORAGE_BACKEND") {
                Ok(raw) if !raw.trim().is_empty() => StorageBackend::parse(&raw)?,
                _ => defaults.storage,
            },
        };
        // 組み立て可能かを起動時に確認する
        config.settings()?;
        Ok(config)
    }

    /// PROMO_RULES のJSON配列を読み取り、各ルールを検証する
    pub fn parse_promo_rules(raw: &str) -> Result<Vec<PromoRule>, ConfigError> {
        let rules: Vec<PromoRule> = serde_json::from_str(raw)
            .map_err(|e| ConfigError::InvalidValue(format!("Invalid PROMO_RULES: {}", e)))?;
        for rule in &rules {
            rule.validate().map_err(|e| {
                ConfigError::InvalidValue(format!("Invalid PROMO_RULES ({}): {}", rule.code, e))
            })?;
        }
        Ok(rules)
    }

    /// PLANNER_PRESETS のJSON配列を読み取る。スラッグの重複は不可
    pub fn parse_planner_presets(raw: &str) -> Result<Vec<PlannerPreset>, ConfigError> {
        let presets: Vec<PlannerPreset> = serde_json::from_str(raw)
            .map_err(|e| ConfigError::InvalidValue(format!("Invalid PLANNER_PRESETS: {}", e)))?;
        let mut seen = std::collections::HashSet::new();
        for preset in &presets {
            preset.validate().map_err(|e| {
                ConfigError::InvalidValue(format!("Invalid PLANNER_PRESETS ({}): {}", preset.slug, e))
            })?;
            if !seen.insert(preset.slug.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "Invalid PLANNER_PRESETS: duplicate slug {}",
                    preset.slug
                )));
            }
        }
        Ok(presets)
    }

    pub fn utc_offset(&self) -> Result<FixedOffset, ConfigError> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                ConfigError::InvalidValue(format!(
                    "Invalid ORDER_UTC_OFFSET_MINUTES: {}",
                    self.utc_offset_minutes
                ))
            })
    }

    /// アプリケーションサービス向けの設定に変換する
    pub fn settings(&self) -> Result<EngineSettings, ConfigError> {
        let policy = OrderabilityPolicy::new(self.cutoff_hour, self.utc_offset()?).map_err(|e| {
            ConfigError::InvalidValue(format!("Invalid ORDER_CUTOFF_HOUR: {}", e))
        })?;
        if self.create_cooldown_seconds < 0 {
            return Err(ConfigError::InvalidValue(format!(
                "Invalid ORDER_CREATE_COOLDOWN_SECONDS: {}",
                self.create_cooldown_seconds
            )));
        }
        Ok(EngineSettings {
            policy,
            create_cooldown: Duration::seconds(self.create_cooldown_seconds),
            currency: self.currency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::PromoDiscount;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const VARS: [&str; 8] = [
        "ORDER_CUTOFF_HOUR",
        "ORDER_UTC_OFFSET_MINUTES",
        "ORDER_CREATE_COOLDOWN_SECONDS",
        "ORDER_CURRENCY",
        "PROMO_RULES",
        "PLANNER_PRESETS",
        "SERVER_ADDR",
        "STORAGE_BACKEND",
    ];

    fn clear() {
        for name in VARS {
            env::remove_var(name);
        }
    }

    #[test]
    fn test_defaults() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear();

        let config = EngineConfig::from_env().unwrap();
        let settings = config.settings().unwrap();

        assert_eq!(settings.policy.cutoff_hour(), 10);
        assert_eq!(settings.policy.utc_offset().local_minus_utc(), 4 * 3600);
        assert_eq!(settings.create_cooldown, Duration::seconds(10));
        assert_eq!(settings.currency, Currency::GEL);
        assert!(config.promo_rules.is_empty());
        assert!(config.planner_presets.is_empty());
        assert_eq!(config.server_addr, "0.0.0.0:3000");
        assert_eq!(config.storage, StorageBackend::MySql);
    }

    #[test]
    fn test_from_env_overrides() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear();
        env::set_var("ORDER_CUTOFF_HOUR", "9");
        env::set_var("ORDER_UTC_OFFSET_MINUTES", "-300");
        env::set_var("ORDER_CURRENCY", "usd");
        env::set_var("STORAGE_BACKEND", "Memory");
        env::set_var(
            "PROMO_RULES",
            r#"[{"code":"lunch10","discount":{"kind":"percentage","value":10},"min_weeks":2}]"#,
        );

        let config = EngineConfig::from_env();
        clear();
        let config = config.unwrap();

        assert_eq!(config.cutoff_hour, 9);
        assert_eq!(config.utc_offset().unwrap().local_minus_utc(), -5 * 3600);
        assert_eq!(config.currency, Currency::USD);
        assert_eq!(config.storage, StorageBackend::InMemory);
        assert_eq!(config.promo_rules.len(), 1);
        assert_eq!(config.promo_rules[0].discount, PromoDiscount::Percentage(10));
        assert_eq!(config.promo_rules[0].min_weeks, Some(2));
        assert!(config.promo_rules[0].active);
    }

    #[test]
    fn test_invalid_values_name_the_variable() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear();

        env::set_var("ORDER_CUTOFF_HOUR", "24");
        let err = EngineConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("ORDER_CUTOFF_HOUR"));
        clear();

        env::set_var("ORDER_CURRENCY", "JPY");
        let err = EngineConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("ORDER_CURRENCY"));
        clear();

        env::set_var(
            "PROMO_RULES",
            r#"[{"code":"BAD","discount":{"kind":"percentage","value":0}}]"#,
        );
        let err = EngineConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("PROMO_RULES"));
        clear();
    }

    #[test]
    fn test_planner_presets() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear();
        env::set_var(
            "PLANNER_PRESETS",
            r#"[{"slug":"weekdays","title":"Каждый будний день","days":["monday","tuesday","wednesday","thursday","friday"],"portions":1,"sort_order":1},
                {"slug":"mon-wed","title":"Пн и Ср","days":["monday","wednesday"],"portions":2,"active":false}]"#,
        );
        let config = EngineConfig::from_env();
        clear();
        let config = config.unwrap();
        assert_eq!(config.planner_presets.len(), 2);
        assert_eq!(config.planner_presets[0].days.len(), 5);
        assert!(!config.planner_presets[1].active);

        env::set_var(
            "PLANNER_PRESETS",
            r#"[{"slug":"twice","title":"A","days":["monday"],"portions":1},
                {"slug":"twice","title":"B","days":["friday"],"portions":1}]"#,
        );
        let err = EngineConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("duplicate slug"));
        clear();

        env::set_var(
            "PLANNER_PRESETS",
            r#"[{"slug":"heavy","title":"A","days":["monday"],"portions":5}]"#,
        );
        let err = EngineConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("PLANNER_PRESETS"));
        clear();
    }
}
