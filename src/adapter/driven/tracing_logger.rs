use crate::domain::port::Logger;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// 追加コンテキストをキー順に "k=v, ..." 形式で並べる
pub fn render_context(context: &Option<HashMap<String, String>>) -> String {
    let Some(context) = context else {
        return String::new();
    };
    let mut pairs: Vec<(&String, &String)> = context.iter().collect();
    pairs.sort();
    pairs
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_correlation(correlation_id: Option<Uuid>) -> String {
    correlation_id.map(|id| id.to_string()).unwrap_or_default()
}

/// tracingによるログ実装
pub struct TracingLogger;

impl TracingLogger {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TracingLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger for TracingLogger {
    fn debug(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    ) {
        tracing::debug!(
            component,
            correlation_id = %render_correlation(correlation_id),
            context = %render_context(&context),
            "{}",
            message
        );
    }

    fn info(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    ) {
        tracing::info!(
            component,
            correlation_id = %render_correlation(correlation_id),
            context = %render_context(&context),
            "{}",
            message
        );
    }

    fn warn(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    ) {
        tracing::warn!(
            component,
            correlation_id = %render_correlation(correlation_id),
            context = %render_context(&context),
            "{}",
            message
        );
    }

    fn error(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    ) {
        tracing::error!(
            component,
            correlation_id = %render_correlation(correlation_id),
            context = %render_context(&context),
            "{}",
            message
        );
    }
}

/// 記録されたログ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedLog {
    pub level: &'static str,
    pub component: String,
    pub message: String,
    pub context: String,
}

/// 出力したログを保持するロガー（テスト用）
#[derive(Default)]
pub struct RecordingLogger {
    entries: Mutex<Vec<RecordedLog>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<RecordedLog> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// 指定レベルでメッセージに語句を含むログがあるか
    pub fn contains(&self, level: &str, needle: &str) -> bool {
        self.entries()
            .iter()
            .any(|e| e.level == level && e.message.contains(needle))
    }

    fn record(
        &self,
        level: &'static str,
        component: &str,
        message: &str,
        context: &Option<HashMap<String, String>>,
    ) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(RecordedLog {
                level,
                component: component.to_string(),
                message: message.to_string(),
                context: render_context(context),
            });
        }
    }
}

impl Logger for RecordingLogger {
    fn debug(&self, component: &str, message: &str, _: Option<Uuid>, context: Option<HashMap<String, String>>) {
        self.record("debug", component, message, &context);
    }

    fn info(&self, component: &str, message: &str, _: Option<Uuid>, context: Option<HashMap<String, String>>) {
        self.record("info", component, message, &context);
    }

    fn warn(&self, component: &str, message: &str, _: Option<Uuid>, context: Option<HashMap<String, String>>) {
        self.record("warn", component, message, &context);
    }

    fn error(&self, component: &str, message: &str, _: Option<Uuid>, context: Option<HashMap<String, String>>) {
        self.record("error", component, message, &context);
    }
}
