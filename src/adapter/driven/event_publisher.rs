use crate::domain::event::DomainEvent;
use crate::domain::port::{EventPublisher, PublisherError};
use std::sync::Mutex;

/// ログ出力によるイベント発行者
/// 通知の配送は外部のサービスが担うため、ここでは構造化ログとして記録する
pub struct LoggingEventPublisher;

impl LoggingEventPublisher {
    /// 新しいイベント発行者を作成
    pub fn new() -> Self {
        Self
    }
}

impl Default for LoggingEventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl EventPublisher for LoggingEventPublisher {
    fn publish(&self, event: &DomainEvent) -> Result<(), PublisherError> {
        let payload = serde_json::to_string(event)
            .map_err(|e| PublisherError::PublishingFailed(e.to_string()))?;
        tracing::info!(
            target: "lunch_order_planning::events",
            event = event.name(),
            occurred_at = %event.occurred_at(),
            payload = %payload,
            "domain event"
        );
        Ok(())
    }
}

/// 発行されたイベントを保持する発行者
#[derive(Default)]
pub struct InMemoryEventPublisher {
    events: Mutex<Vec<DomainEvent>>,
}

impl InMemoryEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// 発行済みイベントのコピー
    pub fn events(&self) -> Vec<DomainEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// 発行済みイベント名（発行順）
    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(DomainEvent::name).collect()
    }
}

impl EventPublisher for InMemoryEventPublisher {
    fn publish(&self, event: &DomainEvent) -> Result<(), PublisherError> {
        self.events
            .lock()
            .map_err(|_| PublisherError::PublishingFailed("lock poisoned".to_string()))?
            .push(event.clone());
        Ok(())
    }
}
