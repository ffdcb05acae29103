// 駆動される側アダプター（リポジトリ実装など）

mod clock;
mod day_offer_repository;
mod event_publisher;
mod in_memory;
mod order_repository;
mod order_window_repository;
mod plan_template_repository;
mod presets;
mod promo_rules;
mod tracing_logger;

pub use clock::{FixedClock, SystemClock};
pub use day_offer_repository::MySqlDayOfferRepository;
pub use event_publisher::{InMemoryEventPublisher, LoggingEventPublisher};
pub use in_memory::{
    InMemoryDayOfferRepository, InMemoryOrderRepository, InMemoryOrderWindowRepository,
    InMemoryPlanTemplateRepository,
};
pub use order_repository::MySqlOrderRepository;
pub use order_window_repository::MySqlOrderWindowRepository;
pub use plan_template_repository::MySqlPlanTemplateRepository;
pub use presets::StaticPresetSource;
pub use promo_rules::StaticPromoRuleSource;
pub use tracing_logger::{render_context, RecordedLog, RecordingLogger, TracingLogger};
