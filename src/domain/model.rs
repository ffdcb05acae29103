// ドメインモデル（エンティティと値オブジェクト）

mod day_offer;
mod order;
mod order_window;
mod plan;
mod plan_template;
mod preset;
mod promo;
mod quote;
mod value_objects;

pub use value_objects::{
    Actor, Currency, CustomerId, DayOfWeek, DeliveryAddress, Money, OfferId, OrderId,
    OrderStatus, PhoneNumber, PortionCount, WeekStart,
};

pub use day_offer::{CapacityCheck, DayOffer, ReleaseOutcome};
pub use order::{NewOrder, Order, OrderRecord};
pub use order_window::{ClosedReason, OrderWindow, Orderability};
pub use plan::{PlanEdit, PlanSelection, PlanWeek, PlannerState};
pub use plan_template::{PlanTemplate, PlanTemplateId, PlanTemplateRecord, PlanTemplateWeek};
pub use preset::PlannerPreset;
pub use promo::{PromoDiscount, PromoRejection, PromoRule};
pub use quote::{LineStatus, MenuStatus, Quote, QuoteLine, WeekQuote};
