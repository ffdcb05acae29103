// ドメインサービス
// 複数の集約やポートにまたがるビジネスロジックを実装

mod capacity;
mod duplicate;
mod orderability;
mod planner;
mod pricing;
mod throttle;

pub use capacity::CapacityLedger;
pub use duplicate::{ActiveDuplicate, DuplicateResolver};
pub use orderability::OrderabilityPolicy;
pub use planner::{PlanError, PlanSynchronizer};
pub use pricing::{PricingCalculator, WeekSelections};
pub use throttle::{CreateThrottle, ThrottlePermit};
