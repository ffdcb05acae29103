use crate::domain::model::{ClosedReason, DayOfWeek, OfferId, OrderId, WeekStart};
use crate::domain::port::RepositoryError;

/// ドメイン層のエラー型
/// ビジネスルール違反を表現する
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    /// 入力値の不正（曜日、ランチ数、住所など）
    /// 容量台帳に触れる前に拒否される
    #[error("Validation failed on {field}: {message}")]
    Validation { field: String, message: String },

    /// 対象の曜日・週は注文を受け付けていない
    #[error("Ordering is closed for {day} of week {week_start}: {reason}")]
    WindowClosed {
        day: DayOfWeek,
        week_start: WeekStart,
        reason: ClosedReason,
    },

    /// 容量不足（0件または一部のみ受付可能）
    #[error("Capacity exceeded for offer {offer_id}: requested {requested}, accepted {accepted}")]
    CapacityExceeded {
        offer_id: OfferId,
        requested: u32,
        accepted: u32,
    },

    /// 同じ顧客・曜日・週の有効な注文が既に存在する
    #[error("An active order {order_id} with {portions} portions already exists")]
    DuplicateOrder { order_id: OrderId, portions: u32 },

    /// 連続注文の抑止
    #[error("Too many order attempts, retry in {retry_after_seconds}s")]
    Throttled { retry_after_seconds: u64 },

    /// 無効な注文状態（例: キャンセル済みの注文を変更しようとした）
    #[error("Invalid order state: {0}")]
    InvalidOrderState(String),

    /// 操作権限がない
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// 内部不変条件の違反（欠陥の兆候）
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// 通貨の不一致
    #[error("Currency mismatch")]
    CurrencyMismatch,

    /// 永続化層のエラー
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl DomainError {
    /// 入力検証エラーを作成
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        DomainError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}
