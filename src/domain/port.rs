// 出力ポート
// ドメイン層が外部に依存する機能をトレイトとして定義
// アダプター層でこれらのトレイトを実装する

use crate::domain::event::DomainEvent;
use crate::domain::model::{
    CustomerId, DayOfWeek, DayOffer, OfferId, Order, OrderId, OrderStatus, OrderWindow,
    PlanTemplate, PlanTemplateId, PlannerPreset, PromoRule, ReleaseOutcome, WeekStart,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

/// ロガートレイト
/// ログ出力を抽象化するポート
pub trait Logger: Send + Sync {
    /// デバッグレベルのログを出力
    fn debug(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    );

    /// 情報レベルのログを出力
    fn info(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    );

    /// 警告レベルのログを出力
    fn warn(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    );

    /// エラーレベルのログを出力
    fn error(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    );
}

/// リポジトリエラー型
/// リポジトリ操作で発生するエラーを表現する
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RepositoryError {
    /// データベース接続に失敗
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    /// 操作に失敗
    #[error("Operation failed: {0}")]
    OperationFailed(String),
    /// データの取得に失敗
    #[error("Fetch failed: {0}")]
    FetchFailed(String),
    /// 対象が存在しない
    #[error("Not found: {0}")]
    NotFound(String),
    /// 一意制約違反（同じ顧客・曜日・週の有効な注文など）
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),
    /// その他の整合性制約違反
    #[error("Constraint violated: {0}")]
    ConstraintViolated(String),
}

/// 注文リポジトリトレイト
/// 注文集約の永続化を抽象化する
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// 新しい一意の注文IDを生成する
    fn next_identity(&self) -> OrderId;

    /// 新しい注文を登録する
    ///
    /// 同じ顧客・曜日・週に有効な注文が既にある場合は
    /// `RepositoryError::UniqueViolation` を返す（コミット時点で判定される）
    async fn insert(&self, order: &Order) -> Result<(), RepositoryError>;

    /// 既存の注文を更新する
    ///
    /// 保存済みの updated_at が `expected_updated_at` と一致する場合のみ更新する（楽観的排他）
    ///
    /// # Returns
    /// * `Err(RepositoryError::NotFound)` - 注文が存在しない
    /// * `Err(RepositoryError::ConstraintViolated)` - 読み込み後に他の操作で更新された
    async fn save(
        &self,
        order: &Order,
        expected_updated_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// 注文IDで注文を検索する
    async fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// 顧客・曜日・週が一致する有効な注文を取得する
    /// 通常は0件か1件。作成日時の降順で返す
    async fn find_active(
        &self,
        customer_id: CustomerId,
        day: DayOfWeek,
        week_start: WeekStart,
    ) -> Result<Vec<Order>, RepositoryError>;

    /// 顧客の注文を作成日時の降順で取得する
    async fn find_by_customer(&self, customer_id: CustomerId)
        -> Result<Vec<Order>, RepositoryError>;

    /// 週の注文を曜日・作成日時の順で取得する
    ///
    /// # Arguments
    /// * `status` - 指定した場合はそのステータスの注文のみ
    async fn find_by_week(
        &self,
        week_start: WeekStart,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, RepositoryError>;
}

/// 日別オファーリポジトリトレイト
/// 受付済みランチ数の変更はreserve/releaseのみで行う
#[async_trait]
pub trait DayOfferRepository: Send + Sync {
    /// オファーを登録または更新する（週×曜日で一意）
    /// 受付済みランチ数は既存の値を維持する
    async fn upsert(&self, offer: &DayOffer) -> Result<DayOffer, RepositoryError>;

    async fn find_by_id(&self, offer_id: OfferId) -> Result<Option<DayOffer>, RepositoryError>;

    async fn find_by_week_and_day(
        &self,
        week_start: WeekStart,
        day: DayOfWeek,
    ) -> Result<Option<DayOffer>, RepositoryError>;

    /// 週のオファーを曜日順で取得する
    async fn find_by_week(&self, week_start: WeekStart) -> Result<Vec<DayOffer>, RepositoryError>;

    /// 受付可能な分だけ原子的に予約し、受け付けた数を返す
    ///
    /// 同じオファーへの同時予約があっても受付上限を超えない
    async fn reserve(&self, offer_id: OfferId, requested: u32) -> Result<u32, RepositoryError>;

    /// 予約を原子的に解放する
    /// 受付済み数は0未満にならず、超過分はoutcomeで報告される
    async fn release(
        &self,
        offer_id: OfferId,
        portions: u32,
    ) -> Result<ReleaseOutcome, RepositoryError>;

    /// 受付上限を変更する
    ///
    /// # Returns
    /// * `Err(RepositoryError::ConstraintViolated)` - 受付済み数を下回る上限
    async fn set_capacity(
        &self,
        offer_id: OfferId,
        limit: Option<u32>,
    ) -> Result<DayOffer, RepositoryError>;
}

/// 受付窓口リポジトリトレイト
#[async_trait]
pub trait OrderWindowRepository: Send + Sync {
    /// 保存された窓口を取得する。未設定なら閉じた窓口
    async fn get(&self) -> Result<OrderWindow, RepositoryError>;

    async fn set(&self, window: &OrderWindow) -> Result<(), RepositoryError>;
}

/// 確定した計画のリポジトリトレイト
/// 計画は登録後に変更されない
#[async_trait]
pub trait PlanTemplateRepository: Send + Sync {
    fn next_identity(&self) -> PlanTemplateId;

    /// 計画と全週を1つのトランザクションで登録する
    async fn insert(&self, template: &PlanTemplate) -> Result<(), RepositoryError>;

    async fn find_by_id(
        &self,
        template_id: PlanTemplateId,
    ) -> Result<Option<PlanTemplate>, RepositoryError>;

    /// 顧客の計画を作成日時の降順で取得する
    async fn find_by_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<PlanTemplate>, RepositoryError>;
}

/// プロモーションルールの参照
#[async_trait]
pub trait PromoRuleSource: Send + Sync {
    /// 正規化済みのコードでルールを検索する
    async fn resolve(&self, code: &str) -> Result<Option<PromoRule>, RepositoryError>;
}

/// 計画の定型パターンの参照
#[async_trait]
pub trait PresetSource: Send + Sync {
    /// 有効なパターンを表示順で取得する
    async fn list_active(&self) -> Result<Vec<PlannerPreset>, RepositoryError>;
}

/// 時計
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// イベント発行エラー
#[derive(Debug, thiserror::Error)]
pub enum PublisherError {
    #[error("Event publishing failed: {0}")]
    PublishingFailed(String),
}

/// イベント発行トレイト
/// コミット後のドメインイベントを外部へ通知するポート
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: &DomainEvent) -> Result<(), PublisherError>;
}
