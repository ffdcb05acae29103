use crate::application::ApplicationError;
use crate::domain::error::DomainError;
use crate::domain::event::{CapacityChanged, DomainEvent, OrderWindowChanged};
use crate::domain::model::{
    Actor, Currency, CustomerId, DayOfWeek, DayOffer, DeliveryAddress, Money, NewOrder, OfferId,
    Order, OrderId, OrderWindow, Orderability, PhoneNumber, PlanEdit, PlanTemplate, PlannerState,
    PortionCount, Quote, WeekStart,
};
use crate::domain::port::{
    Clock, DayOfferRepository, EventPublisher, Logger, OrderRepository, OrderWindowRepository,
    PlanTemplateRepository, PresetSource, PromoRuleSource, RepositoryError,
};
use crate::domain::service::{
    ActiveDuplicate, CapacityLedger, CreateThrottle, DuplicateResolver, OrderabilityPolicy,
    PlanSynchronizer, PricingCalculator, WeekSelections,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

mod offer_query_service;
mod order_query_service;
mod plan_query_service;

pub use offer_query_service::OfferQueryService;
pub use order_query_service::OrderQueryService;
pub use plan_query_service::PlanQueryService;

/// アプリケーションサービスが利用する出力ポート一式
#[derive(Clone)]
pub struct EnginePorts {
    pub order_repository: Arc<dyn OrderRepository>,
    pub offer_repository: Arc<dyn DayOfferRepository>,
    pub window_repository: Arc<dyn OrderWindowRepository>,
    pub template_repository: Arc<dyn PlanTemplateRepository>,
    pub promo_source: Arc<dyn PromoRuleSource>,
    pub preset_source: Arc<dyn PresetSource>,
    pub clock: Arc<dyn Clock>,
    pub publisher: Arc<dyn EventPublisher>,
    pub logger: Arc<dyn Logger>,
}

/// デプロイごとの業務設定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub policy: OrderabilityPolicy,
    pub create_cooldown: Duration,
    pub currency: Currency,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            policy: OrderabilityPolicy::default(),
            create_cooldown: Duration::seconds(CreateThrottle::DEFAULT_COOLDOWN_SECONDS),
            currency: Currency::GEL,
        }
    }
}

/// 同じ顧客・曜日・週の有効な注文がある場合の扱い
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// 重複エラーを返し、利用者に選択させる
    #[default]
    Reject,
    /// 既存の注文にランチ数を合算する
    Merge,
}

/// 注文作成コマンド
#[derive(Debug, Clone)]
pub struct CreateOrderCommand {
    pub customer_id: CustomerId,
    pub day: DayOfWeek,
    /// Noneの場合は注文可能な週を自動で選ぶ
    pub week_start: Option<WeekStart>,
    pub portions: PortionCount,
    pub address: DeliveryAddress,
    pub phone: PhoneNumber,
    /// 容量不足の場合に受付可能な数で確定してよいか
    pub accept_partial: bool,
    pub on_duplicate: DuplicatePolicy,
}

/// 注文作成の結果
#[derive(Debug, Clone)]
pub struct CreateOrderOutcome {
    pub order: Order,
    pub requested_portions: u32,
    pub accepted_portions: u32,
    /// 既存の注文に統合した
    pub merged: bool,
}

/// 注文変更コマンド
#[derive(Debug, Clone)]
pub struct UpdateOrderCommand {
    pub portions: Option<PortionCount>,
    pub address: Option<DeliveryAddress>,
}

/// 注文キャンセルの結果
#[derive(Debug, Clone)]
pub struct CancelOrderOutcome {
    pub order: Order,
    /// 既にキャンセル済みだった（何も変更していない）
    pub already_cancelled: bool,
}

/// 計画編集の結果
#[derive(Debug, Clone, Serialize)]
pub struct PlanOutcome {
    pub state: PlannerState,
    /// 週ごとの直接編集の可否
    pub editable: Vec<bool>,
}

/// 計画チェックアウトコマンド
#[derive(Debug, Clone)]
pub struct CheckoutPlanCommand {
    pub customer_id: CustomerId,
    pub state: PlannerState,
    pub address: DeliveryAddress,
    pub phone: PhoneNumber,
    pub promo_code: Option<String>,
}

/// 日別オファー公開コマンド
#[derive(Debug, Clone)]
pub struct PublishOfferCommand {
    pub week_start: WeekStart,
    pub day: DayOfWeek,
    pub dishes: Vec<String>,
    pub unit_price: i64,
    pub capacity_limit: Option<u32>,
}

fn context(pairs: &[(&str, String)]) -> Option<HashMap<String, String>> {
    Some(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect(),
    )
}

fn publish_events(
    publisher: &dyn EventPublisher,
    logger: &dyn Logger,
    component: &str,
    events: Vec<DomainEvent>,
    correlation_id: Uuid,
) {
    for event in events {
        // コミット済みの変更は取り消さない
        if let Err(e) = publisher.publish(&event) {
            logger.error(
                component,
                "Failed to publish domain event",
                Some(correlation_id),
                context(&[
                    ("event", event.name().to_string()),
                    ("error", e.to_string()),
                ]),
            );
        }
    }
}

/// 注文アプリケーションサービス
/// 注文可否・重複・容量・見積もりを組み合わせて注文のライフサイクルを制御する
pub struct OrderApplicationService {
    order_repository: Arc<dyn OrderRepository>,
    offer_repository: Arc<dyn DayOfferRepository>,
    window_repository: Arc<dyn OrderWindowRepository>,
    template_repository: Arc<dyn PlanTemplateRepository>,
    ledger: CapacityLedger,
    duplicates: DuplicateResolver,
    pricing: PricingCalculator,
    throttle: CreateThrottle,
    policy: OrderabilityPolicy,
    clock: Arc<dyn Clock>,
    publisher: Arc<dyn EventPublisher>,
    logger: Arc<dyn Logger>,
}

const ORDER_COMPONENT: &str = "OrderApplicationService";

impl OrderApplicationService {
    /// 新しいアプリケーションサービスを作成
    ///
    /// # Arguments
    /// * `ports` - リポジトリ・時計・ロガーなどの出力ポート
    /// * `settings` - 締め切り時刻・連続注文の待機時間・通貨
    pub fn new(ports: &EnginePorts, settings: EngineSettings) -> Self {
        Self {
            order_repository: ports.order_repository.clone(),
            offer_repository: ports.offer_repository.clone(),
            window_repository: ports.window_repository.clone(),
            template_repository: ports.template_repository.clone(),
            ledger: CapacityLedger::new(ports.offer_repository.clone()),
            duplicates: DuplicateResolver::new(ports.order_repository.clone()),
            pricing: PricingCalculator::new(
                ports.offer_repository.clone(),
                ports.window_repository.clone(),
                ports.promo_source.clone(),
                settings.policy,
                settings.currency,
                ports.logger.clone(),
            ),
            throttle: CreateThrottle::new(settings.create_cooldown),
            policy: settings.policy,
            clock: ports.clock.clone(),
            publisher: ports.publisher.clone(),
            logger: ports.logger.clone(),
        }
    }

    /// 曜日・週の注文可否を取得
    /// 週を省略した場合は注文可能な週を自動で選ぶ
    pub async fn get_orderability(
        &self,
        day: DayOfWeek,
        week_start: Option<WeekStart>,
    ) -> Result<Orderability, ApplicationError> {
        let now = self.clock.now();
        let window = self.window_repository.get().await?;
        Ok(match week_start {
            Some(week) => self.policy.evaluate(day, week, now, &window),
            None => self.policy.resolve_target_week(day, now, &window),
        })
    }

    /// 週の全営業日の注文可否を取得
    pub async fn get_week_orderability(
        &self,
        week_start: WeekStart,
    ) -> Result<Vec<Orderability>, ApplicationError> {
        let now = self.clock.now();
        let window = self.window_repository.get().await?;
        Ok(self.policy.week_summary(week_start, now, &window))
    }

    /// 週ごとの選択から見積もりを計算
    /// 容量の予約は行わない
    pub async fn quote(
        &self,
        weeks: &[WeekSelections],
        promo_code: Option<&str>,
    ) -> Result<Quote, ApplicationError> {
        let now = self.clock.now();
        Ok(self.pricing.calculate(weeks, promo_code, now).await?)
    }

    /// 複数週の計画から見積もりを計算
    pub async fn quote_plan(
        &self,
        state: &PlannerState,
        promo_code: Option<&str>,
    ) -> Result<Quote, ApplicationError> {
        let normalized = PlanSynchronizer::normalize(state);
        self.quote(&WeekSelections::from_plan(&normalized), promo_code)
            .await
    }

    /// 計画に編集を適用する（永続化しない）
    pub fn apply_plan_edits(
        &self,
        state: &PlannerState,
        edits: &[PlanEdit],
    ) -> Result<PlanOutcome, ApplicationError> {
        let state = PlanSynchronizer::apply_all(state, edits)?;
        let editable = (0..state.weeks.len())
            .map(|week| PlanSynchronizer::is_week_editable(&state, week))
            .collect();
        Ok(PlanOutcome { state, editable })
    }

    /// 複数週の計画を確定する
    ///
    /// 計画を正規化して見積もり直し、その金額で保存する。
    /// 容量の予約は行わない（週ごとの注文作成時に予約される）
    ///
    /// # Returns
    /// * `Err(DomainError::Validation)` - 受け付けられるランチが1件もない
    pub async fn checkout_plan(
        &self,
        command: CheckoutPlanCommand,
    ) -> Result<PlanTemplate, ApplicationError> {
        let correlation_id = Uuid::new_v4();
        let now = self.clock.now();
        let normalized = PlanSynchronizer::normalize(&command.state);
        let quote = self
            .pricing
            .calculate(
                &WeekSelections::from_plan(&normalized),
                command.promo_code.as_deref(),
                now,
            )
            .await?;

        let mut template = match PlanTemplate::check_out(
            self.template_repository.next_identity(),
            command.customer_id,
            &normalized,
            &quote,
            command.address,
            command.phone,
            now,
        ) {
            Ok(template) => template,
            Err(e) => {
                self.logger.info(
                    ORDER_COMPONENT,
                    "Plan checkout rejected",
                    Some(correlation_id),
                    context(&[
                        ("customer_id", command.customer_id.to_string()),
                        ("error", e.to_string()),
                    ]),
                );
                return Err(e.into());
            }
        };

        let events = template.take_domain_events();
        self.template_repository.insert(&template).await?;

        self.logger.info(
            ORDER_COMPONENT,
            "Plan checked out",
            Some(correlation_id),
            context(&[
                ("template_id", template.id().to_string()),
                ("customer_id", template.customer_id().to_string()),
                ("weeks", template.weeks().len().to_string()),
                ("billable_weeks", template.billable_weeks().to_string()),
                ("total", template.total().amount().to_string()),
            ]),
        );
        publish_events(
            &*self.publisher,
            &*self.logger,
            ORDER_COMPONENT,
            events,
            correlation_id,
        );

        Ok(template)
    }

    /// 重複する有効な注文を取得
    pub async fn get_active_duplicate(
        &self,
        customer_id: CustomerId,
        day: DayOfWeek,
        week_start: WeekStart,
    ) -> Result<Option<Order>, ApplicationError> {
        let found = self
            .duplicates
            .find_active(customer_id, day, week_start)
            .await?;
        if let Some(duplicate) = &found {
            self.report_duplicate_anomaly(duplicate, None);
        }
        Ok(found.map(|d| d.order))
    }

    /// 新しい注文を作成
    ///
    /// 手順: 注文可否 → 重複 → 連続注文 → 容量予約 → 登録
    /// 登録に失敗した場合は予約を解放し、操作前の状態に戻す
    ///
    /// # Returns
    /// * `Ok(CreateOrderOutcome)` - 作成（または統合）された注文
    /// * `Err(ApplicationError)` - 作成失敗
    pub async fn create_order(
        &self,
        command: CreateOrderCommand,
    ) -> Result<CreateOrderOutcome, ApplicationError> {
        let correlation_id = Uuid::new_v4();
        let now = self.clock.now();
        let window = self.window_repository.get().await?;

        let orderability = match command.week_start {
            Some(week) => self.policy.evaluate(command.day, week, now, &window),
            None => self
                .policy
                .resolve_target_week(command.day, now, &window),
        };
        if let Err(e) = orderability.ensure_open() {
            self.logger.info(
                ORDER_COMPONENT,
                "Order rejected: ordering is closed",
                Some(correlation_id),
                context(&[
                    ("customer_id", command.customer_id.to_string()),
                    ("day", command.day.to_string()),
                    ("week_start", orderability.week_start.to_string()),
                ]),
            );
            return Err(e.into());
        }
        let week_start = orderability.week_start;

        if let Some(duplicate) = self
            .duplicates
            .find_active(command.customer_id, command.day, week_start)
            .await?
        {
            self.report_duplicate_anomaly(&duplicate, Some(correlation_id));
            return match command.on_duplicate {
                DuplicatePolicy::Reject => Err(duplicate.to_error().into()),
                DuplicatePolicy::Merge => {
                    self.merge_into(duplicate.order, &command, now, correlation_id)
                        .await
                }
            };
        }

        // 確認と記録は同時に行う。以降で失敗した場合は破棄時に取り消される
        let permit = self.throttle.try_acquire(command.customer_id, now)?;

        let offer = self
            .offer_repository
            .find_by_week_and_day(week_start, command.day)
            .await?
            .ok_or_else(|| {
                DomainError::validation(
                    "day",
                    format!("{} {} のメニューは公開されていません", week_start, command.day),
                )
            })?;

        let requested = command.portions.get();
        let accepted = self
            .reserve_for(&offer, requested, command.accept_partial, correlation_id)
            .await?;

        let mut order = Order::place(
            self.order_repository.next_identity(),
            NewOrder {
                customer_id: command.customer_id,
                offer_id: offer.id(),
                day: command.day,
                week_start,
                portions: PortionCount::new(accepted)?,
                address: command.address.clone(),
                phone: command.phone.clone(),
                menu_snapshot: offer.dishes().to_vec(),
            },
            now,
        );

        if let Err(e) = self.order_repository.insert(&order).await {
            self.compensate_release(offer.id(), accepted, correlation_id)
                .await;
            return Err(self
                .insert_conflict(e, &command, week_start, correlation_id)
                .await);
        }

        permit.commit();
        self.logger.info(
            ORDER_COMPONENT,
            "Order placed",
            Some(correlation_id),
            context(&[
                ("order_id", order.id().to_string()),
                ("customer_id", order.customer_id().to_string()),
                ("day", order.day().to_string()),
                ("week_start", week_start.to_string()),
                ("requested", requested.to_string()),
                ("accepted", accepted.to_string()),
            ]),
        );
        publish_events(
            &*self.publisher,
            &*self.logger,
            ORDER_COMPONENT,
            order.take_domain_events(),
            correlation_id,
        );

        Ok(CreateOrderOutcome {
            order,
            requested_portions: requested,
            accepted_portions: accepted,
            merged: false,
        })
    }

    /// 注文のランチ数・住所を変更
    /// ランチ数を増やす場合は差分のみ容量を予約し、減らす場合は差分を解放する
    pub async fn update_order(
        &self,
        order_id: OrderId,
        actor: Actor,
        command: UpdateOrderCommand,
    ) -> Result<Order, ApplicationError> {
        let correlation_id = Uuid::new_v4();
        let now = self.clock.now();
        let mut order = self.load_order(order_id).await?;
        let loaded_at = order.updated_at();
        let previous = order.portions().get();

        order.update(&actor, command.portions, command.address, now)?;
        let current = order.portions().get();

        if current > previous {
            let delta = current - previous;
            let accepted = self.ledger.reserve(order.offer_id(), delta).await?;
            if accepted < delta {
                self.compensate_release(order.offer_id(), accepted, correlation_id)
                    .await;
                return Err(DomainError::CapacityExceeded {
                    offer_id: order.offer_id(),
                    requested: delta,
                    accepted,
                }
                .into());
            }
        }

        if let Err(e) = self.order_repository.save(&order, loaded_at).await {
            if current > previous {
                self.compensate_release(order.offer_id(), current - previous, correlation_id)
                    .await;
            }
            return Err(Self::save_conflict(e));
        }

        if current < previous {
            self.release_logged(order.offer_id(), previous - current, order.id(), correlation_id)
                .await;
        }

        self.logger.info(
            ORDER_COMPONENT,
            "Order updated",
            Some(correlation_id),
            context(&[
                ("order_id", order.id().to_string()),
                ("previous_portions", previous.to_string()),
                ("portions", current.to_string()),
            ]),
        );
        publish_events(
            &*self.publisher,
            &*self.logger,
            ORDER_COMPONENT,
            order.take_domain_events(),
            correlation_id,
        );
        Ok(order)
    }

    /// 注文をキャンセル
    /// キャンセル済みの注文に対しては何もせず現在の状態を返す
    pub async fn cancel_order(
        &self,
        order_id: OrderId,
        actor: Actor,
    ) -> Result<CancelOrderOutcome, ApplicationError> {
        let correlation_id = Uuid::new_v4();
        let now = self.clock.now();
        let mut order = self.load_order(order_id).await?;
        let loaded_at = order.updated_at();

        if !order.cancel(&actor, now)? {
            return Ok(CancelOrderOutcome {
                order,
                already_cancelled: true,
            });
        }

        if let Err(e) = self.order_repository.save(&order, loaded_at).await {
            if matches!(e, RepositoryError::ConstraintViolated(_)) {
                // 同時にキャンセルされた場合は最新の状態を返す
                let latest = self.load_order(order_id).await?;
                if !latest.is_active() {
                    return Ok(CancelOrderOutcome {
                        order: latest,
                        already_cancelled: true,
                    });
                }
            }
            return Err(Self::save_conflict(e));
        }

        self.release_logged(
            order.offer_id(),
            order.portions().get(),
            order.id(),
            correlation_id,
        )
        .await;

        self.logger.info(
            ORDER_COMPONENT,
            "Order cancelled",
            Some(correlation_id),
            context(&[
                ("order_id", order.id().to_string()),
                ("status", order.status().to_string()),
                ("portions", order.portions().to_string()),
            ]),
        );
        publish_events(
            &*self.publisher,
            &*self.logger,
            ORDER_COMPONENT,
            order.take_domain_events(),
            correlation_id,
        );
        Ok(CancelOrderOutcome {
            order,
            already_cancelled: false,
        })
    }

    /// 既存の有効な注文にランチ数を合算する
    async fn merge_into(
        &self,
        mut order: Order,
        command: &CreateOrderCommand,
        now: DateTime<Utc>,
        correlation_id: Uuid,
    ) -> Result<CreateOrderOutcome, ApplicationError> {
        let loaded_at = order.updated_at();
        // 合算後の範囲を容量に触れる前に検証する
        order.portions().checked_add(command.portions)?;

        let offer = self
            .offer_repository
            .find_by_id(order.offer_id())
            .await?
            .ok_or_else(|| {
                DomainError::InvariantViolation(format!(
                    "order {} references missing offer {}",
                    order.id(),
                    order.offer_id()
                ))
            })?;

        let requested = command.portions.get();
        let accepted = self
            .reserve_for(&offer, requested, command.accept_partial, correlation_id)
            .await?;

        order.merge_portions(PortionCount::new(accepted)?, now)?;
        if let Err(e) = self.order_repository.save(&order, loaded_at).await {
            self.compensate_release(offer.id(), accepted, correlation_id)
                .await;
            return Err(Self::save_conflict(e));
        }

        self.logger.info(
            ORDER_COMPONENT,
            "Duplicate order merged",
            Some(correlation_id),
            context(&[
                ("order_id", order.id().to_string()),
                ("added", accepted.to_string()),
                ("portions", order.portions().to_string()),
            ]),
        );
        publish_events(
            &*self.publisher,
            &*self.logger,
            ORDER_COMPONENT,
            order.take_domain_events(),
            correlation_id,
        );
        Ok(CreateOrderOutcome {
            order,
            requested_portions: requested,
            accepted_portions: accepted,
            merged: true,
        })
    }

    /// 容量を予約する
    /// 1件も受け付けられない場合、または一部のみで確定が許可されていない場合は
    /// 予約を解放して容量エラーを返す
    async fn reserve_for(
        &self,
        offer: &DayOffer,
        requested: u32,
        accept_partial: bool,
        correlation_id: Uuid,
    ) -> Result<u32, ApplicationError> {
        let accepted = self.ledger.reserve(offer.id(), requested).await?;
        if accepted == 0 || (accepted < requested && !accept_partial) {
            self.compensate_release(offer.id(), accepted, correlation_id)
                .await;
            self.logger.info(
                ORDER_COMPONENT,
                "Order rejected: capacity exceeded",
                Some(correlation_id),
                context(&[
                    ("offer_id", offer.id().to_string()),
                    ("requested", requested.to_string()),
                    ("accepted", accepted.to_string()),
                ]),
            );
            return Err(DomainError::CapacityExceeded {
                offer_id: offer.id(),
                requested,
                accepted,
            }
            .into());
        }
        Ok(accepted)
    }

    /// 登録失敗の原因を呼び出し側向けのエラーに変換する
    /// 一意制約違反は同時に作成された重複注文として扱う
    async fn insert_conflict(
        &self,
        error: RepositoryError,
        command: &CreateOrderCommand,
        week_start: WeekStart,
        correlation_id: Uuid,
    ) -> ApplicationError {
        if !matches!(error, RepositoryError::UniqueViolation(_)) {
            self.logger.error(
                ORDER_COMPONENT,
                "Failed to persist order",
                Some(correlation_id),
                context(&[("error", error.to_string())]),
            );
            return error.into();
        }
        self.logger.warn(
            ORDER_COMPONENT,
            "Concurrent duplicate detected at commit",
            Some(correlation_id),
            context(&[
                ("customer_id", command.customer_id.to_string()),
                ("day", command.day.to_string()),
                ("week_start", week_start.to_string()),
            ]),
        );
        match self
            .duplicates
            .find_active(command.customer_id, command.day, week_start)
            .await
        {
            Ok(Some(duplicate)) => duplicate.to_error().into(),
            Ok(None) => error.into(),
            Err(e) => e.into(),
        }
    }

    fn save_conflict(error: RepositoryError) -> ApplicationError {
        match error {
            RepositoryError::ConstraintViolated(_) => DomainError::InvalidOrderState(
                "注文が他の操作によって更新されました。再度お試しください".to_string(),
            )
            .into(),
            other => other.into(),
        }
    }

    async fn load_order(&self, order_id: OrderId) -> Result<Order, ApplicationError> {
        self.order_repository
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| ApplicationError::NotFound(format!("注文が見つかりません: {}", order_id)))
    }

    /// 確定済みの変更に伴う解放
    /// 失敗や超過は記録し、呼び出し元の操作は失敗させない
    async fn release_logged(
        &self,
        offer_id: OfferId,
        portions: u32,
        order_id: OrderId,
        correlation_id: Uuid,
    ) {
        match self.ledger.release(offer_id, portions).await {
            Ok(outcome) if outcome.overshoot > 0 => {
                self.logger.error(
                    ORDER_COMPONENT,
                    "Invariant violation: released more portions than reserved",
                    Some(correlation_id),
                    context(&[
                        ("order_id", order_id.to_string()),
                        ("offer_id", offer_id.to_string()),
                        ("released", outcome.released.to_string()),
                        ("overshoot", outcome.overshoot.to_string()),
                    ]),
                );
            }
            Ok(_) => {}
            Err(e) => {
                self.logger.error(
                    ORDER_COMPONENT,
                    "Failed to release capacity",
                    Some(correlation_id),
                    context(&[
                        ("order_id", order_id.to_string()),
                        ("offer_id", offer_id.to_string()),
                        ("portions", portions.to_string()),
                        ("error", e.to_string()),
                    ]),
                );
            }
        }
    }

    /// 失敗した操作で予約した分を戻す
    async fn compensate_release(&self, offer_id: OfferId, portions: u32, correlation_id: Uuid) {
        if portions == 0 {
            return;
        }
        if let Err(e) = self.ledger.release(offer_id, portions).await {
            self.logger.error(
                ORDER_COMPONENT,
                "Compensating release failed",
                Some(correlation_id),
                context(&[
                    ("offer_id", offer_id.to_string()),
                    ("portions", portions.to_string()),
                    ("error", e.to_string()),
                ]),
            );
        }
    }

    fn report_duplicate_anomaly(&self, duplicate: &ActiveDuplicate, correlation_id: Option<Uuid>) {
        if duplicate.anomaly {
            self.logger.error(
                ORDER_COMPONENT,
                "Invariant violation: multiple active orders for one customer, day and week",
                correlation_id,
                context(&[
                    ("order_id", duplicate.order.id().to_string()),
                    ("customer_id", duplicate.order.customer_id().to_string()),
                    ("day", duplicate.order.day().to_string()),
                    ("week_start", duplicate.order.week_start().to_string()),
                ]),
            );
        }
    }
}

/// 管理アプリケーションサービス
/// 受付窓口・オファー・受付上限の管理操作
pub struct AdminApplicationService {
    offer_repository: Arc<dyn DayOfferRepository>,
    window_repository: Arc<dyn OrderWindowRepository>,
    ledger: CapacityLedger,
    policy: OrderabilityPolicy,
    currency: Currency,
    clock: Arc<dyn Clock>,
    publisher: Arc<dyn EventPublisher>,
    logger: Arc<dyn Logger>,
}

const ADMIN_COMPONENT: &str = "AdminApplicationService";

impl AdminApplicationService {
    pub fn new(ports: &EnginePorts, settings: EngineSettings) -> Self {
        Self {
            offer_repository: ports.offer_repository.clone(),
            window_repository: ports.window_repository.clone(),
            ledger: CapacityLedger::new(ports.offer_repository.clone()),
            policy: settings.policy,
            currency: settings.currency,
            clock: ports.clock.clone(),
            publisher: ports.publisher.clone(),
            logger: ports.logger.clone(),
        }
    }

    /// 受付窓口を取得
    /// 対象週が過ぎていれば閉じた状態に戻して保存する
    pub async fn get_order_window(&self) -> Result<OrderWindow, ApplicationError> {
        let now = self.clock.now();
        let window = self.window_repository.get().await?;
        if !window.needs_expiry_reset(self.policy.today(now)) {
            return Ok(window);
        }

        let correlation_id = Uuid::new_v4();
        let closed = OrderWindow::closed();
        self.window_repository.set(&closed).await?;
        self.logger.info(
            ADMIN_COMPONENT,
            "Expired order window was reset",
            Some(correlation_id),
            context(&[(
                "week_start",
                window
                    .week_start()
                    .map(|w| w.to_string())
                    .unwrap_or_default(),
            )]),
        );
        publish_events(
            &*self.publisher,
            &*self.logger,
            ADMIN_COMPONENT,
            vec![DomainEvent::OrderWindowChanged(OrderWindowChanged {
                window: closed,
                expired: true,
                occurred_at: now,
            })],
            correlation_id,
        );
        Ok(closed)
    }

    /// 受付窓口を設定
    /// 既に過ぎた週に向けて開くことはできない
    pub async fn set_order_window(
        &self,
        enabled: bool,
        week_start: Option<WeekStart>,
    ) -> Result<OrderWindow, ApplicationError> {
        let correlation_id = Uuid::new_v4();
        let now = self.clock.now();
        let window = OrderWindow::new(enabled, week_start)?;
        if window.is_expired(self.policy.today(now)) {
            return Err(DomainError::validation(
                "week_start",
                "既に終了した週の受付は開始できません",
            )
            .into());
        }

        self.window_repository.set(&window).await?;
        self.logger.info(
            ADMIN_COMPONENT,
            "Order window changed",
            Some(correlation_id),
            context(&[
                ("enabled", window.enabled().to_string()),
                (
                    "week_start",
                    window
                        .week_start()
                        .map(|w| w.to_string())
                        .unwrap_or_default(),
                ),
            ]),
        );
        publish_events(
            &*self.publisher,
            &*self.logger,
            ADMIN_COMPONENT,
            vec![DomainEvent::OrderWindowChanged(OrderWindowChanged {
                window,
                expired: false,
                occurred_at: now,
            })],
            correlation_id,
        );
        Ok(window)
    }

    /// 受付上限を変更
    /// 次の判定から即時に反映される
    pub async fn set_capacity(
        &self,
        offer_id: OfferId,
        limit: Option<u32>,
    ) -> Result<DayOffer, ApplicationError> {
        let correlation_id = Uuid::new_v4();
        let offer = self.ledger.set_capacity(offer_id, limit).await?;
        self.logger.info(
            ADMIN_COMPONENT,
            "Capacity limit changed",
            Some(correlation_id),
            context(&[
                ("offer_id", offer_id.to_string()),
                (
                    "capacity_limit",
                    limit.map(|l| l.to_string()).unwrap_or_else(|| "unlimited".to_string()),
                ),
                ("portions_reserved", offer.portions_reserved().to_string()),
            ]),
        );
        publish_events(
            &*self.publisher,
            &*self.logger,
            ADMIN_COMPONENT,
            vec![DomainEvent::CapacityChanged(CapacityChanged {
                offer_id,
                capacity_limit: offer.capacity_limit(),
                portions_reserved: offer.portions_reserved(),
                occurred_at: self.clock.now(),
            })],
            correlation_id,
        );
        Ok(offer)
    }

    /// 週×曜日のオファーを公開（既存なら更新）
    /// 受付済みのランチ数は維持される
    pub async fn publish_day_offer(
        &self,
        command: PublishOfferCommand,
    ) -> Result<DayOffer, ApplicationError> {
        let correlation_id = Uuid::new_v4();
        let dishes: Vec<String> = command
            .dishes
            .iter()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .collect();
        if dishes.is_empty() {
            return Err(DomainError::validation("dishes", "料理を1つ以上指定してください").into());
        }
        if !(0..=DayOffer::MAX_UNIT_PRICE).contains(&command.unit_price) {
            return Err(DomainError::validation(
                "unit_price",
                format!("単価は0以上{}以下で指定してください", DayOffer::MAX_UNIT_PRICE),
            )
            .into());
        }
        let unit_price = Money::new(command.unit_price, self.currency);

        let offer = match self
            .offer_repository
            .find_by_week_and_day(command.week_start, command.day)
            .await?
        {
            Some(mut existing) => {
                existing.update_menu(dishes, unit_price);
                existing.set_capacity_limit(command.capacity_limit)?;
                existing
            }
            None => DayOffer::new(
                OfferId::new(),
                command.week_start,
                command.day,
                dishes,
                unit_price,
                command.capacity_limit,
            ),
        };
        let stored = match self.offer_repository.upsert(&offer).await {
            Ok(stored) => stored,
            Err(RepositoryError::ConstraintViolated(message)) => {
                return Err(DomainError::validation("capacity_limit", message).into())
            }
            Err(e) => return Err(e.into()),
        };

        self.logger.info(
            ADMIN_COMPONENT,
            "Day offer published",
            Some(correlation_id),
            context(&[
                ("offer_id", stored.id().to_string()),
                ("week_start", stored.week_start().to_string()),
                ("day", stored.day().to_string()),
            ]),
        );
        Ok(stored)
    }
}
