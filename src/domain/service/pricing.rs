use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::error::DomainError;
use crate::domain::model::{
    Currency, DayOfWeek, DayOffer, LineStatus, MenuStatus, Money, OfferId, OrderWindow,
    PlanSelection, PlanWeek, PlannerState, PromoRejection, PromoRule, Quote, QuoteLine, WeekQuote,
    WeekStart,
};
use crate::domain::port::{DayOfferRepository, Logger, OrderWindowRepository, PromoRuleSource};
use crate::domain::service::OrderabilityPolicy;

/// 見積もり対象の1週間分の選択
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekSelections {
    /// Noneの場合は各オファー自身の週で見積もる
    pub week_start: Option<WeekStart>,
    pub enabled: bool,
    /// 同じオファーが複数回指定された場合は最後の指定が有効
    pub selections: BTreeMap<OfferId, PlanSelection>,
}

impl From<&PlanWeek> for WeekSelections {
    fn from(week: &PlanWeek) -> Self {
        Self {
            week_start: week.week_start,
            enabled: week.enabled,
            selections: week.selections.clone(),
        }
    }
}

impl WeekSelections {
    /// 計画の全週を見積もり入力に変換する
    pub fn from_plan(state: &PlannerState) -> Vec<Self> {
        state.weeks.iter().map(Self::from).collect()
    }
}

/// 見積もり計算
/// 参照のみを行い、容量の予約はしない
pub struct PricingCalculator {
    offer_repository: Arc<dyn DayOfferRepository>,
    window_repository: Arc<dyn OrderWindowRepository>,
    promo_source: Arc<dyn PromoRuleSource>,
    policy: OrderabilityPolicy,
    currency: Currency,
    logger: Arc<dyn Logger>,
}

const COMPONENT: &str = "PricingCalculator";

impl PricingCalculator {
    pub fn new(
        offer_repository: Arc<dyn DayOfferRepository>,
        window_repository: Arc<dyn OrderWindowRepository>,
        promo_source: Arc<dyn PromoRuleSource>,
        policy: OrderabilityPolicy,
        currency: Currency,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            offer_repository,
            window_repository,
            promo_source,
            policy,
            currency,
            logger,
        }
    }

    /// 週ごとの選択から見積もりを計算する
    ///
    /// 受付期間外・売り切れ・不正なプロモーションコードはエラーにせず、
    /// 明細の状態と警告に反映する
    pub async fn calculate(
        &self,
        weeks: &[WeekSelections],
        promo_code: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Quote, DomainError> {
        // 受付窓口は1回の計算につき1度だけ読む
        let window = self.window_repository.get().await?;
        let mut offers = OfferCache::default();
        // 同じオファーを複数の週で選んだ場合は合算して容量を照会する
        let mut claimed: HashMap<OfferId, u32> = HashMap::new();

        let mut week_quotes = Vec::with_capacity(weeks.len());
        for (index, week) in weeks.iter().enumerate() {
            week_quotes.push(
                self.quote_week(index, week, now, &window, &mut offers, &mut claimed)
                    .await?,
            );
        }

        let mut subtotal = Money::zero(self.currency);
        for week in week_quotes.iter().filter(|w| w.enabled) {
            subtotal = subtotal.add(&week.subtotal)?;
        }
        // 週数の条件には1食以上受け付けられた週だけを数える
        let billable_weeks = week_quotes
            .iter()
            .filter(|w| w.enabled && w.lines.iter().any(|line| line.accepted_portions > 0))
            .count() as u32;

        let promo_code = promo_code.and_then(PromoRule::normalize_code);
        let (discount, promo_code_error) = match &promo_code {
            Some(code) => match self.evaluate_promo(code, subtotal, billable_weeks, now).await {
                Ok(discount) => (discount, None),
                Err(rejection) => (Money::zero(self.currency), Some(rejection.to_string())),
            },
            None => (Money::zero(self.currency), None),
        };
        let total = subtotal.saturating_sub(&discount)?;

        let warnings = week_quotes
            .iter()
            .flat_map(|w| w.warnings.iter().cloned())
            .collect();

        Ok(Quote {
            weeks: week_quotes,
            subtotal,
            discount,
            total,
            currency: self.currency,
            warnings,
            promo_code,
            promo_code_error,
        })
    }

    async fn quote_week(
        &self,
        index: usize,
        week: &WeekSelections,
        now: DateTime<Utc>,
        window: &OrderWindow,
        offers: &mut OfferCache,
        claimed: &mut HashMap<OfferId, u32>,
    ) -> Result<WeekQuote, DomainError> {
        let zero = Money::zero(self.currency);
        let label = week.week_start.and_then(week_label);
        let menu_status = match week.week_start {
            Some(week_start) => {
                if offers
                    .by_week(&*self.offer_repository, week_start)
                    .await?
                    .is_empty()
                {
                    MenuStatus::Pending
                } else {
                    MenuStatus::Published
                }
            }
            None => MenuStatus::Pending,
        };

        if !week.enabled {
            // 無効な週は選択を保持したまま小計に含めない
            return Ok(WeekQuote {
                week_start: week.week_start,
                label,
                enabled: false,
                menu_status,
                lines: Vec::new(),
                subtotal: zero,
                warnings: Vec::new(),
            });
        }

        // 基準週以外で週が決まらない場合は見積もらない
        let unresolved = index > 0 && week.week_start.is_none();

        let mut lines = Vec::with_capacity(week.selections.len());
        let mut any_published = false;
        for (offer_id, selection) in &week.selections {
            if unresolved {
                lines.push(self.closed_line(
                    *offer_id,
                    selection,
                    selection.day,
                    None,
                    "対象週が決まっていません".to_string(),
                ));
                continue;
            }
            let offer = self
                .resolve_offer(*offer_id, selection, week.week_start, offers)
                .await?;
            any_published |= offer.is_some();
            lines.push(self.price_line(
                *offer_id,
                selection,
                offer.as_ref(),
                now,
                window,
                claimed,
            )?);
        }
        lines.sort_by_key(|line| (line.day, line.offer_id));

        let mut subtotal = zero;
        let mut warnings = Vec::new();
        for line in &lines {
            subtotal = subtotal.add(&line.subtotal)?;
            if line.status != LineStatus::Ok {
                if let Some(message) = &line.message {
                    let label = week
                        .week_start
                        .map(|w| w.to_string())
                        .unwrap_or_else(|| "-".to_string());
                    warnings.push(format!("{} ({}): {}", line.day, label, message));
                }
            }
        }

        let menu_status = if week.week_start.is_none() && any_published {
            MenuStatus::Published
        } else {
            menu_status
        };

        Ok(WeekQuote {
            week_start: week.week_start,
            label,
            enabled: true,
            menu_status,
            lines,
            subtotal,
            warnings,
        })
    }

    /// 選択されたオファーを見積もり対象の週のオファーに解決する
    /// 別の週のオファーが指定された場合は、対象週の同じ曜日のオファーに置き換える
    async fn resolve_offer(
        &self,
        offer_id: OfferId,
        selection: &PlanSelection,
        week_start: Option<WeekStart>,
        offers: &mut OfferCache,
    ) -> Result<Option<DayOffer>, DomainError> {
        let selected = offers.by_id(&*self.offer_repository, offer_id).await?;
        let Some(target_week) = week_start else {
            return Ok(selected);
        };
        match selected {
            Some(offer) if offer.week_start() == target_week => Ok(Some(offer)),
            Some(offer) => offers
                .by_week_and_day(&*self.offer_repository, target_week, offer.day())
                .await,
            None => offers
                .by_week_and_day(&*self.offer_repository, target_week, selection.day)
                .await,
        }
    }

    fn closed_line(
        &self,
        offer_id: OfferId,
        selection: &PlanSelection,
        day: DayOfWeek,
        unit_price: Option<Money>,
        message: String,
    ) -> QuoteLine {
        QuoteLine {
            offer_id,
            day,
            status: LineStatus::Closed,
            requested_portions: selection.portions.get(),
            accepted_portions: 0,
            unit_price,
            subtotal: Money::zero(self.currency),
            message: Some(message),
        }
    }

    fn price_line(
        &self,
        offer_id: OfferId,
        selection: &PlanSelection,
        offer: Option<&DayOffer>,
        now: DateTime<Utc>,
        window: &OrderWindow,
        claimed: &mut HashMap<OfferId, u32>,
    ) -> Result<QuoteLine, DomainError> {
        let requested = selection.portions.get();

        let Some(offer) = offer else {
            return Ok(self.closed_line(
                offer_id,
                selection,
                selection.day,
                None,
                "この週のメニューは公開されていません".to_string(),
            ));
        };
        let unit_price = offer.unit_price();
        if unit_price.currency() != self.currency {
            return Ok(self.closed_line(
                offer_id,
                selection,
                offer.day(),
                None,
                format!("通貨が一致しません: {}", unit_price.currency()),
            ));
        }

        let orderability = self
            .policy
            .evaluate(offer.day(), offer.week_start(), now, window);
        if let Some(reason) = orderability.reason.filter(|_| !orderability.orderable) {
            return Ok(self.closed_line(
                offer_id,
                selection,
                offer.day(),
                Some(unit_price),
                reason.to_string(),
            ));
        }

        let already = claimed.get(&offer.id()).copied().unwrap_or(0);
        let combined = offer.check(already.saturating_add(requested));
        let accepted = combined.accepted.saturating_sub(already).min(requested);
        claimed.insert(offer.id(), already + accepted);

        let (status, message) = if accepted == 0 {
            (LineStatus::SoldOut, Some("売り切れです".to_string()))
        } else if accepted < requested {
            (
                LineStatus::SoldOut,
                Some(format!("{}食のうち{}食のみ受付可能です", requested, accepted)),
            )
        } else {
            (LineStatus::Ok, None)
        };

        Ok(QuoteLine {
            offer_id: offer.id(),
            day: offer.day(),
            status,
            requested_portions: requested,
            accepted_portions: accepted,
            unit_price: Some(unit_price),
            subtotal: unit_price.multiply(accepted)?,
            message,
        })
    }

    async fn evaluate_promo(
        &self,
        code: &str,
        subtotal: Money,
        billable_weeks: u32,
        now: DateTime<Utc>,
    ) -> Result<Money, PromoRejection> {
        let rule = match self.promo_source.resolve(code).await {
            Ok(Some(rule)) => rule,
            Ok(None) => return Err(PromoRejection::NotFound),
            Err(e) => {
                self.logger.warn(
                    COMPONENT,
                    "Promo rule lookup failed, quoting without discount",
                    None,
                    Some(HashMap::from([
                        ("promo_code".to_string(), code.to_string()),
                        ("error".to_string(), e.to_string()),
                    ])),
                );
                return Err(PromoRejection::Unavailable);
            }
        };
        rule.evaluate(subtotal, billable_weeks, self.policy.today(now))
    }
}

/// 週の表示名（月曜〜金曜の日付）
fn week_label(week_start: WeekStart) -> Option<String> {
    let first = week_start.day_date(DayOfWeek::Monday)?;
    let last = week_start.day_date(DayOfWeek::Friday)?;
    Some(format!("{} - {}", first.format("%d.%m"), last.format("%d.%m")))
}

/// 1回の見積もり計算の間だけ有効なオファーの読み込み結果
#[derive(Default)]
struct OfferCache {
    by_id: HashMap<OfferId, Option<DayOffer>>,
    by_slot: HashMap<(WeekStart, DayOfWeek), Option<DayOffer>>,
    by_week: HashMap<WeekStart, Vec<DayOffer>>,
}

impl OfferCache {
    async fn by_id(
        &mut self,
        repository: &dyn DayOfferRepository,
        offer_id: OfferId,
    ) -> Result<Option<DayOffer>, DomainError> {
        if let Some(cached) = self.by_id.get(&offer_id) {
            return Ok(cached.clone());
        }
        let offer = repository.find_by_id(offer_id).await?;
        self.by_id.insert(offer_id, offer.clone());
        Ok(offer)
    }

    async fn by_week(
        &mut self,
        repository: &dyn DayOfferRepository,
        week_start: WeekStart,
    ) -> Result<Vec<DayOffer>, DomainError> {
        if let Some(cached) = self.by_week.get(&week_start) {
            return Ok(cached.clone());
        }
        let week = repository.find_by_week(week_start).await?;
        self.by_week.insert(week_start, week.clone());
        Ok(week)
    }

    async fn by_week_and_day(
        &mut self,
        repository: &dyn DayOfferRepository,
        week_start: WeekStart,
        day: DayOfWeek,
    ) -> Result<Option<DayOffer>, DomainError> {
        if let Some(cached) = self.by_slot.get(&(week_start, day)) {
            return Ok(cached.clone());
        }
        let offer = repository.find_by_week_and_day(week_start, day).await?;
        self.by_slot.insert((week_start, day), offer.clone());
        Ok(offer)
    }
}
