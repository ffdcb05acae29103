use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::adapter::driver::request_dto::{
    ActiveOrderQueryParams, CancelOrderRequest, CheckoutPlanRequest, CreateOrderRequest,
    OrderabilityQueryParams, PlanEditRequest, PlanQuoteRequest, PublishOfferRequest,
    QuoteRequest, SetCapacityRequest, SetOrderWindowRequest, UpdateOrderRequest,
    WeekOrdersQueryParams,
};
use crate::adapter::driver::response_dto::{
    CancelOrderResponse, CreateOrderResponse, OfferResponse, OrderResponse, OrderWindowResponse,
    PlanTemplateResponse,
};
use crate::application::service::{
    AdminApplicationService, EnginePorts, EngineSettings, OfferQueryService,
    OrderApplicationService, OrderQueryService, PlanOutcome, PlanQueryService,
};
use crate::application::ApplicationError;
use crate::domain::error::DomainError;
use crate::domain::model::{
    CustomerId, DayOfWeek, OfferId, OrderId, OrderStatus, Orderability, PlanTemplateId,
    PlannerPreset, Quote, WeekStart,
};

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

fn api_error(
    status: StatusCode,
    code: &str,
    error: impl Into<String>,
    details: Option<serde_json::Value>,
) -> (StatusCode, Json<ApiError>) {
    (
        status,
        Json(ApiError {
            error: error.into(),
            code: code.to_string(),
            details,
        }),
    )
}

// アプリケーションサービスを含む状態
#[derive(Clone)]
pub struct AppState {
    pub order_service: Arc<OrderApplicationService>,
    pub admin_service: Arc<AdminApplicationService>,
    pub order_query_service: Arc<OrderQueryService>,
    pub offer_query_service: Arc<OfferQueryService>,
    pub plan_query_service: Arc<PlanQueryService>,
}

impl AppState {
    /// 出力ポートと設定からサービス一式を組み立てる
    pub fn new(ports: &EnginePorts, settings: EngineSettings) -> Self {
        Self {
            order_service: Arc::new(OrderApplicationService::new(ports, settings)),
            admin_service: Arc::new(AdminApplicationService::new(ports, settings)),
            order_query_service: Arc::new(OrderQueryService::new(
                ports.order_repository.clone(),
            )),
            offer_query_service: Arc::new(OfferQueryService::new(
                ports.offer_repository.clone(),
                ports.preset_source.clone(),
            )),
            plan_query_service: Arc::new(PlanQueryService::new(
                ports.template_repository.clone(),
            )),
        }
    }
}

// REST APIルーターを作成
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/orders", post(create_order))
        .route("/orders/:order_id", get(get_order_by_id).patch(update_order))
        .route("/orders/:order_id/cancel", post(cancel_order))
        .route("/customers/:customer_id/orders", get(list_customer_orders))
        .route("/customers/:customer_id/orders/active", get(get_active_order))
        .route("/customers/:customer_id/plans", get(list_customer_plans))
        .route("/orderability", get(get_orderability))
        .route("/weeks/:week_start/orderability", get(get_week_orderability))
        .route("/weeks/:week_start/offers", get(list_week_offers))
        .route("/offers/:offer_id", get(get_offer))
        .route("/presets", get(list_presets))
        .route("/weeks/:week_start/orders", get(list_week_orders))
        .route("/quotes", post(quote))
        .route("/plans/quote", post(quote_plan))
        .route("/plans/edits", post(apply_plan_edits))
        .route("/plans/checkout", post(checkout_plan))
        .route("/plans/:template_id", get(get_plan))
        .route(
            "/admin/order-window",
            get(get_order_window).put(set_order_window),
        )
        .route("/admin/offers", put(publish_day_offer))
        .route("/admin/offers/:offer_id/capacity", put(set_capacity))
}

// ヘルスチェックエンドポイント
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "lunch-order-planning",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

fn parse_week(date: NaiveDate) -> ApiResult<WeekStart> {
    WeekStart::new(date).map_err(map_domain_error)
}

fn parse_day(day: &str) -> ApiResult<DayOfWeek> {
    DayOfWeek::parse(day).map_err(map_domain_error)
}

fn invalid_query(_: QueryRejection) -> (StatusCode, Json<ApiError>) {
    api_error(
        StatusCode::BAD_REQUEST,
        "INVALID_PARAMETER",
        "無効なクエリパラメータです",
        None,
    )
}

// 注文作成エンドポイント
async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> ApiResult<(StatusCode, Json<CreateOrderResponse>)> {
    let command = request.into_command().map_err(map_domain_error)?;
    let outcome = state
        .order_service
        .create_order(command)
        .await
        .map_err(map_application_error)?;

    let status = if outcome.merged {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(CreateOrderResponse::from_outcome(&outcome))))
}

// 注文変更エンドポイント
async fn update_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(request): Json<UpdateOrderRequest>,
) -> ApiResult<Json<OrderResponse>> {
    let (actor, command) = request.into_command().map_err(map_domain_error)?;
    let order = state
        .order_service
        .update_order(OrderId::from_uuid(order_id), actor, command)
        .await
        .map_err(map_application_error)?;
    Ok(Json(OrderResponse::from_order(&order)))
}

// 注文キャンセルエンドポイント
async fn cancel_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(request): Json<CancelOrderRequest>,
) -> ApiResult<Json<CancelOrderResponse>> {
    let outcome = state
        .order_service
        .cancel_order(OrderId::from_uuid(order_id), request.actor)
        .await
        .map_err(map_application_error)?;
    Ok(Json(CancelOrderResponse::from_outcome(&outcome)))
}

// 注文詳細取得エンドポイント
async fn get_order_by_id(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Json<OrderResponse>> {
    match state
        .order_query_service
        .get_order_by_id(OrderId::from_uuid(order_id))
        .await
    {
        Ok(Some(order)) => Ok(Json(OrderResponse::from_order(&order))),
        Ok(None) => Err(api_error(
            StatusCode::NOT_FOUND,
            "ORDER_NOT_FOUND",
            "指定された注文が見つかりません",
            None,
        )),
        Err(err) => Err(map_application_error(err)),
    }
}

// 顧客の注文一覧取得エンドポイント
async fn list_customer_orders(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> ApiResult<Json<Vec<OrderResponse>>> {
    let orders = state
        .order_query_service
        .list_customer_orders(CustomerId::from_uuid(customer_id))
        .await
        .map_err(map_application_error)?;
    Ok(Json(orders.iter().map(OrderResponse::from_order).collect()))
}

// 重複する有効な注文の取得エンドポイント
async fn get_active_order(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
    query: Result<Query<ActiveOrderQueryParams>, QueryRejection>,
) -> ApiResult<Json<Option<OrderResponse>>> {
    let Query(params) = query.map_err(invalid_query)?;
    let day = parse_day(&params.day)?;
    let week_start = parse_week(params.week_start)?;

    let order = state
        .order_service
        .get_active_duplicate(CustomerId::from_uuid(customer_id), day, week_start)
        .await
        .map_err(map_application_error)?;
    Ok(Json(order.as_ref().map(OrderResponse::from_order)))
}

// 注文可否取得エンドポイント
async fn get_orderability(
    State(state): State<AppState>,
    query: Result<Query<OrderabilityQueryParams>, QueryRejection>,
) -> ApiResult<Json<Orderability>> {
    let Query(params) = query.map_err(invalid_query)?;
    let day = parse_day(&params.day)?;
    let week_start = params.week_start.map(parse_week).transpose()?;

    state
        .order_service
        .get_orderability(day, week_start)
        .await
        .map(Json)
        .map_err(map_application_error)
}

// 週の注文可否取得エンドポイント
async fn get_week_orderability(
    State(state): State<AppState>,
    Path(week_start): Path<NaiveDate>,
) -> ApiResult<Json<Vec<Orderability>>> {
    let week_start = parse_week(week_start)?;
    state
        .order_service
        .get_week_orderability(week_start)
        .await
        .map(Json)
        .map_err(map_application_error)
}

// 週のオファー一覧取得エンドポイント
async fn list_week_offers(
    State(state): State<AppState>,
    Path(week_start): Path<NaiveDate>,
) -> ApiResult<Json<Vec<OfferResponse>>> {
    let week_start = parse_week(week_start)?;
    let offers = state
        .offer_query_service
        .list_week_offers(week_start)
        .await
        .map_err(map_application_error)?;
    Ok(Json(offers.iter().map(OfferResponse::from_offer).collect()))
}

// オファー詳細取得エンドポイント
async fn get_offer(
    State(state): State<AppState>,
    Path(offer_id): Path<Uuid>,
) -> ApiResult<Json<OfferResponse>> {
    match state
        .offer_query_service
        .get_offer(OfferId::from_uuid(offer_id))
        .await
    {
        Ok(Some(offer)) => Ok(Json(OfferResponse::from_offer(&offer))),
        Ok(None) => Err(api_error(
            StatusCode::NOT_FOUND,
            "OFFER_NOT_FOUND",
            "指定されたオファーが見つかりません",
            None,
        )),
        Err(err) => Err(map_application_error(err)),
    }
}

// 週の注文一覧取得エンドポイント
async fn list_week_orders(
    State(state): State<AppState>,
    Path(week_start): Path<NaiveDate>,
    query: Result<Query<WeekOrdersQueryParams>, QueryRejection>,
) -> ApiResult<Json<Vec<OrderResponse>>> {
    let Query(params) = query.map_err(invalid_query)?;
    let week_start = parse_week(week_start)?;
    let status = params
        .status
        .as_deref()
        .map(OrderStatus::from_string)
        .transpose()
        .map_err(map_domain_error)?;

    let orders = state
        .order_query_service
        .list_week_orders(week_start, status)
        .await
        .map_err(map_application_error)?;
    Ok(Json(orders.iter().map(OrderResponse::from_order).collect()))
}

// 見積もりエンドポイント
async fn quote(
    State(state): State<AppState>,
    Json(request): Json<QuoteRequest>,
) -> ApiResult<Json<Quote>> {
    let promo_code = request.promo_code.clone();
    let weeks = request.into_weeks().map_err(map_domain_error)?;
    state
        .order_service
        .quote(&weeks, promo_code.as_deref())
        .await
        .map(Json)
        .map_err(map_application_error)
}

// 計画の見積もりエンドポイント
async fn quote_plan(
    State(state): State<AppState>,
    Json(request): Json<PlanQuoteRequest>,
) -> ApiResult<Json<Quote>> {
    state
        .order_service
        .quote_plan(&request.state, request.promo_code.as_deref())
        .await
        .map(Json)
        .map_err(map_application_error)
}

// 計画編集エンドポイント
async fn apply_plan_edits(
    State(state): State<AppState>,
    Json(request): Json<PlanEditRequest>,
) -> ApiResult<Json<PlanOutcome>> {
    state
        .order_service
        .apply_plan_edits(&request.state, &request.edits)
        .map(Json)
        .map_err(map_application_error)
}

// 計画チェックアウトエンドポイント
async fn checkout_plan(
    State(state): State<AppState>,
    Json(request): Json<CheckoutPlanRequest>,
) -> ApiResult<(StatusCode, Json<PlanTemplateResponse>)> {
    let command = request.into_command().map_err(map_domain_error)?;
    let template = state
        .order_service
        .checkout_plan(command)
        .await
        .map_err(map_application_error)?;
    Ok((
        StatusCode::CREATED,
        Json(PlanTemplateResponse::from_template(&template)),
    ))
}

// 確定した計画の取得エンドポイント
async fn get_plan(
    State(state): State<AppState>,
    Path(template_id): Path<Uuid>,
) -> ApiResult<Json<PlanTemplateResponse>> {
    match state
        .plan_query_service
        .get_plan(PlanTemplateId::from_uuid(template_id))
        .await
    {
        Ok(Some(template)) => Ok(Json(PlanTemplateResponse::from_template(&template))),
        Ok(None) => Err(api_error(
            StatusCode::NOT_FOUND,
            "PLAN_NOT_FOUND",
            "指定された計画が見つかりません",
            None,
        )),
        Err(err) => Err(map_application_error(err)),
    }
}

// 顧客の計画一覧取得エンドポイント
async fn list_customer_plans(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> ApiResult<Json<Vec<PlanTemplateResponse>>> {
    let templates = state
        .plan_query_service
        .list_customer_plans(CustomerId::from_uuid(customer_id))
        .await
        .map_err(map_application_error)?;
    Ok(Json(
        templates
            .iter()
            .map(PlanTemplateResponse::from_template)
            .collect(),
    ))
}

// 計画の定型パターン一覧取得エンドポイント
async fn list_presets(State(state): State<AppState>) -> ApiResult<Json<Vec<PlannerPreset>>> {
    state
        .offer_query_service
        .list_presets()
        .await
        .map(Json)
        .map_err(map_application_error)
}

// 受付窓口取得エンドポイント
async fn get_order_window(
    State(state): State<AppState>,
) -> ApiResult<Json<OrderWindowResponse>> {
    let window = state
        .admin_service
        .get_order_window()
        .await
        .map_err(map_application_error)?;
    Ok(Json(OrderWindowResponse::from_window(&window)))
}

// 受付窓口設定エンドポイント
async fn set_order_window(
    State(state): State<AppState>,
    Json(request): Json<SetOrderWindowRequest>,
) -> ApiResult<Json<OrderWindowResponse>> {
    let week_start = request.week_start().map_err(map_domain_error)?;
    let window = state
        .admin_service
        .set_order_window(request.enabled, week_start)
        .await
        .map_err(map_application_error)?;
    Ok(Json(OrderWindowResponse::from_window(&window)))
}

// オファー公開エンドポイント
async fn publish_day_offer(
    State(state): State<AppState>,
    Json(request): Json<PublishOfferRequest>,
) -> ApiResult<Json<OfferResponse>> {
    let command = request.into_command().map_err(map_domain_error)?;
    let offer = state
        .admin_service
        .publish_day_offer(command)
        .await
        .map_err(map_application_error)?;
    Ok(Json(OfferResponse::from_offer(&offer)))
}

// 受付上限変更エンドポイント
async fn set_capacity(
    State(state): State<AppState>,
    Path(offer_id): Path<Uuid>,
    Json(request): Json<SetCapacityRequest>,
) -> ApiResult<Json<OfferResponse>> {
    let offer = state
        .admin_service
        .set_capacity(OfferId::from_uuid(offer_id), request.capacity_limit)
        .await
        .map_err(map_application_error)?;
    Ok(Json(OfferResponse::from_offer(&offer)))
}

fn internal_error(detail: &dyn std::fmt::Display) -> (StatusCode, Json<ApiError>) {
    // 詳細はログにのみ出力する
    tracing::error!(error = %detail, "request failed with an internal error");
    api_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "内部エラーが発生しました",
        None,
    )
}

// アプリケーションエラーをHTTPエラーにマッピング
fn map_application_error(err: ApplicationError) -> (StatusCode, Json<ApiError>) {
    match err {
        ApplicationError::DomainError(domain_err) => map_domain_error(domain_err),
        ApplicationError::RepositoryError(repo_err) => internal_error(&repo_err),
        ApplicationError::NotFound(msg) => api_error(StatusCode::NOT_FOUND, "NOT_FOUND", msg, None),
    }
}

// ドメインエラーを適切なHTTPステータスコードとエラーコードにマッピング
fn map_domain_error(domain_err: DomainError) -> (StatusCode, Json<ApiError>) {
    let display = domain_err.to_string();
    match domain_err {
        DomainError::Validation { field, message } => api_error(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            message,
            Some(serde_json::json!({ "field": field })),
        ),
        DomainError::WindowClosed {
            day,
            week_start,
            reason,
        } => api_error(
            StatusCode::CONFLICT,
            "ORDERING_CLOSED",
            reason.to_string(),
            Some(serde_json::json!({
                "day": day,
                "week_start": week_start,
                "reason": reason,
            })),
        ),
        DomainError::CapacityExceeded {
            offer_id,
            requested,
            accepted,
        } => api_error(
            StatusCode::CONFLICT,
            "CAPACITY_EXCEEDED",
            display,
            Some(serde_json::json!({
                "offer_id": offer_id,
                "requested": requested,
                "accepted": accepted,
            })),
        ),
        DomainError::DuplicateOrder { order_id, portions } => api_error(
            StatusCode::CONFLICT,
            "DUPLICATE_ORDER",
            display,
            Some(serde_json::json!({ "order_id": order_id, "portions": portions })),
        ),
        DomainError::Throttled {
            retry_after_seconds,
        } => api_error(
            StatusCode::TOO_MANY_REQUESTS,
            "THROTTLED",
            display,
            Some(serde_json::json!({ "retry_after_seconds": retry_after_seconds })),
        ),
        DomainError::InvalidOrderState(msg) => {
            api_error(StatusCode::CONFLICT, "INVALID_ORDER_STATE", msg, None)
        }
        DomainError::Forbidden(msg) => api_error(StatusCode::FORBIDDEN, "FORBIDDEN", msg, None),
        DomainError::InvariantViolation(_) | DomainError::CurrencyMismatch => {
            internal_error(&display)
        }
        DomainError::Repository(repo_err) => internal_error(&repo_err),
    }
}
