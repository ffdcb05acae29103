use lunch_order_planning::adapter::driven::{
    FixedClock, InMemoryDayOfferRepository, InMemoryEventPublisher, InMemoryOrderRepository,
    InMemoryOrderWindowRepository, InMemoryPlanTemplateRepository, RecordingLogger,
    StaticPresetSource, StaticPromoRuleSource,
};
use lunch_order_planning::adapter::driver::rest_api::{create_router, AppState};
use lunch_order_planning::application::service::{EnginePorts, EngineSettings};
use lunch_order_planning::domain::model::{
    Currency, DayOfWeek, PlannerPreset, PortionCount, PromoDiscount, PromoRule,
};
use lunch_order_planning::domain::service::OrderabilityPolicy;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use axum_test::TestServer;
use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

const WEEK: &str = "2026-10-19";
const NEXT_WEEK: &str = "2026-10-26";

fn tbilisi() -> FixedOffset {
    FixedOffset::east_opt(4 * 3600).unwrap()
}

// 2026-10-19（月）の現地時間
fn monday_at(hour: u32, minute: u32) -> DateTime<Utc> {
    tbilisi()
        .with_ymd_and_hms(2026, 10, 19, hour, minute, 0)
        .unwrap()
        .with_timezone(&Utc)
}

fn preset(slug: &str, days: &[DayOfWeek], sort_order: i32, active: bool) -> PlannerPreset {
    PlannerPreset {
        slug: slug.to_string(),
        title: slug.to_string(),
        description: None,
        days: days.to_vec(),
        portions: PortionCount::new(1).unwrap(),
        active,
        sort_order,
    }
}

fn app(clock: Arc<FixedClock>) -> Router {
    let ports = EnginePorts {
        order_repository: Arc::new(InMemoryOrderRepository::new()),
        offer_repository: Arc::new(InMemoryDayOfferRepository::new()),
        window_repository: Arc::new(InMemoryOrderWindowRepository::new()),
        template_repository: Arc::new(InMemoryPlanTemplateRepository::new()),
        promo_source: Arc::new(StaticPromoRuleSource::new(vec![PromoRule {
            code: "WELCOME".to_string(),
            discount: PromoDiscount::Flat(500),
            min_subtotal: Some(2000),
            min_weeks: None,
            valid_from: None,
            valid_until: None,
            active: true,
        }])),
        preset_source: Arc::new(StaticPresetSource::new(vec![
            preset("weekdays", &DayOfWeek::ALL, 2, true),
            preset(
                "mon-wed-fri",
                &[DayOfWeek::Monday, DayOfWeek::Wednesday, DayOfWeek::Friday],
                1,
                true,
            ),
            preset("retired", &[DayOfWeek::Tuesday], 0, false),
        ])),
        clock,
        publisher: Arc::new(InMemoryEventPublisher::new()),
        logger: Arc::new(RecordingLogger::new()),
    };
    let settings = EngineSettings {
        policy: OrderabilityPolicy::new(10, tbilisi()).unwrap(),
        create_cooldown: Duration::seconds(10),
        currency: Currency::GEL,
    };
    create_router().with_state(AppState::new(&ports, settings))
}

fn server() -> (TestServer, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::new(monday_at(9, 0)));
    let server = TestServer::new(app(clock.clone())).unwrap();
    (server, clock)
}

async fn publish(
    server: &TestServer,
    week_start: &str,
    day: &str,
    unit_price: i64,
    capacity: Option<u32>,
) -> String {
    let response = server
        .put("/admin/offers")
        .json(&json!({
            "week_start": week_start,
            "day": day,
            "dishes": ["Хачапури по-аджарски", "Салат"],
            "unit_price": unit_price,
            "capacity_limit": capacity,
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    body["offer_id"].as_str().unwrap().to_string()
}

fn order_body(customer_id: Uuid, day: &str, portions: u32) -> Value {
    json!({
        "customer_id": customer_id,
        "day": day,
        "portions": portions,
        "address": "ул. Руставели, 12",
        "phone": "+995 555 123 456",
    })
}

#[tokio::test]
async fn test_health_check() {
    let clock = Arc::new(FixedClock::new(monday_at(9, 0)));
    let response = app(clock)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_create_duplicate_and_merge() {
    let (server, _) = server();
    publish(&server, WEEK, "monday", 1500, Some(3)).await;
    let customer = Uuid::new_v4();

    let response = server.post("/orders").json(&order_body(customer, "Monday", 2)).await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let created: Value = response.json();
    assert_eq!(created["order"]["status"], "new");
    assert_eq!(created["order"]["week_start"], WEEK);
    assert_eq!(created["accepted_portions"], 2);
    assert_eq!(created["merged"], false);
    let order_id = created["order"]["order_id"].as_str().unwrap().to_string();

    let response = server.post("/orders").json(&order_body(customer, "понедельник", 1)).await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    let error: Value = response.json();
    assert_eq!(error["code"], "DUPLICATE_ORDER");
    assert_eq!(error["details"]["order_id"], order_id.as_str());
    assert_eq!(error["details"]["portions"], 2);

    let mut merge = order_body(customer, "monday", 1);
    merge["on_duplicate"] = json!("merge");
    let response = server.post("/orders").json(&merge).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let merged: Value = response.json();
    assert_eq!(merged["merged"], true);
    assert_eq!(merged["order"]["order_id"], order_id.as_str());
    assert_eq!(merged["order"]["portions"], 3);

    let response = server.get(&format!("/weeks/{}/offers", WEEK)).await;
    let offers: Value = response.json();
    assert_eq!(offers[0]["portions_reserved"], 3);
    assert_eq!(offers[0]["remaining"], 0);
    assert_eq!(offers[0]["sold_out"], true);

    let response = server
        .get(&format!("/customers/{}/orders/active", customer))
        .add_query_param("day", "monday")
        .add_query_param("week_start", WEEK)
        .await;
    let active: Value = response.json();
    assert_eq!(active["order_id"], order_id.as_str());
}

#[tokio::test]
async fn test_create_order_validation() {
    let (server, _) = server();
    publish(&server, WEEK, "monday", 1500, None).await;

    let response = server
        .post("/orders")
        .json(&order_body(Uuid::new_v4(), "saturday", 1))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let error: Value = response.json();
    assert_eq!(error["code"], "VALIDATION_ERROR");
    assert_eq!(error["details"]["field"], "day");

    let response = server
        .post("/orders")
        .json(&order_body(Uuid::new_v4(), "monday", 5))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let mut blank_phone = order_body(Uuid::new_v4(), "monday", 1);
    blank_phone["phone"] = json!("   ");
    let response = server.post("/orders").json(&blank_phone).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_ordering_closed_after_cutoff() {
    let (server, clock) = server();
    publish(&server, WEEK, "monday", 1500, None).await;
    clock.set(monday_at(10, 0));

    let response = server
        .post("/orders")
        .json(&order_body(Uuid::new_v4(), "monday", 1))
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    let error: Value = response.json();
    assert_eq!(error["code"], "ORDERING_CLOSED");
    assert_eq!(error["details"]["reason"]["code"], "after_cutoff");

    let response = server
        .get("/orderability")
        .add_query_param("day", "monday")
        .add_query_param("week_start", WEEK)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let orderability: Value = response.json();
    assert_eq!(orderability["orderable"], false);

    let response = server.get("/orderability").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let error: Value = response.json();
    assert_eq!(error["code"], "INVALID_PARAMETER");
}

#[tokio::test]
async fn test_order_window_admin() {
    let (server, clock) = server();
    publish(&server, NEXT_WEEK, "monday", 1500, None).await;

    let response = server.get("/admin/order-window").await;
    let window: Value = response.json();
    assert_eq!(window["enabled"], false);

    let response = server
        .put("/admin/order-window")
        .json(&json!({ "enabled": true }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = server
        .put("/admin/order-window")
        .json(&json!({ "enabled": true, "week_start": NEXT_WEEK }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    clock.set(monday_at(11, 0));
    let response = server
        .post("/orders")
        .json(&order_body(Uuid::new_v4(), "monday", 2))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let created: Value = response.json();
    assert_eq!(created["order"]["week_start"], NEXT_WEEK);

    let response = server
        .get(&format!("/weeks/{}/orderability", NEXT_WEEK))
        .await;
    let summary: Value = response.json();
    assert_eq!(summary.as_array().unwrap().len(), 5);
    assert_eq!(summary[4]["orderable"], true);
}

#[tokio::test]
async fn test_cancel_flow() {
    let (server, _) = server();
    publish(&server, WEEK, "tuesday", 1500, Some(4)).await;
    let customer = Uuid::new_v4();

    let response = server.post("/orders").json(&order_body(customer, "tuesday", 3)).await;
    let created: Value = response.json();
    let order_id = created["order"]["order_id"].as_str().unwrap().to_string();

    let response = server
        .post(&format!("/orders/{}/cancel", order_id))
        .json(&json!({ "actor": { "kind": "customer", "customer_id": Uuid::new_v4() } }))
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let owner = json!({ "actor": { "kind": "customer", "customer_id": customer } });
    let response = server
        .post(&format!("/orders/{}/cancel", order_id))
        .json(&owner)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let cancelled: Value = response.json();
    assert_eq!(cancelled["already_cancelled"], false);
    assert_eq!(cancelled["order"]["status"], "cancelled_by_customer");

    let response = server
        .post(&format!("/orders/{}/cancel", order_id))
        .json(&owner)
        .await;
    let again: Value = response.json();
    assert_eq!(again["already_cancelled"], true);

    let response = server.get(&format!("/weeks/{}/offers", WEEK)).await;
    let offers: Value = response.json();
    assert_eq!(offers[0]["portions_reserved"], 0);

    let response = server
        .get(&format!("/weeks/{}/orders", WEEK))
        .add_query_param("status", "cancelled_by_customer")
        .await;
    let orders: Value = response.json();
    assert_eq!(orders.as_array().unwrap().len(), 1);

    let response = server
        .patch(&format!("/orders/{}", order_id))
        .json(&json!({ "actor": { "kind": "operator" }, "portions": 1 }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);

    let response = server.get(&format!("/orders/{}", Uuid::new_v4())).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_throttled_create() {
    let (server, clock) = server();
    publish(&server, WEEK, "monday", 1500, None).await;
    publish(&server, WEEK, "tuesday", 1500, None).await;
    let customer = Uuid::new_v4();

    server
        .post("/orders")
        .json(&order_body(customer, "monday", 1))
        .await
        .assert_status(StatusCode::CREATED);

    clock.advance(Duration::seconds(3));
    let response = server.post("/orders").json(&order_body(customer, "tuesday", 1)).await;
    assert_eq!(response.status_code(), StatusCode::TOO_MANY_REQUESTS);
    let error: Value = response.json();
    assert_eq!(error["details"]["retry_after_seconds"], 7);
}

#[tokio::test]
async fn test_quote_with_promo_code() {
    let (server, _) = server();
    let offer_id = publish(&server, WEEK, "wednesday", 1200, None).await;

    let body = json!({
        "weeks": [{
            "week_start": WEEK,
            "selections": [{ "offer_id": offer_id, "day": "wednesday", "portions": 2 }],
        }],
        "promo_code": "welcome",
    });
    let response = server.post("/quotes").json(&body).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let quote: Value = response.json();
    assert_eq!(quote["subtotal"]["amount"], 2400);
    assert_eq!(quote["discount"]["amount"], 500);
    assert_eq!(quote["total"]["amount"], 1900);
    assert_eq!(quote["currency"], "GEL");

    // 最低金額に届かない場合は割引なしで理由を返す
    let body = json!({
        "weeks": [{
            "week_start": WEEK,
            "selections": [{ "offer_id": offer_id, "day": "wednesday", "portions": 1 }],
        }],
        "promo_code": "WELCOME",
    });
    let quote: Value = server.post("/quotes").json(&body).await.json();
    assert_eq!(quote["discount"]["amount"], 0);
    assert_eq!(quote["total"]["amount"], 1200);
    assert!(quote["promo_code_error"].is_string());
}

#[tokio::test]
async fn test_plan_edits_and_quote() {
    let (server, _) = server();
    let offer_id = publish(&server, WEEK, "thursday", 1000, None).await;

    let response = server
        .post("/plans/edits")
        .json(&json!({
            "edits": [
                { "op": "set_base_week_start", "week_start": WEEK },
                { "op": "set_weeks_count", "count": 3 },
                { "op": "set_selection", "week": 0, "offer_id": offer_id, "day": "thursday", "portions": 2 },
                { "op": "set_repeat", "repeat": true },
            ]
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let plan: Value = response.json();
    assert_eq!(plan["editable"], json!([true, false, false]));
    assert_eq!(plan["state"]["weeks"][2]["week_start"], "2026-11-02");

    let response = server
        .post("/plans/edits")
        .json(&json!({
            "state": plan["state"],
            "edits": [{ "op": "set_week_enabled", "week": 0, "enabled": false }],
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    // 翌週以降は受付窓口が閉じているため基準週のみ計上される
    let response = server
        .post("/plans/quote")
        .json(&json!({ "state": plan["state"] }))
        .await;
    let quote: Value = response.json();
    assert_eq!(quote["total"]["amount"], 2000);
    assert_eq!(quote["weeks"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_set_capacity_endpoint() {
    let (server, _) = server();
    let offer_id = publish(&server, WEEK, "friday", 1500, None).await;

    server
        .post("/orders")
        .json(&order_body(Uuid::new_v4(), "friday", 3))
        .await
        .assert_status(StatusCode::CREATED);

    let response = server
        .put(&format!("/admin/offers/{}/capacity", offer_id))
        .json(&json!({ "capacity_limit": 2 }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = server
        .put(&format!("/admin/offers/{}/capacity", offer_id))
        .json(&json!({ "capacity_limit": 4 }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let offer: Value = response.json();
    assert_eq!(offer["remaining"], 1);

    let response = server.get(&format!("/offers/{}", offer_id)).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let offer: Value = response.json();
    assert_eq!(offer["portions_reserved"], 3);
    assert_eq!(offer["capacity_limit"], 4);

    server
        .get(&format!("/offers/{}", Uuid::new_v4()))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let response = server
        .put(&format!("/admin/offers/{}/capacity", Uuid::new_v4()))
        .json(&json!({ "capacity_limit": 4 }))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_quote_weeks_carry_label_and_menu_status() {
    let (server, _) = server();
    let offer_id = publish(&server, WEEK, "monday", 1500, None).await;

    let body = json!({
        "weeks": [
            {
                "week_start": WEEK,
                "selections": [{ "offer_id": offer_id, "day": "monday", "portions": 1 }],
            },
            { "week_start": NEXT_WEEK, "selections": [] },
        ],
    });
    let quote: Value = server.post("/quotes").json(&body).await.json();
    assert_eq!(quote["weeks"][0]["label"], "19.10 - 23.10");
    assert_eq!(quote["weeks"][0]["menu_status"], "published");
    assert_eq!(quote["weeks"][1]["label"], "26.10 - 30.10");
    assert_eq!(quote["weeks"][1]["menu_status"], "pending");
}

#[tokio::test]
async fn test_checkout_plan_and_read_back() {
    let (server, _) = server();
    let offer_id = publish(&server, WEEK, "tuesday", 1300, None).await;
    let customer = Uuid::new_v4();

    let plan: Value = server
        .post("/plans/edits")
        .json(&json!({
            "edits": [
                { "op": "set_base_week_start", "week_start": WEEK },
                { "op": "set_weeks_count", "count": 2 },
                { "op": "set_selection", "week": 0, "offer_id": offer_id, "day": "tuesday", "portions": 2 },
            ]
        }))
        .await
        .json();

    let response = server
        .post("/plans/checkout")
        .json(&json!({
            "customer_id": customer,
            "state": plan["state"],
            "address": "ул. Руставели, 12",
            "phone": "+995 555 123 456",
            "promo_code": "welcome",
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let template: Value = response.json();
    assert_eq!(template["weeks_count"], 2);
    assert_eq!(template["subtotal"]["amount"], 2600);
    assert_eq!(template["discount"]["amount"], 500);
    assert_eq!(template["total"]["amount"], 2100);
    assert_eq!(template["promo_code"], "WELCOME");
    assert_eq!(template["weeks"][0]["label"], "19.10 - 23.10");
    assert_eq!(template["weeks"][0]["menu_status"], "published");
    assert_eq!(template["weeks"][1]["menu_status"], "pending");
    assert_eq!(template["weeks"][1]["subtotal"]["amount"], 0);

    let template_id = template["template_id"].as_str().unwrap();
    let response = server.get(&format!("/plans/{}", template_id)).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let stored: Value = response.json();
    assert_eq!(stored["total"]["amount"], 2100);

    let plans: Value = server
        .get(&format!("/customers/{}/plans", customer))
        .await
        .json();
    assert_eq!(plans.as_array().unwrap().len(), 1);

    server
        .get(&format!("/plans/{}", Uuid::new_v4()))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    // 容量は予約されない
    let offer: Value = server.get(&format!("/offers/{}", offer_id)).await.json();
    assert_eq!(offer["portions_reserved"], 0);
}

#[tokio::test]
async fn test_checkout_plan_without_accepted_lunches() {
    let (server, _) = server();
    let response = server
        .post("/plans/checkout")
        .json(&json!({
            "customer_id": Uuid::new_v4(),
            "state": { "weeks": [{ "week_start": WEEK, "enabled": true }], "repeat": false },
            "address": "ул. Руставели, 12",
            "phone": "+995 555 123 456",
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let error: Value = response.json();
    assert_eq!(error["details"]["field"], "selections");
}

#[tokio::test]
async fn test_list_presets() {
    let (server, _) = server();
    let response = server.get("/presets").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let presets: Value = response.json();
    let slugs: Vec<&str> = presets
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["slug"].as_str().unwrap())
        .collect();
    assert_eq!(slugs, vec!["mon-wed-fri", "weekdays"]);
    assert_eq!(presets[1]["days"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_publish_rejects_unit_price_out_of_range() {
    let (server, _) = server();
    let response = server
        .put("/admin/offers")
        .json(&json!({
            "week_start": WEEK,
            "day": "monday",
            "dishes": ["Хинкали"],
            "unit_price": i64::MAX / 2 + 1,
            "capacity_limit": null,
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let error: Value = response.json();
    assert_eq!(error["details"]["field"], "unit_price");
}
