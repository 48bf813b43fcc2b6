use axum::http::StatusCode;
use chrono::{FixedOffset, NaiveDate};
use serde_json::Value;
use serde_json::json;
use uuid::Uuid;

use crate::app;
use crate::cfg;
use crate::db::{self, NewTenant};
use crate::services::callback::{CallbackEvent, CallbackOutcome, CallbackProcessor};
use crate::tests::support::{TestApp, count_rows, spawn_app, successful_callback};

async fn post_callback(app: &TestApp, payload: &Value) -> axum_test::TestResponse {
    app.server.post("/api/mpesa/callback").json(payload).await
}

async fn alerts(app: &TestApp) -> Vec<Value> {
    let body: Value = app.get_as("/api/dashboard/alerts", &app.caretaker_token()).await.json();
    body["alerts"].as_array().unwrap().clone()
}

#[tokio::test]
async fn test_matched_callback_records_payment_and_alert() {
    let app = spawn_app().await;
    let tenant = app.create_tenant("Jane Wanjiru", "0712345678", "A1", 15000.0).await;

    let response = post_callback(&app, &successful_callback(15000.0, "254712345678", "NLJ7RT61SV")).await;

    response.assert_status(StatusCode::OK);
    assert_eq!(response.json::<Value>()["message"], "Payment processed successfully");

    let payments: Value = app.get_as("/api/payments", &app.caretaker_token()).await.json();
    let payments = payments["payments"].as_array().unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0]["tenant_id"], tenant["id"]);
    assert_eq!(payments[0]["payment_method"], "M-PESA");
    assert_eq!(payments[0]["payment_status"], "Full");
    assert_eq!(payments[0]["transaction_reference"], "NLJ7RT61SV");
    assert_eq!(payments[0]["payment_date"], app.context.settings.server.local_today().to_string());
    assert!(payments[0]["logged_by"].is_null());

    let alerts = alerts(&app).await;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["alert_type"], "mpesa_payment_received");
    assert_eq!(alerts[0]["severity"], "success");
    assert_eq!(alerts[0]["message"], "M-PESA payment of KES 15000 received from Jane Wanjiru");
    assert_eq!(alerts[0]["related_tenant_id"], tenant["id"]);
    assert_eq!(alerts[0]["related_payment_id"], payments[0]["id"]);
}

#[tokio::test]
async fn test_partial_callback_payment_keeps_balance() {
    let app = spawn_app().await;
    app.create_tenant("Jane Wanjiru", "0712345678", "A1", 15000.0).await;

    post_callback(&app, &successful_callback(10000.0, "254712345678", "NLJ7RT61SW"))
        .await
        .assert_status(StatusCode::OK);

    let payments: Value = app.get_as("/api/payments", &app.caretaker_token()).await.json();
    assert_eq!(payments["payments"][0]["payment_status"], "Partial");
    assert_eq!(payments["payments"][0]["remaining_amount"], 5000.0);
}

#[tokio::test]
async fn test_phone_formats_are_reconciled() {
    let app = spawn_app().await;
    let tenant = app.create_tenant("Jane Wanjiru", "+254 701 234 567", "A1", 15000.0).await;

    // PhoneNumber arrives as a JSON number
    let mut payload = successful_callback(15000.0, "", "NLJ7RT61SX");
    payload["Body"]["stkCallback"]["CallbackMetadata"]["Item"][3]["Value"] = json!(254_701_234_567_i64);

    let response = post_callback(&app, &payload).await;

    response.assert_status(StatusCode::OK);
    assert_eq!(response.json::<Value>()["message"], "Payment processed successfully");
    let payments = db::list_payments(&app.context.db, tenant["id"].as_i64()).await.unwrap();
    assert_eq!(payments.len(), 1);
}

#[tokio::test]
async fn test_unmatched_callback_raises_warning_only() {
    let app = spawn_app().await;
    app.create_tenant("Jane Wanjiru", "0712345678", "A1", 15000.0).await;

    let response = post_callback(&app, &successful_callback(5000.0, "254799999999", "NLJ7RT61SY")).await;

    response.assert_status(StatusCode::OK);
    assert_eq!(response.json::<Value>()["message"], "Payment received but tenant not matched");
    assert_eq!(count_rows(&app.context, "payments").await, 0);

    let alerts = alerts(&app).await;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["alert_type"], "mpesa_unmatched");
    assert_eq!(alerts[0]["severity"], "warning");
    assert_eq!(alerts[0]["message"], "Unmatched M-PESA payment of KES 5000 from 254799999999");
    assert!(alerts[0]["related_tenant_id"].is_null());
    assert!(alerts[0]["related_payment_id"].is_null());
}

#[tokio::test]
async fn test_inactive_tenants_are_not_matched() {
    let app = spawn_app().await;
    let tenant = app.create_tenant("Jane Wanjiru", "0712345678", "A1", 15000.0).await;
    let id = tenant["id"].as_i64().unwrap();
    app.delete_as(&format!("/api/tenants/{id}"), &app.caretaker_token()).await.assert_status(StatusCode::OK);

    let response = post_callback(&app, &successful_callback(15000.0, "254712345678", "NLJ7RT61SZ")).await;

    assert_eq!(response.json::<Value>()["message"], "Payment received but tenant not matched");
    assert_eq!(count_rows(&app.context, "payments").await, 0);
}

#[tokio::test]
async fn test_failed_transaction_is_rejected_without_writes() {
    let app = spawn_app().await;
    app.create_tenant("Jane Wanjiru", "0712345678", "A1", 15000.0).await;
    let mut payload = successful_callback(15000.0, "254712345678", "NLJ7RT61SV");
    payload["Body"]["stkCallback"]["ResultCode"] = json!(1);

    let response = post_callback(&app, &payload).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>(), json!({ "error": "Failed to process callback" }));
    assert_eq!(count_rows(&app.context, "payments").await, 0);
    assert_eq!(count_rows(&app.context, "alerts").await, 0);
}

#[tokio::test]
async fn test_incomplete_or_malformed_callbacks_are_rejected() {
    let app = spawn_app().await;
    app.create_tenant("Jane Wanjiru", "0712345678", "A1", 15000.0).await;

    let mut missing_receipt = successful_callback(15000.0, "254712345678", "NLJ7RT61SV");
    missing_receipt["Body"]["stkCallback"]["CallbackMetadata"]["Item"]
        .as_array_mut()
        .unwrap()
        .retain(|item| item["Name"] != "MpesaReceiptNumber");
    post_callback(&app, &missing_receipt).await.assert_status(StatusCode::BAD_REQUEST);

    post_callback(&app, &successful_callback(0.0, "254712345678", "NLJ7RT61SV"))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    app.server
        .post("/api/mpesa/callback")
        .text("{not json")
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    post_callback(&app, &json!({ "Body": {} })).await.assert_status(StatusCode::BAD_REQUEST);

    assert_eq!(count_rows(&app.context, "payments").await, 0);
    assert_eq!(count_rows(&app.context, "alerts").await, 0);
}

#[tokio::test]
async fn test_duplicate_delivery_is_recorded_twice() {
    let app = spawn_app().await;
    app.create_tenant("Jane Wanjiru", "0712345678", "A1", 15000.0).await;
    let payload = successful_callback(15000.0, "254712345678", "NLJ7RT61SV");

    post_callback(&app, &payload).await.assert_status(StatusCode::OK);
    post_callback(&app, &payload).await.assert_status(StatusCode::OK);

    assert_eq!(db::count_payments_with_reference(&app.context.db, "NLJ7RT61SV").await.unwrap(), 2);
    assert_eq!(count_rows(&app.context, "alerts").await, 2);
}

#[tokio::test]
async fn test_ambiguous_phone_prefers_exact_number() {
    let app = spawn_app().await;
    let first = app.create_tenant("Jane Wanjiru", "0712345678", "A1", 15000.0).await;
    let exact = app.create_tenant("John Kamau", "254712345678", "A2", 15000.0).await;

    post_callback(&app, &successful_callback(15000.0, "+254712345678", "NLJ7RT61SV"))
        .await
        .assert_status(StatusCode::OK);

    assert!(db::list_payments(&app.context.db, first["id"].as_i64()).await.unwrap().is_empty());
    assert_eq!(db::list_payments(&app.context.db, exact["id"].as_i64()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_failed_alert_write_rolls_back_payment() {
    let app = spawn_app().await;
    app.create_tenant("Jane Wanjiru", "0712345678", "A1", 15000.0).await;
    sqlx::query("DROP TABLE alerts").execute(&app.context.db).await.unwrap();

    let response = post_callback(&app, &successful_callback(15000.0, "254712345678", "NLJ7RT61SV")).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(count_rows(&app.context, "payments").await, 0);
}

#[tokio::test]
async fn test_initiate_stk_requires_staff_and_tenant() {
    let app = spawn_app().await;

    app.server
        .post("/api/mpesa/initiate-stk")
        .json(&json!({ "tenant_id": 1, "amount": 100 }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    app.post_as("/api/mpesa/initiate-stk", &app.caretaker_token())
        .json(&json!({ "tenant_id": 999, "amount": 100 }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_initiate_stk_without_credentials_fails() {
    let app = spawn_app().await;
    let tenant = app.create_tenant("Jane Wanjiru", "0712345678", "A1", 15000.0).await;

    let response = app
        .post_as("/api/mpesa/initiate-stk", &app.caretaker_token())
        .json(&json!({ "tenant_id": tenant["id"], "amount": 15000 }))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json::<Value>()["error"], "Failed to initiate STK push");
}

#[tokio::test]
async fn test_initiate_stk_rejects_fractional_shilling() {
    let app = spawn_app().await;
    let tenant = app.create_tenant("Jane Wanjiru", "0712345678", "A1", 15000.0).await;

    let response = app
        .post_as("/api/mpesa/initiate-stk", &app.caretaker_token())
        .json(&json!({ "tenant_id": tenant["id"], "amount": 0.5 }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "amount must be at least 1");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callbacks_are_all_recorded() {
    let dir = std::env::temp_dir().join(format!("rentdesk-{}", Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    let settings = cfg::DatabaseSettings {
        url: format!("sqlite:{}", dir.join("callbacks.sqlite").display()),
        max_connections: 8,
        ..Default::default()
    };
    let pool = app::create_db_context(&settings).await.unwrap();
    app::run_migrations(&pool).await.unwrap();

    let tenant = db::create_tenant(&pool, NewTenant {
        full_name: "Jane Wanjiru".to_string(),
        phone: "0712345678".to_string(),
        email: None,
        unit_number: "A1".to_string(),
        expected_rent: 15000.0,
        deposit_amount: 0.0,
        lease_start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        lease_end_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        notes: None,
    })
    .await
    .unwrap();

    let offset = FixedOffset::east_opt(3 * 3600).unwrap();
    let handles: Vec<_> = (0..16)
        .map(|i| {
            let processor = CallbackProcessor::new(pool.clone(), offset);
            tokio::spawn(async move {
                let event = CallbackEvent {
                    amount: 1000.0,
                    phone: "254712345678".to_string(),
                    transaction_id: format!("QCB{i:07}"),
                };
                processor.record(&event).await
            })
        })
        .collect();

    for handle in handles {
        let outcome = handle.await.unwrap();
        assert!(matches!(outcome, Ok(CallbackOutcome::Matched { .. })), "{outcome:?}");
    }
    assert_eq!(db::list_payments(&pool, Some(tenant.id)).await.unwrap().len(), 16);

    pool.close().await;
    std::fs::remove_dir_all(&dir).unwrap();
}
