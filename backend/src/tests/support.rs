use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::header;
use axum_test::{TestRequest, TestServer};
use serde_json::{Value, json};

use crate::app;
use crate::auth;
use crate::cfg;
use crate::core;
use crate::db::{self, Role, User};
use crate::services::sms::SmsSender;

pub const TEST_PASSWORD: &str = "abcdefghijklmnopqrstuvwxyz";
pub const ADMIN_USERNAME: &str = "admin";
pub const CARETAKER_USERNAME: &str = "caretaker";
pub const TENANT_USERNAME: &str = "tenant_user";
pub const JWT_SECRET: &str = "test__secret__key__for__jwt__testing";

#[derive(Clone, Debug)]
pub struct SentSms {
    pub phone: String,
    pub message: String,
    pub recipient_name: String,
}

/// SMS double that records every message and answers with a configurable outcome.
pub struct RecordingSms {
    sent: Mutex<Vec<SentSms>>,
    succeed: AtomicBool,
}

impl Default for RecordingSms {
    fn default() -> Self {
        Self { sent: Mutex::new(Vec::new()), succeed: AtomicBool::new(true) }
    }
}

impl RecordingSms {
    pub fn fail_deliveries(&self) {
        self.succeed.store(false, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentSms> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl SmsSender for RecordingSms {
    async fn send(&self, phone: &str, message: &str, recipient_name: &str) -> bool {
        self.sent.lock().unwrap().push(SentSms {
            phone: phone.to_string(),
            message: message.to_string(),
            recipient_name: recipient_name.to_string(),
        });
        self.succeed.load(Ordering::SeqCst)
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub context: core::ArcContext,
    pub sms: Arc<RecordingSms>,
    pub admin: User,
    pub caretaker: User,
    pub tenant_user: User,
}

pub fn test_settings() -> cfg::AppSettings {
    cfg::AppSettings {
        jwt: cfg::JwtSettings { access_token_expiry: 3600 },
        // a single connection keeps every query on the same in-memory database
        database: cfg::DatabaseSettings {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            ..Default::default()
        },
        ..Default::default()
    }
}

async fn create_user(db: &core::DbContext, username: &str, role: Role) -> User {
    db::create_user(db, db::NewUser {
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password_hash: auth::hash_password(TEST_PASSWORD).unwrap(),
        role,
        phone: None,
        full_name: Some(username.replace('_', " ")),
    })
    .await
    .unwrap()
}

pub async fn spawn_app() -> TestApp {
    let settings = test_settings();
    let db = app::create_db_context(&settings.database).await.unwrap();
    app::run_migrations(&db).await.unwrap();

    let admin = create_user(&db, ADMIN_USERNAME, Role::SuperAdmin).await;
    let caretaker = create_user(&db, CARETAKER_USERNAME, Role::Caretaker).await;
    let tenant_user = create_user(&db, TENANT_USERNAME, Role::Tenant).await;

    let jwt = auth::JwtContext::new(&settings.jwt, JWT_SECRET);
    let sms = Arc::new(RecordingSms::default());
    let context = core::Context::new(db, jwt, reqwest::Client::new(), sms.clone(), settings);

    let server = TestServer::new(app::create_router(context.clone())).unwrap();
    TestApp { server, context, sms, admin, caretaker, tenant_user }
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

impl TestApp {
    pub fn token_for(&self, user: &User) -> String {
        auth::generate_access_token(&self.context.jwt, user).unwrap()
    }

    pub fn caretaker_token(&self) -> String {
        self.token_for(&self.caretaker)
    }

    pub fn admin_token(&self) -> String {
        self.token_for(&self.admin)
    }

    pub fn get_as(&self, path: &str, token: &str) -> TestRequest {
        self.server.get(path).add_header(header::AUTHORIZATION, bearer(token))
    }

    pub fn post_as(&self, path: &str, token: &str) -> TestRequest {
        self.server.post(path).add_header(header::AUTHORIZATION, bearer(token))
    }

    pub fn put_as(&self, path: &str, token: &str) -> TestRequest {
        self.server.put(path).add_header(header::AUTHORIZATION, bearer(token))
    }

    pub fn delete_as(&self, path: &str, token: &str) -> TestRequest {
        self.server.delete(path).add_header(header::AUTHORIZATION, bearer(token))
    }

    /// Creates a tenant through the API and returns its JSON.
    pub async fn create_tenant(&self, full_name: &str, phone: &str, unit_number: &str, expected_rent: f64) -> Value {
        let response = self
            .post_as("/api/tenants", &self.caretaker_token())
            .json(&json!({
                "full_name": full_name,
                "phone": phone,
                "unit_number": unit_number,
                "expected_rent": expected_rent,
                "lease_start_date": "2025-01-01",
                "lease_end_date": "2026-12-31",
            }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json::<Value>()["tenant"].clone()
    }
}

/// STK callback body as Safaricom sends it for a successful payment.
pub fn successful_callback(amount: f64, phone: &str, receipt: &str) -> Value {
    json!({
        "Body": {
            "stkCallback": {
                "MerchantRequestID": "29115-34620561-1",
                "CheckoutRequestID": "ws_CO_191220191020363925",
                "ResultCode": 0,
                "ResultDesc": "The service request is processed successfully.",
                "CallbackMetadata": {
                    "Item": [
                        { "Name": "Amount", "Value": amount },
                        { "Name": "MpesaReceiptNumber", "Value": receipt },
                        { "Name": "TransactionDate", "Value": 20_250_305_102_115_i64 },
                        { "Name": "PhoneNumber", "Value": phone }
                    ]
                }
            }
        }
    })
}

pub async fn count_rows(context: &core::ArcContext, table: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(&context.db)
        .await
        .unwrap()
}
