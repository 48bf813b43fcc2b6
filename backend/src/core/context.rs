use std::sync::Arc;

use crate::auth;
use crate::cfg;
use crate::services::callback::CallbackProcessor;
use crate::services::mpesa::MpesaClient;
use crate::services::notifications::NotificationDispatcher;
use crate::services::sms::SmsSender;

pub type ArcContext = Arc<Context>;

pub type DbContext = sqlx::SqlitePool;

#[derive(Clone)]
pub struct Context {
    pub db: DbContext,
    pub jwt: auth::JwtContext,
    pub settings: cfg::AppSettings,
    pub http_client: reqwest::Client,
    pub sms: Arc<dyn SmsSender>,
}

impl Context {
    #[must_use]
    pub fn new(
        db: DbContext,
        jwt: auth::JwtContext,
        http_client: reqwest::Client,
        sms: Arc<dyn SmsSender>,
        settings: cfg::AppSettings,
    ) -> ArcContext {
        Self {
            db,
            jwt,
            settings,
            http_client,
            sms,
        }
        .into()
    }

    #[must_use]
    pub fn callback_processor(&self) -> CallbackProcessor {
        CallbackProcessor::new(self.db.clone(), self.settings.server.local_offset())
    }

    #[must_use]
    pub fn mpesa_client(&self) -> MpesaClient {
        MpesaClient::new(self.settings.mpesa.clone(), self.http_client.clone())
    }

    #[must_use]
    pub fn notifications(&self) -> NotificationDispatcher {
        NotificationDispatcher::new(self.db.clone(), self.sms.clone())
    }
}
