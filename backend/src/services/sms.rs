use std::sync::Arc;

use async_trait::async_trait;

use crate::cfg;

const TWILIO_API_URL: &str = "https://api.twilio.com/2010-04-01";

/// Outbound SMS collaborator. Delivery failures are logged and reported as `false`.
#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send(&self, phone: &str, message: &str, recipient_name: &str) -> bool;
}

/// Creates the sender selected by `sms.provider`.
#[must_use]
pub fn create_sms_sender(settings: &cfg::SmsSettings, http_client: reqwest::Client) -> Arc<dyn SmsSender> {
    if settings.provider == "twilio" {
        tracing::info!("SMS provider: twilio");
        Arc::new(TwilioSms::new(settings.clone(), http_client))
    } else {
        tracing::info!(provider = %settings.provider, "SMS provider is not twilio, messages will only be logged");
        Arc::new(LogOnlySms)
    }
}

pub struct TwilioSms {
    settings: cfg::SmsSettings,
    http_client: reqwest::Client,
}

impl TwilioSms {
    #[must_use]
    pub const fn new(settings: cfg::SmsSettings, http_client: reqwest::Client) -> Self {
        Self { settings, http_client }
    }

    async fn post_message(&self, phone: &str, message: &str) -> Result<(), reqwest::Error> {
        let url = format!("{TWILIO_API_URL}/Accounts/{}/Messages.json", self.settings.twilio_account_sid);
        let form = [
            ("To", phone),
            ("From", self.settings.twilio_phone_number.as_str()),
            ("Body", message),
        ];
        self.http_client
            .post(url)
            .basic_auth(&self.settings.twilio_account_sid, Some(&self.settings.twilio_auth_token))
            .form(&form)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl SmsSender for TwilioSms {
    async fn send(&self, phone: &str, message: &str, recipient_name: &str) -> bool {
        if !self.settings.has_twilio_credentials() {
            tracing::warn!("Twilio credentials not configured. SMS not sent.");
            return false;
        }
        match self.post_message(phone, message).await {
            Ok(()) => {
                tracing::info!(phone, recipient_name, "SMS sent via Twilio");
                true
            }
            Err(e) => {
                tracing::error!(phone, recipient_name, "Failed to send SMS via Twilio: {}", e);
                false
            }
        }
    }
}

/// Development sender: writes the message to the log and reports success.
pub struct LogOnlySms;

#[async_trait]
impl SmsSender for LogOnlySms {
    async fn send(&self, phone: &str, message: &str, recipient_name: &str) -> bool {
        tracing::info!("SMS to {} ({}): {}", phone, recipient_name, message);
        true
    }
}
