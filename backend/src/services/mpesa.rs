use base64::Engine as _;
use base64::engine::general_purpose;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cfg;

#[derive(Debug, Error)]
pub enum MpesaError {
    #[error("M-PESA is not configured: {0} is empty")]
    NotConfigured(&'static str),

    #[error("M-PESA request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("M-PESA response did not include {0}")]
    MissingResponseField(&'static str),
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct StkPushRequest<'a> {
    business_short_code: &'a str,
    password: String,
    timestamp: String,
    transaction_type: &'static str,
    amount: i64,
    party_a: &'a str,
    party_b: &'a str,
    phone_number: &'a str,
    #[serde(rename = "CallBackURL")]
    callback_url: &'a str,
    account_reference: &'a str,
    transaction_desc: &'static str,
}

#[derive(Debug, Deserialize)]
struct StkPushResponse {
    #[serde(rename = "CheckoutRequestID")]
    checkout_request_id: Option<String>,
}

/// STK push password: base64 of shortcode, passkey and timestamp concatenated.
#[must_use]
pub fn stk_password(shortcode: &str, passkey: &str, timestamp: &str) -> String {
    general_purpose::STANDARD.encode(format!("{shortcode}{passkey}{timestamp}"))
}

/// Timestamp format expected by the STK push API (`YYYYMMDDHHMMSS`).
#[must_use]
pub fn stk_timestamp(now: &DateTime<FixedOffset>) -> String {
    now.format("%Y%m%d%H%M%S").to_string()
}

/// Daraja API client. One attempt per call, no retries.
pub struct MpesaClient {
    settings: cfg::MpesaSettings,
    http_client: reqwest::Client,
}

impl MpesaClient {
    #[must_use]
    pub const fn new(settings: cfg::MpesaSettings, http_client: reqwest::Client) -> Self {
        Self { settings, http_client }
    }

    fn ensure_configured(&self) -> Result<(), MpesaError> {
        let required = [
            ("consumer_key", &self.settings.consumer_key),
            ("consumer_secret", &self.settings.consumer_secret),
            ("shortcode", &self.settings.shortcode),
            ("passkey", &self.settings.passkey),
            ("callback_url", &self.settings.callback_url),
        ];
        match required.iter().find(|(_, value)| value.is_empty()) {
            Some((name, _)) => Err(MpesaError::NotConfigured(*name)),
            None => Ok(()),
        }
    }

    pub async fn get_access_token(&self) -> Result<String, MpesaError> {
        let url = format!("{}/oauth/v1/generate?grant_type=client_credentials", self.settings.base_url());
        let response: AccessTokenResponse = self
            .http_client
            .get(url)
            .basic_auth(&self.settings.consumer_key, Some(&self.settings.consumer_secret))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        response.access_token.ok_or(MpesaError::MissingResponseField("access_token"))
    }

    /// Prompts the payer's phone to authorise a payment and returns the checkout request id.
    #[allow(clippy::cast_possible_truncation)] // the API takes whole shillings
    pub async fn initiate_stk_push(
        &self,
        phone: &str,
        amount: f64,
        account_reference: &str,
        now: &DateTime<FixedOffset>,
    ) -> Result<String, MpesaError> {
        self.ensure_configured()?;
        let access_token = self.get_access_token().await?;

        let timestamp = stk_timestamp(now);
        let request = StkPushRequest {
            business_short_code: &self.settings.shortcode,
            password: stk_password(&self.settings.shortcode, &self.settings.passkey, &timestamp),
            timestamp,
            transaction_type: "CustomerPayBillOnline",
            amount: amount.trunc() as i64,
            party_a: phone,
            party_b: &self.settings.shortcode,
            phone_number: phone,
            callback_url: &self.settings.callback_url,
            account_reference,
            transaction_desc: "Rent Payment",
        };

        let url = format!("{}/mpesa/stkpush/v1/processrequest", self.settings.base_url());
        let response: StkPushResponse = self
            .http_client
            .post(url)
            .bearer_auth(access_token)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        response.checkout_request_id.ok_or(MpesaError::MissingResponseField("CheckoutRequestID"))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_stk_password_is_base64_of_concatenation() {
        let password = stk_password("174379", "passkey", "20250301120000");
        let decoded = general_purpose::STANDARD.decode(password).unwrap();
        assert_eq!(decoded, b"174379passkey20250301120000");
    }

    #[test]
    fn test_stk_timestamp_uses_local_time() {
        let eat = FixedOffset::east_opt(3 * 3600).unwrap();
        let now = eat.with_ymd_and_hms(2025, 3, 1, 9, 5, 7).unwrap();
        assert_eq!(stk_timestamp(&now), "20250301090507");
    }

    #[test]
    fn test_request_uses_daraja_field_names() {
        let request = StkPushRequest {
            business_short_code: "174379",
            password: "pw".to_string(),
            timestamp: "20250301090507".to_string(),
            transaction_type: "CustomerPayBillOnline",
            amount: 1500,
            party_a: "254712345678",
            party_b: "174379",
            phone_number: "254712345678",
            callback_url: "https://example.com/api/mpesa/callback",
            account_reference: "Jane Wanjiru",
            transaction_desc: "Rent Payment",
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["BusinessShortCode"], "174379");
        assert_eq!(json["PartyA"], "254712345678");
        assert_eq!(json["CallBackURL"], "https://example.com/api/mpesa/callback");
        assert_eq!(json["Amount"], 1500);
        assert_eq!(json["TransactionDesc"], "Rent Payment");
    }

    #[tokio::test]
    async fn test_unconfigured_client_fails_before_any_request() {
        let client = MpesaClient::new(cfg::MpesaSettings::default(), reqwest::Client::new());
        let eat = FixedOffset::east_opt(3 * 3600).unwrap();
        let now = eat.with_ymd_and_hms(2025, 3, 1, 9, 5, 7).unwrap();
        let result = client.initiate_stk_push("254712345678", 1000.0, "Jane", &now).await;
        assert!(matches!(result, Err(MpesaError::NotConfigured("consumer_key"))));
    }
}
