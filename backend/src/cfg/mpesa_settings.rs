use serde::{Deserialize, Serialize};

const SANDBOX_BASE_URL: &str = "https://sandbox.safaricom.co.ke";
const PRODUCTION_BASE_URL: &str = "https://api.safaricom.co.ke";

/// Daraja (M-PESA) API credentials and STK push parameters.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MpesaSettings {
    #[serde(default)]
    pub consumer_key: String,

    #[serde(default)]
    pub consumer_secret: String,

    #[serde(default)]
    pub shortcode: String,

    #[serde(default)]
    pub passkey: String,

    #[serde(default)]
    pub callback_url: String,

    /// `sandbox` targets the Daraja sandbox, anything else the live API
    #[serde(default)]
    pub environment: String,
}

impl Default for MpesaSettings {
    fn default() -> Self {
        Self {
            consumer_key: String::new(),
            consumer_secret: String::new(),
            shortcode: String::new(),
            passkey: String::new(),
            callback_url: String::new(),
            environment: "sandbox".to_string(),
        }
    }
}

impl MpesaSettings {
    #[must_use]
    pub fn base_url(&self) -> &'static str {
        if self.environment == "sandbox" { SANDBOX_BASE_URL } else { PRODUCTION_BASE_URL }
    }
}
