use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SmsSettings {
    /// `twilio` sends through Twilio; any other value only logs outgoing messages
    #[serde(default)]
    pub provider: String,

    #[serde(default)]
    pub twilio_account_sid: String,

    #[serde(default)]
    pub twilio_auth_token: String,

    #[serde(default)]
    pub twilio_phone_number: String,
}

impl Default for SmsSettings {
    fn default() -> Self {
        Self {
            provider: "twilio".to_string(),
            twilio_account_sid: String::new(),
            twilio_auth_token: String::new(),
            twilio_phone_number: String::new(),
        }
    }
}

impl SmsSettings {
    #[must_use]
    pub fn has_twilio_credentials(&self) -> bool {
        !self.twilio_account_sid.is_empty() && !self.twilio_auth_token.is_empty() && !self.twilio_phone_number.is_empty()
    }
}
