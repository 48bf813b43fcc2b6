use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct JwtSettings {
    #[serde(default)]
    pub access_token_expiry: i64, // In seconds (e.g., 7 days = 604800)
}

impl Default for JwtSettings {
    fn default() -> Self {
        Self {
            access_token_expiry: 7 * 24 * 60 * 60, // staff sessions last a week
        }
    }
}
