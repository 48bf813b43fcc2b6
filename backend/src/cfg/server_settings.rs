use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ServerSettings {
    #[serde(default)]
    pub host: String,

    #[serde(default)]
    pub port: u16,

    #[serde(default)]
    pub log_directives: String,

    /// Offset of the property's local time from UTC, used for payment dates and monthly summaries
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            log_directives: "info,tower_http=info,axum=info".to_string(),
            utc_offset_minutes: 3 * 60, // East Africa Time
        }
    }
}

impl ServerSettings {
    #[must_use]
    pub fn local_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or_else(|| {
            tracing::warn!(utc_offset_minutes = self.utc_offset_minutes, "Invalid UTC offset, using UTC");
            Utc.fix()
        })
    }

    #[must_use]
    pub fn local_now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.local_offset())
    }

    #[must_use]
    pub fn local_today(&self) -> NaiveDate {
        self.local_now().date_naive()
    }
}
