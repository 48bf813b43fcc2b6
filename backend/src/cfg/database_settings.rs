use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DatabaseSettings {
    /// SQLite URL, e.g. `sqlite:rentdesk.sqlite` or `sqlite::memory:`
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub max_connections: u32,

    /// How long a writer waits on a locked database before giving up
    #[serde(default)]
    pub busy_timeout_secs: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "sqlite:rentdesk.sqlite".to_string(),
            max_connections: 5,
            busy_timeout_secs: 30,
        }
    }
}

impl DatabaseSettings {
    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }

    /// Connection options with foreign keys enforced; file databases use WAL.
    pub fn connect_options(&self) -> Result<SqliteConnectOptions, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(&self.url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(self.busy_timeout_secs));
        if self.is_in_memory() {
            Ok(options)
        } else {
            Ok(options.journal_mode(SqliteJournalMode::Wal))
        }
    }
}
