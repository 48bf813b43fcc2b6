use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::core::{DbContext, DbError};

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum SmsStatus {
    Pending,
    Sent,
    Failed,
}

impl From<bool> for SmsStatus {
    fn from(delivered: bool) -> Self {
        if delivered { Self::Sent } else { Self::Failed }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, FromRow)]
pub struct SmsLog {
    pub id: i64,
    pub recipient_phone: String,
    pub recipient_name: Option<String>,
    pub message: String,
    pub message_type: Option<String>,
    pub status: SmsStatus,
    pub sent_by: Option<i64>,
    pub sent_at: NaiveDateTime,
}

#[derive(Debug)]
pub struct NewSmsLog {
    pub recipient_phone: String,
    pub recipient_name: Option<String>,
    pub message: String,
    pub message_type: String,
    pub status: SmsStatus,
    pub sent_by: Option<i64>,
}

const SMS_LOG_COLUMNS: &str = "id, recipient_phone, recipient_name, message, message_type, status, sent_by, sent_at";

pub async fn create_sms_log(db: &DbContext, new_log: NewSmsLog) -> Result<SmsLog, DbError> {
    let sql = format!(
        r"
        INSERT INTO sms_logs (recipient_phone, recipient_name, message, message_type, status, sent_by, sent_at)
        VALUES (?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
        RETURNING {SMS_LOG_COLUMNS}
        "
    );
    let log = sqlx::query_as::<_, SmsLog>(&sql)
        .bind(new_log.recipient_phone)
        .bind(new_log.recipient_name)
        .bind(new_log.message)
        .bind(new_log.message_type)
        .bind(new_log.status)
        .bind(new_log.sent_by)
        .fetch_one(db)
        .await?;
    Ok(log)
}

/// Most recent messages first.
pub async fn list_sms_logs(db: &DbContext, limit: i64) -> Result<Vec<SmsLog>, DbError> {
    let sql = format!("SELECT {SMS_LOG_COLUMNS} FROM sms_logs ORDER BY sent_at DESC, id DESC LIMIT ?");
    let logs = sqlx::query_as::<_, SmsLog>(&sql).bind(limit).fetch_all(db).await?;
    Ok(logs)
}
