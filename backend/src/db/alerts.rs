use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::SqliteExecutor;

use crate::core::{DbContext, DbError};

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum AlertKind {
    MpesaPaymentReceived,
    MpesaUnmatched,
    PaymentLogged,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
}

/// Audit event surfaced to staff. Only `is_read` ever changes after insert.
#[derive(Clone, Debug, Serialize, Deserialize, FromRow)]
pub struct Alert {
    pub id: i64,
    pub alert_type: AlertKind,
    pub message: String,
    pub severity: Severity,
    pub is_read: bool,
    pub related_tenant_id: Option<i64>,
    pub related_payment_id: Option<i64>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug)]
pub struct NewAlert {
    pub alert_type: AlertKind,
    pub message: String,
    pub severity: Severity,
    pub related_tenant_id: Option<i64>,
    pub related_payment_id: Option<i64>,
}

const ALERT_COLUMNS: &str =
    "id, alert_type, message, severity, is_read, related_tenant_id, related_payment_id, created_at";

pub async fn create_alert<'e>(db: impl SqliteExecutor<'e>, new_alert: NewAlert) -> Result<Alert, DbError> {
    let sql = format!(
        r"
        INSERT INTO alerts (alert_type, message, severity, related_tenant_id, related_payment_id, created_at)
        VALUES (?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
        RETURNING {ALERT_COLUMNS}
        "
    );
    let alert = sqlx::query_as::<_, Alert>(&sql)
        .bind(new_alert.alert_type)
        .bind(new_alert.message)
        .bind(new_alert.severity)
        .bind(new_alert.related_tenant_id)
        .bind(new_alert.related_payment_id)
        .fetch_one(db)
        .await?;
    Ok(alert)
}

/// Newest alerts first.
pub async fn list_alerts(db: &DbContext, unread_only: bool, limit: i64) -> Result<Vec<Alert>, DbError> {
    let sql = format!(
        r"
        SELECT {ALERT_COLUMNS} FROM alerts
        WHERE (? = 0 OR is_read = 0)
        ORDER BY created_at DESC, id DESC
        LIMIT ?
        "
    );
    let alerts = sqlx::query_as::<_, Alert>(&sql)
        .bind(unread_only)
        .bind(limit)
        .fetch_all(db)
        .await?;
    Ok(alerts)
}

pub async fn mark_alert_read(db: &DbContext, id: i64) -> Result<(), DbError> {
    let result = sqlx::query("UPDATE alerts SET is_read = 1 WHERE id = ?").bind(id).execute(db).await?;
    if result.rows_affected() == 0 {
        return Err(DbError::RowNotFound);
    }
    Ok(())
}
