use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::SqliteExecutor;

use crate::core::{DbContext, DbError};
use crate::reconcile::{self, PaymentStatus};

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize, sqlx::Type)]
pub enum PaymentMethod {
    Cash,
    #[serde(rename = "M-PESA")]
    #[sqlx(rename = "M-PESA")]
    Mpesa,
    #[serde(rename = "Bank Transfer")]
    #[sqlx(rename = "Bank Transfer")]
    BankTransfer,
}

#[derive(Clone, Debug, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: i64,
    pub tenant_id: i64,
    pub amount: f64,
    pub payment_date: NaiveDate,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub transaction_reference: Option<String>,
    pub remaining_amount: f64,
    pub notes: Option<String>,
    pub logged_by: Option<i64>,
    pub receipt_sent: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewPayment {
    pub tenant_id: i64,
    pub amount: f64,
    pub payment_date: NaiveDate,
    pub payment_method: PaymentMethod,
    pub transaction_reference: Option<String>,
    pub notes: Option<String>,
    pub logged_by: Option<i64>,
}

/// A payment together with the tenant it was recorded against.
#[derive(Debug, Serialize, FromRow)]
pub struct AuditEntry {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub payment: Payment,
    pub tenant_name: String,
    pub unit_number: String,
}

const PAYMENT_COLUMNS: &str = "id, tenant_id, amount, payment_date, payment_method, payment_status, \
    transaction_reference, remaining_amount, notes, logged_by, receipt_sent, created_at, updated_at";

/// Inserts a payment; status and remaining balance are derived from `expected_rent` here
/// and never recomputed afterwards.
pub async fn create_payment<'e>(
    db: impl SqliteExecutor<'e>,
    new_payment: &NewPayment,
    expected_rent: f64,
) -> Result<Payment, DbError> {
    let classification = reconcile::classify(new_payment.amount, expected_rent);
    let sql = format!(
        r"
        INSERT INTO payments (tenant_id, amount, payment_date, payment_method, payment_status,
                              transaction_reference, remaining_amount, notes, logged_by,
                              created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        RETURNING {PAYMENT_COLUMNS}
        "
    );
    let payment = sqlx::query_as::<_, Payment>(&sql)
        .bind(new_payment.tenant_id)
        .bind(new_payment.amount)
        .bind(new_payment.payment_date)
        .bind(new_payment.payment_method)
        .bind(classification.status)
        .bind(new_payment.transaction_reference.as_deref())
        .bind(classification.remaining_amount)
        .bind(new_payment.notes.as_deref())
        .bind(new_payment.logged_by)
        .fetch_one(db)
        .await?;
    Ok(payment)
}

pub async fn get_payment_by_id(db: &DbContext, id: i64) -> Result<Payment, DbError> {
    let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = ?");
    let payment = sqlx::query_as::<_, Payment>(&sql).bind(id).fetch_one(db).await?;
    Ok(payment)
}

/// Payments newest payment date first, optionally for a single tenant.
pub async fn list_payments(db: &DbContext, tenant_id: Option<i64>) -> Result<Vec<Payment>, DbError> {
    let sql = format!(
        r"
        SELECT {PAYMENT_COLUMNS} FROM payments
        WHERE (? IS NULL OR tenant_id = ?)
        ORDER BY payment_date DESC, id DESC
        "
    );
    let payments = sqlx::query_as::<_, Payment>(&sql)
        .bind(tenant_id)
        .bind(tenant_id)
        .fetch_all(db)
        .await?;
    Ok(payments)
}

/// Payments dated within `[from, until)`.
pub async fn list_payments_between(db: &DbContext, from: NaiveDate, until: NaiveDate) -> Result<Vec<Payment>, DbError> {
    let sql = format!(
        r"
        SELECT {PAYMENT_COLUMNS} FROM payments
        WHERE payment_date >= ? AND payment_date < ?
        ORDER BY payment_date, id
        "
    );
    let payments = sqlx::query_as::<_, Payment>(&sql).bind(from).bind(until).fetch_all(db).await?;
    Ok(payments)
}

pub async fn count_payments_with_reference(db: &DbContext, transaction_reference: &str) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM payments WHERE transaction_reference = ?")
        .bind(transaction_reference)
        .fetch_one(db)
        .await?;
    Ok(count)
}

pub async fn mark_receipt_sent(db: &DbContext, id: i64) -> Result<(), DbError> {
    let result = sqlx::query("UPDATE payments SET receipt_sent = 1, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::RowNotFound);
    }
    Ok(())
}

/// Every payment, most recently recorded first, with tenant name and unit.
pub async fn list_audit_trail(db: &DbContext) -> Result<Vec<AuditEntry>, DbError> {
    let entries = sqlx::query_as::<_, AuditEntry>(
        r"
        SELECT
            p.id, p.tenant_id, p.amount, p.payment_date, p.payment_method, p.payment_status,
            p.transaction_reference, p.remaining_amount, p.notes, p.logged_by, p.receipt_sent,
            p.created_at, p.updated_at,
            COALESCE(t.full_name, 'Unknown') AS tenant_name,
            COALESCE(t.unit_number, 'Unknown') AS unit_number
        FROM payments p
        LEFT JOIN tenants t ON t.id = p.tenant_id
        ORDER BY p.created_at DESC, p.id DESC
        ",
    )
    .fetch_all(db)
    .await?;
    Ok(entries)
}
