//! M-PESA STK push callback processing.
//!
//! A callback either records a classified payment plus a `success` alert for the matched
//! tenant, records a single `warning` alert for staff to reconcile by hand, or is rejected
//! with nothing written. Each outcome is committed as one transaction.
//!
//! Callbacks carry no idempotency key: delivering the same payload twice records two
//! payments and two alerts.

use chrono::{FixedOffset, Utc};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::{DbContext, DbError};
use crate::db::{self, AlertKind, NewAlert, NewPayment, PaymentMethod, Severity, Tenant};
use crate::reconcile;

#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("Malformed callback payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Gateway reported a failed transaction (result code {0})")]
    GatewayFailure(i64),

    #[error("Callback metadata is missing {0}")]
    MissingField(&'static str),

    #[error("Callback amount must be a positive finite number, got {0}")]
    InvalidAmount(f64),

    #[error("Failed to record callback: {0}")]
    Persistence(#[from] DbError),
}

#[derive(Debug, Deserialize)]
pub struct CallbackPayload {
    #[serde(rename = "Body")]
    pub body: CallbackBody,
}

#[derive(Debug, Deserialize)]
pub struct CallbackBody {
    #[serde(rename = "stkCallback")]
    pub stk_callback: StkCallback,
}

#[derive(Debug, Deserialize)]
pub struct StkCallback {
    #[serde(rename = "ResultCode")]
    pub result_code: i64,

    #[serde(rename = "ResultDesc", default)]
    pub result_desc: Option<String>,

    #[serde(rename = "CheckoutRequestID", default)]
    pub checkout_request_id: Option<String>,

    #[serde(rename = "CallbackMetadata", default)]
    pub callback_metadata: Option<CallbackMetadata>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CallbackMetadata {
    #[serde(rename = "Item", default)]
    pub items: Vec<MetadataItem>,
}

#[derive(Debug, Deserialize)]
pub struct MetadataItem {
    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "Value", default)]
    pub value: Option<Value>,
}

/// The three facts a successful callback must carry. Lives for one processing call.
#[derive(Clone, Debug, PartialEq)]
pub struct CallbackEvent {
    pub amount: f64,
    pub phone: String,
    pub transaction_id: String,
}

fn value_as_amount(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Phone numbers arrive as JSON numbers (`254712345678`); receipts as strings.
fn value_as_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

impl CallbackEvent {
    pub fn from_json(payload: Value) -> Result<Self, CallbackError> {
        let payload: CallbackPayload = serde_json::from_value(payload)?;
        Self::from_payload(&payload)
    }

    pub fn from_payload(payload: &CallbackPayload) -> Result<Self, CallbackError> {
        let callback = &payload.body.stk_callback;
        tracing::debug!(
            result_code = callback.result_code,
            result_desc = ?callback.result_desc,
            checkout_request_id = ?callback.checkout_request_id,
            "M-PESA callback received"
        );
        if callback.result_code != 0 {
            return Err(CallbackError::GatewayFailure(callback.result_code));
        }

        let items = callback.callback_metadata.as_ref().map(|m| m.items.as_slice()).unwrap_or_default();
        // A repeated name resolves to its last occurrence.
        let item = |name: &str| items.iter().rev().find(|item| item.name == name).and_then(|item| item.value.as_ref());

        let amount = item("Amount").and_then(value_as_amount).ok_or(CallbackError::MissingField("Amount"))?;
        let phone = item("PhoneNumber").and_then(value_as_text).ok_or(CallbackError::MissingField("PhoneNumber"))?;
        let transaction_id = item("MpesaReceiptNumber")
            .and_then(value_as_text)
            .ok_or(CallbackError::MissingField("MpesaReceiptNumber"))?;

        // Checked before classification, which assumes a positive finite amount.
        if !amount.is_finite() || amount <= 0.0 {
            return Err(CallbackError::InvalidAmount(amount));
        }

        Ok(Self { amount, phone, transaction_id })
    }
}

#[derive(Debug)]
pub enum CallbackOutcome {
    Matched { tenant: Tenant, payment: db::Payment, alert: db::Alert },
    Unmatched { alert: db::Alert },
}

pub struct CallbackProcessor {
    db: DbContext,
    local_offset: FixedOffset,
}

impl CallbackProcessor {
    #[must_use]
    pub const fn new(db: DbContext, local_offset: FixedOffset) -> Self {
        Self { db, local_offset }
    }

    pub async fn process(&self, payload: Value) -> Result<CallbackOutcome, CallbackError> {
        let event = CallbackEvent::from_json(payload).inspect_err(|e| {
            tracing::warn!("M-PESA callback rejected: {}", e);
        })?;
        self.record(&event).await.inspect_err(|e| {
            tracing::error!(transaction_id = %event.transaction_id, "Failed to process M-PESA callback: {}", e);
        })
    }

    /// Matches the payer against active tenants and commits the payment and alert together.
    /// The write lock is taken up front so concurrent callbacks queue on the busy timeout
    /// instead of failing to upgrade a read transaction.
    pub async fn record(&self, event: &CallbackEvent) -> Result<CallbackOutcome, CallbackError> {
        let mut tx = self.db.begin_with("BEGIN IMMEDIATE").await.map_err(DbError::from)?;

        let tenants = db::list_active_tenants(&mut *tx).await?;
        let matched = reconcile::match_tenant(&event.phone, tenants.iter().map(|t| (t.id, t.phone.as_str())))
            .and_then(|id| tenants.into_iter().find(|t| t.id == id));

        let outcome = match matched {
            Some(tenant) => {
                let new_payment = NewPayment {
                    tenant_id: tenant.id,
                    amount: event.amount,
                    payment_date: Utc::now().with_timezone(&self.local_offset).date_naive(),
                    payment_method: PaymentMethod::Mpesa,
                    transaction_reference: Some(event.transaction_id.clone()),
                    notes: None,
                    logged_by: None,
                };
                let payment = db::create_payment(&mut *tx, &new_payment, tenant.expected_rent).await?;
                let alert = db::create_alert(&mut *tx, NewAlert {
                    alert_type: AlertKind::MpesaPaymentReceived,
                    message: format!("M-PESA payment of KES {} received from {}", payment.amount, tenant.full_name),
                    severity: Severity::Success,
                    related_tenant_id: Some(tenant.id),
                    related_payment_id: Some(payment.id),
                })
                .await?;
                CallbackOutcome::Matched { tenant, payment, alert }
            }
            None => {
                let alert = db::create_alert(&mut *tx, NewAlert {
                    alert_type: AlertKind::MpesaUnmatched,
                    message: format!("Unmatched M-PESA payment of KES {} from {}", event.amount, event.phone),
                    severity: Severity::Warning,
                    related_tenant_id: None,
                    related_payment_id: None,
                })
                .await?;
                CallbackOutcome::Unmatched { alert }
            }
        };

        tx.commit().await.map_err(DbError::from)?;

        match &outcome {
            CallbackOutcome::Matched { tenant, payment, alert } => tracing::info!(
                tenant_id = tenant.id,
                payment_id = payment.id,
                alert_id = alert.id,
                transaction_id = %event.transaction_id,
                status = ?payment.payment_status,
                "M-PESA payment recorded"
            ),
            CallbackOutcome::Unmatched { alert } => tracing::warn!(
                alert_id = alert.id,
                phone = %event.phone,
                transaction_id = %event.transaction_id,
                "M-PESA payment did not match any active tenant"
            ),
        }
        Ok(outcome)
    }
}
