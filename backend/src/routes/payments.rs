use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use crate::auth::AccessTokenClaims;
use crate::core::{self, DbError};
use crate::db::{self, AlertKind, NewAlert, NewPayment, PaymentMethod, Severity};
use crate::routes::error::{ApiError, ApiResult, OrNotFound, require_positive};

#[derive(Deserialize)]
pub struct PaymentQuery {
    pub tenant_id: Option<i64>,
}

#[derive(Deserialize)]
pub struct LogPayment {
    pub tenant_id: i64,
    pub amount: f64,
    /// Defaults to today in the property's local time.
    pub payment_date: Option<NaiveDate>,
    pub payment_method: PaymentMethod,
    pub transaction_reference: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub send_receipt: bool,
}

pub async fn list_payments(
    State(context): State<core::ArcContext>,
    Query(query): Query<PaymentQuery>,
) -> ApiResult<impl IntoResponse> {
    let payments = db::list_payments(&context.db, query.tenant_id).await?;
    Ok(Json(json!({ "payments": payments })))
}

pub async fn get_payment(State(context): State<core::ArcContext>, Path(id): Path<i64>) -> ApiResult<impl IntoResponse> {
    let payment = db::get_payment_by_id(&context.db, id).await.or_not_found("Payment not found")?;
    Ok(Json(json!({ "payment": payment })))
}

/// Records a manual payment and its `payment_logged` alert in one transaction,
/// then optionally sends the receipt.
pub async fn log_payment(
    State(context): State<core::ArcContext>,
    Extension(claims): Extension<AccessTokenClaims>,
    payload: Result<Json<LogPayment>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    require_positive(request.amount, "amount")?;
    let tenant = db::get_tenant_by_id(&context.db, request.tenant_id).await.or_not_found("Tenant not found")?;
    let user_id = claims.user_id()?;

    let new_payment = NewPayment {
        tenant_id: tenant.id,
        amount: request.amount,
        payment_date: request.payment_date.unwrap_or_else(|| context.settings.server.local_today()),
        payment_method: request.payment_method,
        transaction_reference: request.transaction_reference.filter(|r| !r.trim().is_empty()),
        notes: request.notes,
        logged_by: Some(user_id),
    };

    let mut tx = context.db.begin().await.map_err(DbError::from)?;
    let mut payment = db::create_payment(&mut *tx, &new_payment, tenant.expected_rent).await?;
    db::create_alert(&mut *tx, NewAlert {
        alert_type: AlertKind::PaymentLogged,
        message: format!("Payment of KES {} logged for {} - Unit {}", payment.amount, tenant.full_name, tenant.unit_number),
        severity: Severity::Info,
        related_tenant_id: Some(tenant.id),
        related_payment_id: Some(payment.id),
    })
    .await?;
    tx.commit().await.map_err(DbError::from)?;

    tracing::info!(
        payment_id = payment.id,
        tenant_id = tenant.id,
        logged_by = user_id,
        status = ?payment.payment_status,
        "Payment logged"
    );

    // The payment is committed; a failed receipt is reported in the logs only.
    if request.send_receipt {
        match context.notifications().send_payment_receipt(&payment, &tenant, Some(user_id)).await {
            Ok(true) => {
                db::mark_receipt_sent(&context.db, payment.id).await?;
                payment.receipt_sent = true;
            }
            Ok(false) => tracing::warn!(payment_id = payment.id, "Receipt could not be delivered"),
            Err(e) => tracing::error!(payment_id = payment.id, "Failed to send receipt: {}", e),
        }
    }

    Ok((StatusCode::CREATED, Json(json!({ "message": "Payment logged successfully", "payment": payment }))))
}

pub async fn send_receipt(
    State(context): State<core::ArcContext>,
    Extension(claims): Extension<AccessTokenClaims>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let payment = db::get_payment_by_id(&context.db, id).await.or_not_found("Payment not found")?;
    let tenant = db::get_tenant_by_id(&context.db, payment.tenant_id).await.or_not_found("Tenant not found")?;

    let delivered = context.notifications().send_payment_receipt(&payment, &tenant, Some(claims.user_id()?)).await?;
    if !delivered {
        return Err(ApiError::Internal("Failed to send receipt".to_string()));
    }
    db::mark_receipt_sent(&context.db, payment.id).await?;
    Ok(Json(json!({ "message": "Receipt sent successfully" })))
}

pub async fn audit_trail(State(context): State<core::ArcContext>) -> ApiResult<impl IntoResponse> {
    let entries = db::list_audit_trail(&context.db).await?;
    Ok(Json(json!({ "audit_trail": entries })))
}
