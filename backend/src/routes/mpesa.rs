use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;

use crate::core;
use crate::db;
use crate::routes::error::{ApiError, ApiResult, OrNotFound, require_positive};
use crate::services::callback::CallbackOutcome;

#[derive(Deserialize)]
pub struct InitiateStk {
    pub tenant_id: i64,
    pub amount: f64,
}

/// Gateway callback, unauthenticated. The body is read raw so malformed JSON gets the
/// same 400 response as any other rejected callback.
pub async fn callback(State(context): State<core::ArcContext>, body: Bytes) -> Response {
    let payload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!("M-PESA callback body is not valid JSON: {}", e);
            return rejected();
        }
    };

    match context.callback_processor().process(payload).await {
        Ok(CallbackOutcome::Matched { .. }) => {
            (StatusCode::OK, Json(json!({ "message": "Payment processed successfully" }))).into_response()
        }
        Ok(CallbackOutcome::Unmatched { .. }) => {
            (StatusCode::OK, Json(json!({ "message": "Payment received but tenant not matched" }))).into_response()
        }
        Err(_) => rejected(),
    }
}

fn rejected() -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": "Failed to process callback" }))).into_response()
}

pub async fn initiate_stk(
    State(context): State<core::ArcContext>,
    payload: Result<Json<InitiateStk>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    require_positive(request.amount, "amount")?;
    // The gateway takes whole shillings.
    if request.amount < 1.0 {
        return Err(ApiError::BadRequest("amount must be at least 1".to_string()));
    }
    let tenant = db::get_tenant_by_id(&context.db, request.tenant_id).await.or_not_found("Tenant not found")?;

    let now = context.settings.server.local_now();
    let checkout_request_id = context
        .mpesa_client()
        .initiate_stk_push(&tenant.phone, request.amount, &tenant.full_name, &now)
        .await
        .map_err(|e| {
            tracing::error!(tenant_id = tenant.id, "STK push failed: {}", e);
            ApiError::Internal("Failed to initiate STK push".to_string())
        })?;

    tracing::info!(tenant_id = tenant.id, checkout_request_id = %checkout_request_id, "STK push initiated");
    Ok(Json(json!({ "message": "STK push initiated", "checkout_request_id": checkout_request_id })))
}
