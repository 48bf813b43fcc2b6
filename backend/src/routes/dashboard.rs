use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use chrono::Days;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::core;
use crate::db::{self, Tenant};
use crate::routes::error::{ApiResult, OrNotFound};
use crate::services::dashboard;

const ALERT_LIMIT: i64 = 50;
const LEASE_WINDOW_DAYS: u64 = 30;

#[derive(Deserialize)]
pub struct AlertQuery {
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Serialize)]
pub struct ExpiringLease {
    #[serde(flatten)]
    pub tenant: Tenant,
    pub days_remaining: i64,
}

pub async fn summary(State(context): State<core::ArcContext>) -> ApiResult<impl IntoResponse> {
    let (month_start, next_month) = dashboard::month_bounds(context.settings.server.local_today());
    let tenants = db::list_active_tenants(&context.db).await?;
    let payments = db::list_payments_between(&context.db, month_start, next_month).await?;
    Ok(Json(dashboard::summarize(&tenants, &payments)))
}

pub async fn alerts(
    State(context): State<core::ArcContext>,
    Query(query): Query<AlertQuery>,
) -> ApiResult<impl IntoResponse> {
    let alerts = db::list_alerts(&context.db, query.unread_only, ALERT_LIMIT).await?;
    Ok(Json(json!({ "alerts": alerts })))
}

pub async fn mark_alert_read(State(context): State<core::ArcContext>, Path(id): Path<i64>) -> ApiResult<impl IntoResponse> {
    db::mark_alert_read(&context.db, id).await.or_not_found("Alert not found")?;
    Ok(Json(json!({ "message": "Alert marked as read" })))
}

pub async fn lease_expiring(State(context): State<core::ArcContext>) -> ApiResult<impl IntoResponse> {
    let today = context.settings.server.local_today();
    let until = today.checked_add_days(Days::new(LEASE_WINDOW_DAYS)).unwrap_or(today);
    let expiring: Vec<ExpiringLease> = db::list_leases_ending_between(&context.db, today, until)
        .await?
        .into_iter()
        .map(|tenant| ExpiringLease { days_remaining: (tenant.lease_end_date - today).num_days(), tenant })
        .collect();
    Ok(Json(json!({ "expiring_leases": expiring })))
}
