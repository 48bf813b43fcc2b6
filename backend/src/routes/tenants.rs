use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::core;
use crate::db::{self, NewTenant, Tenant, TenantUpdate};
use crate::routes::error::{ApiError, ApiResult, OrNotFound, require_positive};

/// Tenant JSON as served to the dashboard, with derived initials.
#[derive(Serialize)]
pub struct TenantView {
    #[serde(flatten)]
    pub tenant: Tenant,
    pub initials: String,
}

impl From<Tenant> for TenantView {
    fn from(tenant: Tenant) -> Self {
        let initials = tenant.initials();
        Self { tenant, initials }
    }
}

#[derive(Deserialize)]
pub struct TenantQuery {
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

fn require_text(value: &str, field: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::BadRequest(format!("{field} is required")));
    }
    Ok(())
}

pub async fn list_tenants(
    State(context): State<core::ArcContext>,
    Query(query): Query<TenantQuery>,
) -> ApiResult<impl IntoResponse> {
    let tenants = db::list_tenants(&context.db, query.is_active.unwrap_or(true), query.search.as_deref()).await?;
    let tenants: Vec<TenantView> = tenants.into_iter().map(Into::into).collect();
    Ok(Json(json!({ "tenants": tenants })))
}

pub async fn get_tenant(State(context): State<core::ArcContext>, Path(id): Path<i64>) -> ApiResult<impl IntoResponse> {
    let tenant = db::get_tenant_by_id(&context.db, id).await.or_not_found("Tenant not found")?;
    Ok(Json(json!({ "tenant": TenantView::from(tenant) })))
}

pub async fn create_tenant(
    State(context): State<core::ArcContext>,
    payload: Result<Json<NewTenant>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(new_tenant) = payload?;
    require_text(&new_tenant.full_name, "full_name")?;
    require_text(&new_tenant.phone, "phone")?;
    require_text(&new_tenant.unit_number, "unit_number")?;
    require_positive(new_tenant.expected_rent, "expected_rent")?;
    if new_tenant.lease_end_date < new_tenant.lease_start_date {
        return Err(ApiError::BadRequest("lease_end_date must not precede lease_start_date".to_string()));
    }

    let tenant = db::create_tenant(&context.db, new_tenant).await?;
    tracing::info!(tenant_id = tenant.id, unit = %tenant.unit_number, "Tenant created");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Tenant created successfully", "tenant": TenantView::from(tenant) })),
    ))
}

pub async fn update_tenant(
    State(context): State<core::ArcContext>,
    Path(id): Path<i64>,
    payload: Result<Json<TenantUpdate>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(update) = payload?;
    if let Some(expected_rent) = update.expected_rent {
        require_positive(expected_rent, "expected_rent")?;
    }

    let tenant = db::update_tenant(&context.db, id, update).await.or_not_found("Tenant not found")?;
    tracing::info!(tenant_id = tenant.id, "Tenant updated");
    Ok(Json(json!({ "message": "Tenant updated successfully", "tenant": TenantView::from(tenant) })))
}

/// Deactivates the tenant; payments stay attached.
pub async fn delete_tenant(State(context): State<core::ArcContext>, Path(id): Path<i64>) -> ApiResult<impl IntoResponse> {
    db::deactivate_tenant(&context.db, id).await.or_not_found("Tenant not found")?;
    tracing::info!(tenant_id = id, "Tenant deactivated");
    Ok(Json(json!({ "message": "Tenant deactivated successfully" })))
}
