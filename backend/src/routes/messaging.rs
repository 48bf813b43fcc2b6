use std::collections::BTreeMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::auth::AccessTokenClaims;
use crate::core;
use crate::db::{self, NewTemplate};
use crate::routes::error::{ApiError, ApiResult, OrNotFound, require_admin};
use crate::services::notifications::{self, Placeholders};

const SMS_LOG_LIMIT: i64 = 100;

#[derive(Deserialize)]
pub struct TemplateQuery {
    pub category: Option<String>,
    pub theme: Option<String>,
}

#[derive(Deserialize)]
pub struct SendSms {
    pub tenant_id: i64,
    pub template_id: Option<i64>,
    #[serde(default)]
    pub placeholders: BTreeMap<String, Value>,
    pub message: Option<String>,
    pub message_type: Option<String>,
}

#[derive(Deserialize)]
pub struct SendReminder {
    pub tenant_id: i64,
    pub remaining_amount: Option<f64>,
}

fn placeholder_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

pub async fn list_templates(
    State(context): State<core::ArcContext>,
    Query(query): Query<TemplateQuery>,
) -> ApiResult<impl IntoResponse> {
    let templates =
        db::list_active_templates(&context.db, query.category.as_deref(), query.theme.as_deref()).await?;
    Ok(Json(json!({ "templates": templates })))
}

pub async fn create_template(
    State(context): State<core::ArcContext>,
    Extension(claims): Extension<AccessTokenClaims>,
    payload: Result<Json<NewTemplate>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    require_admin(&claims)?;
    let Json(new_template) = payload?;
    if [&new_template.name, &new_template.category, &new_template.theme, &new_template.content]
        .iter()
        .any(|field| field.trim().is_empty())
    {
        return Err(ApiError::BadRequest("name, category, theme and content are required".to_string()));
    }

    let template = db::create_template(&context.db, new_template).await?;
    tracing::info!(template_id = template.id, category = %template.category, "Template created");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Template created successfully", "template": template })),
    ))
}

/// Sends a rendered template or a raw message to one tenant.
pub async fn send_sms(
    State(context): State<core::ArcContext>,
    Extension(claims): Extension<AccessTokenClaims>,
    payload: Result<Json<SendSms>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    let tenant = db::get_tenant_by_id(&context.db, request.tenant_id).await.or_not_found("Tenant not found")?;

    let message = match (request.template_id, request.message) {
        (Some(template_id), _) => {
            let template = db::get_template_by_id(&context.db, template_id).await.or_not_found("Template not found")?;
            let mut placeholders = Placeholders::for_tenant(&tenant);
            placeholders.extend(
                request
                    .placeholders
                    .into_iter()
                    .filter(|(name, _)| name != "tenant_name" && name != "unit_number")
                    .map(|(name, value)| (name, placeholder_text(value))),
            );
            notifications::render(&template.content, &placeholders)
        }
        (None, Some(message)) if !message.trim().is_empty() => message,
        (None, _) => return Err(ApiError::BadRequest("Either template_id or message is required".to_string())),
    };

    let message_type = request.message_type.unwrap_or_else(|| "manual".to_string());
    let delivered = context.notifications().deliver(&tenant, message, &message_type, Some(claims.user_id()?)).await?;
    if !delivered {
        return Err(ApiError::Internal("Failed to send SMS".to_string()));
    }
    Ok(Json(json!({ "message": "SMS sent successfully" })))
}

pub async fn send_reminder(
    State(context): State<core::ArcContext>,
    Extension(claims): Extension<AccessTokenClaims>,
    payload: Result<Json<SendReminder>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    let tenant = db::get_tenant_by_id(&context.db, request.tenant_id).await.or_not_found("Tenant not found")?;

    let delivered = context
        .notifications()
        .send_rent_reminder(&tenant, request.remaining_amount, Some(claims.user_id()?))
        .await?;
    if !delivered {
        return Err(ApiError::Internal("Failed to send reminder".to_string()));
    }
    Ok(Json(json!({ "message": "Reminder sent successfully" })))
}

pub async fn sms_logs(State(context): State<core::ArcContext>) -> ApiResult<impl IntoResponse> {
    let logs = db::list_sms_logs(&context.db, SMS_LOG_LIMIT).await?;
    Ok(Json(json!({ "sms_logs": logs })))
}
