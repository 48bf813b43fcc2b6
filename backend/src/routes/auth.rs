use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::json;

use crate::auth::{self, AccessTokenClaims, TokenResponse};
use crate::core;
use crate::db::{self, Role};
use crate::routes::error::{ApiError, ApiResult, OrNotFound, require_admin};

#[derive(Deserialize)]
pub struct Login {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct Register {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Option<String>,
    pub phone: Option<String>,
    pub full_name: Option<String>,
}

/// Login route
pub async fn login(State(context): State<core::ArcContext>, Json(login): Json<Login>) -> ApiResult<impl IntoResponse> {
    tracing::info!("Logging in user: {}", login.username);

    let invalid = || ApiError::Unauthorized("Invalid credentials".to_string());
    let user = db::get_user_by_name(&context.db, &login.username).await.map_err(|e| {
        if e.is_not_found() { invalid() } else { e.into() }
    })?;

    if !auth::verify_password(&login.password, &user.password_hash)? {
        tracing::warn!("Invalid password for user: {}", login.username);
        return Err(invalid());
    }
    if !user.is_active {
        tracing::warn!("Login attempt for deactivated user: {}", login.username);
        return Err(invalid());
    }

    let access_token = auth::generate_access_token(&context.jwt, &user)?;
    Ok(Json(json!({
        "message": "Login successful",
        "tokens": TokenResponse::new(&context.jwt, access_token),
        "user": user,
    })))
}

/// Tokens are stateless, so logging out only records the event.
pub async fn logout(Extension(claims): Extension<AccessTokenClaims>) -> impl IntoResponse {
    tracing::info!(user_id = %claims.sub, username = %claims.username, "Logout");
    Json(json!({ "message": "Logged out successfully" }))
}

pub async fn current_user(
    State(context): State<core::ArcContext>,
    Extension(claims): Extension<AccessTokenClaims>,
) -> ApiResult<impl IntoResponse> {
    let user = db::get_user_by_id(&context.db, claims.user_id()?).await.or_not_found("User not found")?;
    Ok(Json(json!({ "user": user })))
}

/// Public: reports whether the request carries a valid token for an existing user.
pub async fn check_session(State(context): State<core::ArcContext>, req: Request) -> ApiResult<impl IntoResponse> {
    let Ok(claims) = auth::decode_access_token_from_req(&context.jwt, &req) else {
        return Ok(Json(json!({ "authenticated": false })));
    };
    match db::get_user_by_id(&context.db, claims.user_id()?).await {
        Ok(user) if user.is_active => Ok(Json(json!({ "authenticated": true, "user": user }))),
        Ok(_) => Ok(Json(json!({ "authenticated": false }))),
        Err(e) if e.is_not_found() => Ok(Json(json!({ "authenticated": false }))),
        Err(e) => Err(e.into()),
    }
}

pub async fn register(
    State(context): State<core::ArcContext>,
    Extension(claims): Extension<AccessTokenClaims>,
    Json(register): Json<Register>,
) -> ApiResult<impl IntoResponse> {
    require_admin(&claims)?;

    if register.username.trim().is_empty() || register.email.trim().is_empty() || register.password.is_empty() {
        return Err(ApiError::BadRequest("Username, email and password are required".to_string()));
    }
    auth::check_password_policy(&register.password).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    if db::get_user_by_name(&context.db, &register.username).await.is_ok() {
        return Err(ApiError::BadRequest("Username already exists".to_string()));
    }
    if db::get_user_by_email(&context.db, &register.email).await.is_ok() {
        return Err(ApiError::BadRequest("Email already exists".to_string()));
    }
    let role = match register.role.as_deref() {
        None => Role::Tenant,
        Some(role) => role.parse::<Role>().map_err(|_| ApiError::BadRequest("Invalid role".to_string()))?,
    };

    let user = db::create_user(&context.db, db::NewUser {
        username: register.username,
        email: register.email,
        password_hash: auth::hash_password(&register.password)?,
        role,
        phone: register.phone,
        full_name: register.full_name,
    })
    .await?;
    tracing::info!(user_id = user.id, created_by = %claims.sub, role = ?user.role, "User registered");

    Ok((StatusCode::CREATED, Json(json!({ "message": "User created successfully", "user": user }))))
}
