use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{self, AccessTokenClaims};
use crate::core;
use crate::routes;
use crate::routes::ApiError;

/// Back end server built from routes that are public, need any signed-in user, or need staff
pub fn create_router(context: core::ArcContext) -> Router {
    // Property management API, super_admin and caretaker only
    let staff_routes = Router::new()
        .route("/api/auth/register", post(routes::auth::register)) // super_admin, checked in the handler
        .route("/api/tenants", get(routes::tenants::list_tenants).post(routes::tenants::create_tenant))
        .route(
            "/api/tenants/{id}",
            get(routes::tenants::get_tenant)
                .put(routes::tenants::update_tenant)
                .delete(routes::tenants::delete_tenant),
        )
        .route("/api/payments", get(routes::payments::list_payments).post(routes::payments::log_payment))
        .route("/api/payments/audit-trail", get(routes::payments::audit_trail))
        .route("/api/payments/{id}", get(routes::payments::get_payment))
        .route("/api/payments/{id}/send-receipt", post(routes::payments::send_receipt))
        .route("/api/dashboard/summary", get(routes::dashboard::summary))
        .route("/api/dashboard/alerts", get(routes::dashboard::alerts))
        .route("/api/dashboard/alerts/{id}/mark-read", put(routes::dashboard::mark_alert_read))
        .route("/api/dashboard/lease-expiring", get(routes::dashboard::lease_expiring))
        .route(
            "/api/messaging/templates",
            get(routes::messaging::list_templates).post(routes::messaging::create_template), // POST is super_admin only
        )
        .route("/api/messaging/send-sms", post(routes::messaging::send_sms))
        .route("/api/messaging/send-reminder", post(routes::messaging::send_reminder))
        .route("/api/messaging/sms-logs", get(routes::messaging::sms_logs))
        .route("/api/mpesa/initiate-stk", post(routes::mpesa::initiate_stk))
        .layer(middleware::from_fn(staff_gate))
        .layer(middleware::from_fn_with_state(context.clone(), auth_middleware))
        .with_state(context.clone());

    // Any signed-in user
    let session_routes = Router::new()
        .route("/api/auth/logout", post(routes::auth::logout))
        .route("/api/auth/current-user", get(routes::auth::current_user))
        .layer(middleware::from_fn_with_state(context.clone(), auth_middleware))
        .with_state(context.clone());

    let public_routes = Router::new()
        .route("/api/auth/login", post(routes::auth::login)) // returns a bearer token
        .route("/api/auth/check-session", get(routes::auth::check_session))
        .route("/api/mpesa/callback", post(routes::mpesa::callback)) // called by Safaricom
        .route("/health", get(routes::health::health_check)) // Health check endpoint
        .with_state(context);

    // Combine all routes
    Router::new()
        .merge(staff_routes)
        .merge(session_routes)
        .merge(public_routes)
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
}

/// Validates the bearer token and hands its claims to the handlers.
async fn auth_middleware(
    State(context): State<core::ArcContext>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    match auth::decode_access_token_from_req(&context.jwt, &req) {
        Ok(claims) => {
            tracing::debug!(
                user_id = %claims.sub,
                username = %claims.username,
                role = ?claims.role,
                "Authenticated user accessing API"
            );
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(e) => {
            tracing::warn!("Unauthorized access attempt: {}", e);
            ApiError::Unauthorized(e.to_string()).into_response()
        }
    }
}

async fn staff_gate(req: Request<Body>, next: Next) -> Response {
    let role = req.extensions().get::<AccessTokenClaims>().map(|claims| claims.role);
    match role {
        Some(role) if role.is_staff() => next.run(req).await,
        Some(role) => {
            tracing::warn!(role = ?role, uri = %req.uri(), "Non-staff user denied");
            ApiError::Forbidden("Staff access required").into_response()
        }
        None => ApiError::Unauthorized("Authentication required".to_string()).into_response(),
    }
}
