use axum::body::Body;
use axum::http::{self, HeaderValue, Request};
use chrono::Utc;
use jsonwebtoken as jwt;
use uuid::Uuid;

use crate::auth::*;
use crate::cfg;
use crate::db::{Role, User};

fn create_test_context() -> JwtContext {
    let settings = cfg::JwtSettings { access_token_expiry: 3600 };
    JwtContext::new(&settings, "test_secret_key_for_rentdesk_tokens")
}

fn caretaker() -> User {
    let now = Utc::now().naive_utc();
    User {
        id: 7,
        username: "caretaker".to_string(),
        email: "caretaker@example.com".to_string(),
        password_hash: String::new(),
        role: Role::Caretaker,
        phone: None,
        full_name: Some("Grace Muthoni".to_string()),
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

fn encode_claims(ctx: &JwtContext, exp: i64) -> String {
    let claims = AccessTokenClaims {
        sub: "7".to_string(),
        username: "caretaker".to_string(),
        role: Role::Caretaker,
        exp,
        iat: Utc::now().timestamp() - 7200,
        jti: Uuid::new_v4().to_string(),
    };
    jwt::encode(&jwt::Header::new(jwt::Algorithm::HS256), &claims, &ctx.encoding_key).unwrap()
}

#[test]
fn test_access_token_carries_user_and_role() {
    let ctx = create_test_context();

    let token = generate_access_token(&ctx, &caretaker()).unwrap();
    assert_eq!(token.split('.').count(), 3);

    let claims = decode_access_token(&ctx, &token).unwrap();
    assert_eq!(claims.sub, "7");
    assert_eq!(claims.user_id().unwrap(), 7);
    assert_eq!(claims.username, "caretaker");
    assert_eq!(claims.role, Role::Caretaker);
    assert_eq!(claims.exp - claims.iat, 3600);
    assert!(!claims.jti.is_empty());
}

#[test]
fn test_token_signed_with_other_secret_is_rejected() {
    let settings = cfg::JwtSettings { access_token_expiry: 3600 };
    let other_ctx = JwtContext::new(&settings, "another_secret_key_for_rentdesk_tokens");
    let token = generate_access_token(&create_test_context(), &caretaker()).unwrap();

    let result = decode_access_token(&other_ctx, &token);
    assert!(matches!(result, Err(JwtError::DecodingFailed(_))));
}

#[test]
fn test_garbage_tokens_are_rejected() {
    let ctx = create_test_context();

    assert!(matches!(decode_access_token(&ctx, "invalid.token.format"), Err(JwtError::DecodingFailed(_))));
    assert!(matches!(decode_access_token(&ctx, "not_a_jwt_token"), Err(JwtError::InvalidToken)));
}

#[test]
fn test_expired_token_is_rejected() {
    let ctx = create_test_context();

    let expired = encode_claims(&ctx, Utc::now().timestamp() - 3600);
    let result = decode_access_token(&ctx, &expired);
    assert!(matches!(result, Err(JwtError::TokenExpired)));
    assert!(result.unwrap_err().is_client_error());

    let later = Utc::now().timestamp() + 86400;
    let claims = decode_access_token(&ctx, &encode_claims(&ctx, later)).unwrap();
    assert_eq!(claims.exp, later);
}

#[test]
fn test_non_numeric_subject_has_no_user_id() {
    let claims = AccessTokenClaims {
        sub: "admin".to_string(),
        username: "admin".to_string(),
        role: Role::SuperAdmin,
        exp: 0,
        iat: 0,
        jti: String::new(),
    };

    assert!(matches!(claims.user_id(), Err(JwtError::InvalidToken)));
}

#[test]
fn test_decode_token_from_authorization_header() {
    let ctx = create_test_context();
    let token = generate_access_token(&ctx, &caretaker()).unwrap();

    let mut req = Request::new(Body::empty());
    req.headers_mut()
        .insert(http::header::AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}")).unwrap());
    assert_eq!(decode_access_token_from_req(&ctx, &req).unwrap().username, "caretaker");

    let missing = Request::new(Body::empty());
    assert!(matches!(decode_access_token_from_req(&ctx, &missing), Err(JwtError::InvalidAuthorizationHeader)));

    let mut no_scheme = Request::new(Body::empty());
    no_scheme.headers_mut().insert(http::header::AUTHORIZATION, HeaderValue::from_str(&token).unwrap());
    assert!(matches!(decode_access_token_from_req(&ctx, &no_scheme), Err(JwtError::InvalidAuthorizationHeader)));
}

#[test]
fn test_token_response_reports_expiry() {
    let ctx = create_test_context();

    let response = TokenResponse::new(&ctx, "abc".to_string());

    assert_eq!(response.access_token, "abc");
    assert_eq!(response.token_type, "Bearer");
    assert_eq!(response.expires_in, 3600);
}

#[test]
fn test_tokens_have_distinct_ids() {
    let ctx = create_test_context();
    let user = caretaker();

    let first = decode_access_token(&ctx, &generate_access_token(&ctx, &user).unwrap()).unwrap();
    let second = decode_access_token(&ctx, &generate_access_token(&ctx, &user).unwrap()).unwrap();

    assert_ne!(first.jti, second.jti);
}
