use std::fs;
use std::io;
use std::path::Path;

use axum::extract::Request;
use axum::http;
use chrono::Utc;
use jsonwebtoken as jwt;
use rand::TryRngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::cfg;
use crate::db::{Role, User};

type TryRngError = <rand::rngs::OsRng as rand::TryRngCore>::Error;

#[rustfmt::skip]
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode JWT token")]
    EncodingFailed(jwt::errors::Error),

    #[error("Failed to decode JWT token")]
    DecodingFailed(jwt::errors::Error),

    #[error("File system operation failed")]
    FileSystemOperationFailed { #[from] source: std::io::Error },

    #[error("Random number generation operation failed")]
    RngOperationFailed { source: TryRngError },

    #[error("Authentication token has expired")]
    TokenExpired,

    #[error("Invalid authentication token")]
    InvalidToken,

    #[error("Authentication required")]
    InvalidAuthorizationHeader,
}

impl JwtError {
    /// Errors caused by the caller's token rather than by the server.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::DecodingFailed(_) | Self::TokenExpired | Self::InvalidToken | Self::InvalidAuthorizationHeader)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AccessTokenClaims {
    pub sub: String,      // Subject (user ID)
    pub username: String, // Username for convenience
    pub role: Role,       // Role checked by the route guards
    pub exp: i64,         // Expiration time
    pub iat: i64,         // Issued at
    pub jti: String,      // JWT ID (unique identifier)
}

impl AccessTokenClaims {
    pub fn user_id(&self) -> Result<i64, JwtError> {
        self.sub.parse::<i64>().map_err(|_| JwtError::InvalidToken)
    }
}

/// Response structure for the login endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64, // Seconds until the access token expires
}

impl TokenResponse {
    #[must_use]
    pub fn new(ctx: &JwtContext, access_token: String) -> Self {
        Self {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: ctx.access_token_expiry,
        }
    }
}

#[derive(Clone)]
pub struct JwtContext {
    pub encoding_key: jwt::EncodingKey,
    pub decoding_key: jwt::DecodingKey,
    pub validation: jwt::Validation,
    pub access_token_expiry: i64,
}

impl JwtContext {
    #[must_use]
    pub fn new(settings: &cfg::JwtSettings, secret: &str) -> Self {
        let encoding_key = jwt::EncodingKey::from_secret(secret.as_ref());
        let decoding_key = jwt::DecodingKey::from_secret(secret.as_ref());
        let mut validation = jwt::Validation::new(jwt::Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding_key,
            decoding_key,
            validation,
            access_token_expiry: settings.access_token_expiry,
        }
    }
}

/// Generate a new access token for a staff user
pub fn generate_access_token(ctx: &JwtContext, user: &User) -> Result<String, JwtError> {
    let now = Utc::now().timestamp();
    let header = jwt::Header::new(jwt::Algorithm::HS256);
    let claims = AccessTokenClaims {
        sub: user.id.to_string(),
        username: user.username.clone(),
        role: user.role,
        exp: now + ctx.access_token_expiry,
        iat: now,
        jti: Uuid::new_v4().to_string(),
    };
    jwt::encode(&header, &claims, &ctx.encoding_key).map_err(JwtError::EncodingFailed)
}

pub fn decode_access_token_from_req(ctx: &JwtContext, req: &Request) -> Result<AccessTokenClaims, JwtError> {
    // Extract the Authorization header
    let auth_header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or(JwtError::InvalidAuthorizationHeader)?;

    // Extract Bearer token
    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(JwtError::InvalidAuthorizationHeader)?;

    decode_access_token(ctx, token)
}

/// Validate and decode an access token
pub fn decode_access_token(ctx: &JwtContext, token: &str) -> Result<AccessTokenClaims, JwtError> {
    let token_data = jwt::decode::<AccessTokenClaims>(token, &ctx.decoding_key, &ctx.validation)?;
    Ok(token_data.claims)
}

const MIN_SECRET_LEN: usize = 32;
const SECRET_FILE_NAME: &str = ".jwt_secret";

/// Signing secret from `APP_JWT_SECRET`, else from `.jwt_secret` in the config directory.
pub fn get_jwt_secret() -> Result<String, JwtError> {
    let env_secret = std::env::var("APP_JWT_SECRET").ok();
    let secret_file = cfg::AppSettings::get_config_path().join(SECRET_FILE_NAME);
    load_or_create_secret(env_secret.as_deref(), &secret_file)
}

/// Returns the first usable secret of `env_secret` and the file contents. When neither is
/// usable a new secret is generated and written to `secret_file`, readable by the owner only.
pub fn load_or_create_secret(env_secret: Option<&str>, secret_file: &Path) -> Result<String, JwtError> {
    if let Some(secret) = env_secret.map(str::trim) {
        if secret.len() >= MIN_SECRET_LEN {
            return Ok(secret.to_string());
        }
        tracing::warn!("APP_JWT_SECRET is shorter than {} characters, ignoring it", MIN_SECRET_LEN);
    }

    match fs::read_to_string(secret_file) {
        Ok(stored) if stored.trim().len() >= MIN_SECRET_LEN => return Ok(stored.trim().to_string()),
        Ok(_) => tracing::warn!(path = %secret_file.display(), "Stored JWT secret is too short, replacing it"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    let secret = generate_secure_secret()?;
    write_owner_only(secret_file, &secret)?;
    tracing::info!("Generated new JWT secret in {}", secret_file.display());
    Ok(secret)
}

fn write_owner_only(path: &Path, contents: &str) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}

/// 32 random bytes, hex encoded
fn generate_secure_secret() -> Result<String, JwtError> {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| JwtError::RngOperationFailed { source: e })?;
    Ok(hex::encode(bytes))
}

/// Maps jsonwebtoken errors to our custom `JwtError` type
#[allow(clippy::match_same_arms)]
impl From<jwt::errors::Error> for JwtError {
    fn from(e: jwt::errors::Error) -> Self {
        match e.kind() {
            jwt::errors::ErrorKind::ExpiredSignature => Self::TokenExpired,
            jwt::errors::ErrorKind::InvalidToken => Self::InvalidToken,
            jwt::errors::ErrorKind::Json(_) => Self::InvalidToken,
            _ => Self::DecodingFailed(e),
        }
    }
}
