//! Authentication handlers
//!
//! The identity collaborator: verifies credentials, issues JWTs, and writes
//! every attempt to the login audit - including attempts against unknown
//! usernames, which are recorded without a user id.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, State},
    http::HeaderMap,
    Json,
};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::audit::AuditStore;
use crate::models::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, Role, User};
use crate::{AppError, AppResult, AppState};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // User ID
    pub role: String, // User role
    pub exp: usize,   // Expiration timestamp
    pub iat: usize,   // Issued at
}

/// Register endpoint. Role is fixed at registration; there is no update path.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Json<RegisterResponse>> {
    req.validate()?;

    if User::find_by_username(&state.pool, &req.username).await?.is_some() {
        return Err(AppError::AlreadyExists("Username already exists".to_string()));
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| AppError::InternalError(e.to_string()))?
        .to_string();

    let role = req.role.unwrap_or(Role::Guest);
    let user = User::create(&state.pool, &req.username, &password_hash, role).await?;

    tracing::info!("New user registered: {} ({})", user.username, role.as_str());

    Ok(Json(RegisterResponse {
        user_id: user.id,
        username: user.username,
        role,
    }))
}

/// Login endpoint. Every attempt lands in the audit store; the risk
/// collectors read that history on later requests.
pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    req.validate()?;

    let ip = super::client_ip(&headers, peer);

    let Some(user) = User::find_by_username(&state.pool, &req.username).await? else {
        // Unknown username: still audited, with no user id to attach.
        record_attempt(&state, None, false, &ip).await;
        return Err(AppError::InvalidCredentials);
    };

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| AppError::InternalError("Invalid password hash".to_string()))?;

    let verified = Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .is_ok();

    record_attempt(&state, Some(user.id), verified, &ip).await;

    if !verified {
        return Err(AppError::InvalidCredentials);
    }

    let token = generate_jwt(&user, &state.config.jwt_secret, state.config.jwt_expiration_hours)?;

    Ok(Json(LoginResponse {
        token,
        role: user.role(),
    }))
}

/// Advisory bookkeeping: an audit write failure is logged but does not turn
/// a valid login into an error response.
async fn record_attempt(state: &AppState, user_id: Option<uuid::Uuid>, success: bool, ip: &str) {
    if let Err(err) = state.audit.record_login_attempt(user_id, success, ip).await {
        tracing::warn!("Failed to record login attempt: {}", err);
    }
}

/// Generate JWT token
fn generate_jwt(user: &User, secret: &str, expiration_hours: u64) -> AppResult<String> {
    let now = Utc::now();
    let exp = now + Duration::hours(expiration_hours as i64);

    let claims = Claims {
        sub: user.id.to_string(),
        role: user.role.clone(),
        exp: exp.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalError(e.to_string()))
}
