use std::net::SocketAddr;

use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::jwt::{encode_token, Claims};
use crate::auth::{password, Principal};
use crate::db;
use crate::error::AppError;
use crate::extract::Json;
use crate::middleware::audit;
use crate::models::{Role, User};
use crate::state::SharedState;
use crate::submission::metadata;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: SessionUser,
}

fn issue_token(state: &SharedState, user: &User) -> Result<AuthResponse, AppError> {
    let claims = Claims::new(user.id, user.role, state.config.token_ttl_hours);
    let token = encode_token(&claims, &state.config.jwt_secret).map_err(AppError::Internal)?;

    Ok(AuthResponse {
        token,
        user: SessionUser {
            id: user.id,
            username: user.username.clone(),
            role: user.role,
        },
    })
}

/// Create the first admin. Only allowed while no users exist.
pub async fn register(
    State(state): State<SharedState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let username = req.username.trim();
    if username.is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest(
            "Username and password are required".to_string(),
        ));
    }
    password::check_length(&req.password).map_err(AppError::BadRequest)?;

    let pw_hash = password::hash(&req.password).map_err(AppError::Internal)?;

    // Advisory lock prevents concurrent bootstrap registrations
    let mut tx = state.pool.begin().await?;
    sqlx::query("SELECT pg_advisory_xact_lock(1)")
        .execute(&mut *tx)
        .await?;

    let count = db::users::count_all(&mut *tx).await?;
    if count > 0 {
        return Err(AppError::Forbidden(
            "Registration is disabled. Ask an admin for an account.".to_string(),
        ));
    }

    let user = db::users::create(&mut *tx, username, &pw_hash, Role::Admin).await?;
    tx.commit().await?;

    tracing::info!("Bootstrap admin {} created", user.username);

    audit::log_event(
        &state.pool,
        Some(user.id),
        "user.registered",
        "user",
        Some(user.id),
        None,
    )
    .await;

    Ok(Json(issue_token(&state, &user)?))
}

pub async fn login(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    if req.username.is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest(
            "Username and password are required".to_string(),
        ));
    }

    if state.login_limiter.check(&req.username).is_err() {
        return Err(AppError::RateLimited(
            "Too many login attempts. Please try again later.".to_string(),
        ));
    }

    let Some(user) = db::users::find_by_username(&state.pool, &req.username).await? else {
        state.login_limiter.record_failure(&req.username);
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    };

    let valid = password::verify(&req.password, &user.password_hash).map_err(AppError::Internal)?;
    if !valid {
        state.login_limiter.record_failure(&req.username);
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }
    state.login_limiter.reset(&req.username);

    let client = metadata::extract(&headers, Some(addr.ip()), &state.config.trusted_proxies);
    db::users::record_login(&state.pool, user.id, &client.ip).await?;

    audit::log_event(
        &state.pool,
        Some(user.id),
        "user.login",
        "user",
        Some(user.id),
        Some(serde_json::json!({ "ip": client.ip })),
    )
    .await;

    Ok(Json(issue_token(&state, &user)?))
}

pub async fn me(principal: Principal) -> Json<Principal> {
    Json(principal)
}
